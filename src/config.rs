//! Configuration handling for the BigQuery MCP Server.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use crate::error::{BqError, BqResult};
use crate::models::{ConnectionSettings, DEFAULT_LOCATION};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use url::Url;

pub const DEFAULT_HTTP_HOST: &str = "localhost";
pub const DEFAULT_HTTP_PORT: u16 = 8000;
pub const DEFAULT_MCP_ENDPOINT: &str = "/mcp";
pub const DEFAULT_AGENT_MODEL: &str = "gemini-2.0-flash";

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Streamable HTTP with Server-Sent Events (for agent runtimes)
    #[default]
    Http,
    /// Standard input/output (for CLI integration)
    Stdio,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Stdio => write!(f, "stdio"),
        }
    }
}

/// Warehouse backend serving the tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BackendKind {
    /// Google BigQuery
    #[default]
    Bigquery,
    /// In-process warehouse, for local development without credentials
    Memory,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bigquery => write!(f, "bigquery"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "bigquery-mcp-server",
    about = "MCP server exposing BigQuery operations as tools for AI agents",
    version,
    author
)]
pub struct Config {
    /// Google Cloud project that owns the datasets
    #[arg(long, env = "BIGQUERY_PROJECT")]
    pub project: Option<String>,

    /// Location for datasets created without an explicit one.
    ///
    /// This is not the job location: queries run wherever the tables they
    /// reference live, and the dataset tools always pass their own location.
    #[arg(long, default_value = DEFAULT_LOCATION, env = "BIGQUERY_LOCATION")]
    pub location: String,

    /// Service account key file. Application Default Credentials are used when absent.
    #[arg(long, value_name = "PATH", env = "BIGQUERY_KEY_FILE")]
    pub key_file: Option<PathBuf>,

    /// Override the BigQuery v2 API base URL (e.g. an emulator)
    #[arg(long, value_name = "URL", env = "BIGQUERY_API_ENDPOINT")]
    pub api_endpoint: Option<String>,

    /// Warehouse backend
    #[arg(long, value_enum, default_value = "bigquery", env = "BIGQUERY_BACKEND")]
    pub backend: BackendKind,

    /// Transport mode (http or stdio)
    #[arg(short, long, value_enum, default_value = "http", env = "MCP_TRANSPORT")]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(long, default_value = DEFAULT_HTTP_HOST, env = "HOST")]
    pub host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT, env = "PORT")]
    pub port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(long, default_value = DEFAULT_MCP_ENDPOINT, env = "MCP_ENDPOINT")]
    pub mcp_endpoint: String,

    /// Model used by the agent definitions
    #[arg(long, default_value = DEFAULT_AGENT_MODEL, env = "AGENT_MODEL")]
    pub agent_model: String,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH", env = "MCP_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Print the agent definitions as JSON and exit
    #[arg(long)]
    pub print_agents: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            project: None,
            location: DEFAULT_LOCATION.to_string(),
            key_file: None,
            api_endpoint: None,
            backend: BackendKind::Bigquery,
            transport: TransportMode::Http,
            host: DEFAULT_HTTP_HOST.to_string(),
            port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            agent_model: DEFAULT_AGENT_MODEL.to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            log_file: None,
            print_agents: false,
        }
    }

    /// The configured project, if non-empty.
    pub fn project(&self) -> Option<&str> {
        self.project
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// Connection settings for the warehouse. Fails if no project is configured.
    pub fn connection_settings(&self) -> BqResult<ConnectionSettings> {
        let project = self.project().ok_or_else(|| {
            BqError::invalid_input("BIGQUERY_PROJECT environment variable or --project is required")
        })?;

        let mut settings = ConnectionSettings::new(project, self.location.trim());
        if let Some(key_file) = &self.key_file {
            settings = settings.with_key_file(key_file.clone());
        }
        if let Some(endpoint) = &self.api_endpoint {
            settings = settings.with_api_endpoint(endpoint.clone());
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// URL agents use to reach the streamable HTTP endpoint.
    pub fn tool_server_url(&self) -> BqResult<Url> {
        let base = Url::parse(&format!("http://{}", self.http_bind_addr()))
            .map_err(|e| BqError::invalid_input(format!("Invalid host or port: {}", e)))?;
        base.join(&self.mcp_endpoint)
            .map_err(|e| BqError::invalid_input(format!("Invalid MCP endpoint: {}", e)))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.transport, TransportMode::Http);
        assert_eq!(config.backend, BackendKind::Bigquery);
        assert_eq!(config.host, DEFAULT_HTTP_HOST);
        assert_eq!(config.port, DEFAULT_HTTP_PORT);
        assert_eq!(config.location, "US");
    }

    #[test]
    fn test_cli_overrides() {
        let config = Config::try_parse_from([
            "bigquery-mcp-server",
            "--project",
            "my-proj",
            "--transport",
            "stdio",
            "--backend",
            "memory",
            "--port",
            "9000",
        ])
        .unwrap();
        assert_eq!(config.project(), Some("my-proj"));
        assert_eq!(config.transport, TransportMode::Stdio);
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_missing_project_fails_closed() {
        let err = Config::default().connection_settings().unwrap_err();
        assert!(err.to_string().contains("BIGQUERY_PROJECT"));

        let config = Config {
            project: Some("   ".to_string()),
            ..Config::default()
        };
        assert!(config.connection_settings().is_err());
    }

    #[test]
    fn test_empty_location_rejected() {
        let config = Config {
            project: Some("p".to_string()),
            location: " ".to_string(),
            ..Config::default()
        };
        let err = config.connection_settings().unwrap_err();
        assert_eq!(err.to_string(), "Location is required");
    }

    #[test]
    fn test_connection_settings() {
        let config = Config {
            project: Some("p".to_string()),
            key_file: Some(PathBuf::from("/keys/sa.json")),
            ..Config::default()
        };
        let settings = config.connection_settings().unwrap();
        assert_eq!(settings.project, "p");
        assert!(settings.has_key_file());
        assert!(settings.api_endpoint.is_none());
    }

    #[test]
    fn test_tool_server_url() {
        let config = Config::default();
        assert_eq!(
            config.tool_server_url().unwrap().as_str(),
            "http://localhost:8000/mcp"
        );

        let config = Config {
            host: "0.0.0.0".to_string(),
            port: 3000,
            mcp_endpoint: "/".to_string(),
            ..Config::default()
        };
        assert_eq!(config.tool_server_url().unwrap().as_str(), "http://0.0.0.0:3000/");
    }
}
