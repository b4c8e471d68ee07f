//! BigQuery MCP Server - Main entry point.
//!
//! This server provides MCP (Model Context Protocol) tools that let AI agents
//! query and set up BigQuery datasets.

use bigquery_mcp_server::agent::{AgentSettings, build_agent_tree};
use bigquery_mcp_server::config::{BackendKind, Config, TransportMode};
use bigquery_mcp_server::db::BigQueryDatabase;
use bigquery_mcp_server::mcp::BigQueryService;
use bigquery_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use bigquery_mcp_server::warehouse::MemoryWarehouse;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log lines go to stderr under the stdio transport, where stdout carries the protocol.
fn console_layer(config: &Config) -> BoxedLayer {
    let writer = if config.transport == TransportMode::Stdio {
        BoxMakeWriter::new(std::io::stderr)
    } else {
        BoxMakeWriter::new(std::io::stdout)
    };

    if config.json_logs {
        fmt::layer().json().with_writer(writer).boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_writer(writer)
            .boxed()
    }
}

fn file_layer(config: &Config) -> Result<Option<(BoxedLayer, WorkerGuard)>, String> {
    let Some(path) = &config.log_file else {
        return Ok(None);
    };
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| format!("Invalid log file path: {}", path.display()))?;
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| std::path::Path::new("."));

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)
        .map_err(|e| format!("Failed to open log file {}: {}", path.display(), e))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = if config.json_logs {
        fmt::layer().json().with_writer(writer).boxed()
    } else {
        fmt::layer().with_ansi(false).with_writer(writer).boxed()
    };
    Ok(Some((layer, guard)))
}

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the file sink and must live until exit.
fn init_tracing(config: &Config) -> Result<Option<WorkerGuard>, String> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let mut layers = vec![console_layer(config)];
    let guard = match file_layer(config)? {
        Some((layer, guard)) => {
            layers.push(layer);
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry().with(layers).with(filter).init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    let _log_guard = match init_tracing(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let settings = match config.connection_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            eprintln!("Usage: bigquery-mcp-server --project <PROJECT> [--location <LOCATION>]");
            eprintln!();
            eprintln!("Examples:");
            eprintln!("  bigquery-mcp-server --project my-project");
            eprintln!("  bigquery-mcp-server --project my-project --key-file sa.json --transport stdio");
            eprintln!("  BIGQUERY_PROJECT=my-project bigquery-mcp-server --backend memory");
            std::process::exit(1);
        }
    };

    if config.print_agents {
        let agents = build_agent_tree(&AgentSettings::from_config(&config)?);
        println!("{}", agents.to_json_pretty()?);
        return Ok(());
    }

    info!(
        transport = %config.transport,
        backend = %config.backend,
        "Starting BigQuery MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let db = match config.backend {
        BackendKind::Bigquery => match BigQueryDatabase::connect(&settings).await {
            Ok(db) => db,
            Err(e) => {
                error!(kind = %e.kind(), error = %e, "Failed to initialize BigQuery");
                std::process::exit(1);
            }
        },
        BackendKind::Memory => {
            warn!("Using the in-memory warehouse; data is lost on exit");
            BigQueryDatabase::new(
                Arc::new(MemoryWarehouse::new(settings.project.clone())),
                settings.location.clone(),
            )
        }
    };
    let service = BigQueryService::new(Arc::new(db));

    let result = match config.transport {
        TransportMode::Stdio => {
            info!("Using stdio transport");
            StdioTransport::new(service).run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.host,
                port = config.port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            HttpTransport::new(service, &config.host, config.port, &config.mcp_endpoint)
                .run()
                .await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
