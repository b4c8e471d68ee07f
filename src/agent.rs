//! Agent definitions.
//!
//! Two specialists (data discovery and data analytics) use the tool server as
//! their only tool source; an orchestrator routes requests between them. The
//! model runtime that executes these definitions lives outside this crate;
//! `--print-agents` emits them as JSON.

use crate::config::Config;
use crate::error::{BqError, BqResult};
use serde::Serialize;
use tracing::debug;

pub const DISCOVERY_AGENT_NAME: &str = "BigQuery_Data_Discovery_Agent";
pub const ANALYTICS_AGENT_NAME: &str = "BigQuery_Data_Analytics_Agent";
pub const ORCHESTRATOR_NAME: &str = "orchestrator";

const DATA_DISCOVERY_PROMPT: &str = "You are a Data Discovery Agent: explore datasets, describe \
schemas, and sample data. Use the available tools (list_tables, describe_table, execute_query) \
and summarize your findings.";

const DATA_ANALYTICS_PROMPT: &str = "You are a Data Analytics Agent: run analytical SQL queries \
and summarize distributions, KPIs, and trends. Start from the schema and a small sample, then \
produce aggregated insights.";

const ORCHESTRATOR_PROMPT: &str = "You are an orchestrator. Route statistics and analytics \
requests to the Data Analytics Agent and discovery requests to the Data Discovery Agent. If \
unsure, ask for clarification, and report which agent you used.";

const ORCHESTRATOR_DESCRIPTION: &str = "An orchestrator agent that routes user requests to \
specialized sub-agents for data discovery and data analytics in BigQuery.";

/// Where an agent gets its tools from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolSource {
    /// An MCP server reached over streamable HTTP
    McpStreamableHttp { url: String },
}

/// Declarative description of one LLM agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentDefinition {
    pub name: String,
    pub model: String,
    pub instruction: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSource>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_agents: Vec<AgentDefinition>,
}

impl AgentDefinition {
    /// Find this agent or one of its descendants by name.
    pub fn find(&self, name: &str) -> Option<&AgentDefinition> {
        if self.name == name {
            return Some(self);
        }
        self.sub_agents.iter().find_map(|a| a.find(name))
    }

    pub fn to_json_pretty(&self) -> BqResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| BqError::internal(format!("Failed to serialize agents: {}", e)))
    }
}

/// Everything the agent definitions depend on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSettings {
    pub project: String,
    pub location: String,
    pub model: String,
    pub tool_server_url: String,
}

impl AgentSettings {
    /// Build settings from the server configuration.
    ///
    /// Missing project, location or model is an error; no placeholder values
    /// are substituted.
    pub fn from_config(config: &Config) -> BqResult<Self> {
        let connection = config.connection_settings()?;
        let model = config.agent_model.trim();
        if model.is_empty() {
            return Err(BqError::invalid_input("Agent model is required"));
        }
        let settings = Self {
            project: connection.project,
            location: connection.location,
            model: model.to_string(),
            tool_server_url: config.tool_server_url()?.to_string(),
        };
        debug!(url = %settings.tool_server_url, "Agent settings loaded");
        Ok(settings)
    }

    fn context(&self) -> String {
        format!(
            " Tables live in BigQuery project `{}` (default location {}).",
            self.project, self.location
        )
    }

    fn specialist(&self, name: &str, prompt: &str) -> AgentDefinition {
        AgentDefinition {
            name: name.to_string(),
            model: self.model.clone(),
            instruction: format!("{}{}", prompt, self.context()),
            description: None,
            tools: vec![ToolSource::McpStreamableHttp {
                url: self.tool_server_url.clone(),
            }],
            sub_agents: Vec::new(),
        }
    }
}

/// The orchestrator with the discovery and analytics specialists as sub-agents.
pub fn build_agent_tree(settings: &AgentSettings) -> AgentDefinition {
    AgentDefinition {
        name: ORCHESTRATOR_NAME.to_string(),
        model: settings.model.clone(),
        instruction: ORCHESTRATOR_PROMPT.to_string(),
        description: Some(ORCHESTRATOR_DESCRIPTION.to_string()),
        tools: Vec::new(),
        sub_agents: vec![
            settings.specialist(DISCOVERY_AGENT_NAME, DATA_DISCOVERY_PROMPT),
            settings.specialist(ANALYTICS_AGENT_NAME, DATA_ANALYTICS_PROMPT),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            project: Some("acme-analytics".to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn test_from_config_requires_project() {
        let err = AgentSettings::from_config(&Config::default()).unwrap_err();
        assert!(err.is_local());
    }

    #[test]
    fn test_from_config_requires_model() {
        let config = Config {
            agent_model: String::new(),
            ..config()
        };
        assert!(AgentSettings::from_config(&config).is_err());
    }

    #[test]
    fn test_agent_tree() {
        let settings = AgentSettings::from_config(&config()).unwrap();
        let root = build_agent_tree(&settings);

        assert_eq!(root.name, ORCHESTRATOR_NAME);
        assert!(root.tools.is_empty());
        assert_eq!(root.sub_agents.len(), 2);

        for name in [DISCOVERY_AGENT_NAME, ANALYTICS_AGENT_NAME] {
            let agent = root.find(name).unwrap();
            assert_eq!(agent.model, "gemini-2.0-flash");
            assert!(agent.instruction.contains("acme-analytics"));
            assert_eq!(
                agent.tools,
                vec![ToolSource::McpStreamableHttp {
                    url: "http://localhost:8000/mcp".to_string()
                }]
            );
        }
    }

    #[test]
    fn test_json_shape() {
        let settings = AgentSettings::from_config(&config()).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&build_agent_tree(&settings).to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["name"], "orchestrator");
        assert!(json.get("tools").is_none());
        assert_eq!(
            json["sub_agents"][0]["tools"][0]["type"],
            "mcp_streamable_http"
        );
    }
}
