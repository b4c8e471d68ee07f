//! MCP service implementation using rmcp.
//!
//! [`BigQueryService`] registers one tool per database operation. Handlers
//! return a [`BqResult`]; this module alone turns it into the tool's text
//! result, rendering failures as `Error: <message>`.

use crate::db::BigQueryDatabase;
use crate::error::{BqError, BqResult};
use crate::tools::{
    CreateCompleteSampleInput, CreateDatasetInput, DatasetToolHandler, DescribeTableInput,
    ExecuteQueryInput, QueryToolHandler, SampleDatasetInput, SampleToolHandler, SchemaToolHandler,
};
use rmcp::{
    ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct BigQueryService {
    /// Shared database handle; None until a connection has been established
    db: Option<Arc<BigQueryDatabase>>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl BigQueryService {
    pub fn new(db: Arc<BigQueryDatabase>) -> Self {
        Self {
            db: Some(db),
            tool_router: Self::tool_router(),
        }
    }

    /// A service without a database. Every tool answers
    /// `Error: Database not initialized`.
    pub fn uninitialized() -> Self {
        Self {
            db: None,
            tool_router: Self::tool_router(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.db.is_some()
    }

    fn database(&self) -> BqResult<Arc<BigQueryDatabase>> {
        self.db.clone().ok_or(BqError::NotInitialized)
    }
}

/// Convert a handler result into the text returned to the client.
fn render(tool: &str, result: BqResult<String>) -> String {
    match result {
        Ok(text) => text,
        Err(e) => {
            warn!(tool = %tool, kind = %e.kind(), error = %e, "Tool call failed");
            format!("Error: {}", e)
        }
    }
}

#[tool_router]
impl BigQueryService {
    #[tool(
        description = "Execute a BigQuery SQL query and return the results.\nOutput format: json (default), table, or markdown."
    )]
    pub async fn execute_query(
        &self,
        Parameters(input): Parameters<ExecuteQueryInput>,
    ) -> String {
        let result = async {
            QueryToolHandler::new(self.database()?)
                .execute_query(input)
                .await
        }
        .await;
        render("execute_query", result)
    }

    #[tool(
        description = "List every table in every dataset of the project.\nReturns a JSON array of `dataset.table` names."
    )]
    pub async fn list_tables(&self) -> String {
        let result = async { SchemaToolHandler::new(self.database()?).list_tables().await }.await;
        render("list_tables", result)
    }

    #[tool(
        description = "Get the DDL of a table.\nTable name must be `dataset.table` or `project.dataset.table`."
    )]
    pub async fn describe_table(
        &self,
        Parameters(input): Parameters<DescribeTableInput>,
    ) -> String {
        let result = async {
            SchemaToolHandler::new(self.database()?)
                .describe_table(input)
                .await
        }
        .await;
        render("describe_table", result)
    }

    #[tool(
        description = "Create a dataset in the project.\nReports, without failing, when the dataset already exists. Location defaults to US."
    )]
    pub async fn create_dataset(
        &self,
        Parameters(input): Parameters<CreateDatasetInput>,
    ) -> String {
        let result = async {
            DatasetToolHandler::new(self.database()?)
                .create_dataset(input)
                .await
        }
        .await;
        render("create_dataset", result)
    }

    #[tool(
        description = "Create the sample `departments` and `employees` tables in an existing dataset.\nFails if either table already exists."
    )]
    pub async fn create_sample_tables(
        &self,
        Parameters(input): Parameters<SampleDatasetInput>,
    ) -> String {
        let result = async {
            SampleToolHandler::new(self.database()?)
                .create_sample_tables(input)
                .await
        }
        .await;
        render("create_sample_tables", result)
    }

    #[tool(
        description = "Insert 10 departments and 50 randomly assigned employees into the sample tables."
    )]
    pub async fn insert_sample_data(
        &self,
        Parameters(input): Parameters<SampleDatasetInput>,
    ) -> String {
        let result = async {
            SampleToolHandler::new(self.database()?)
                .insert_sample_data(input)
                .await
        }
        .await;
        render("insert_sample_data", result)
    }

    #[tool(
        description = "Create a dataset, the sample tables and the sample data in one call.\nSteps already applied are kept if a later step fails. Location defaults to asia-south1."
    )]
    pub async fn create_complete_sample(
        &self,
        Parameters(input): Parameters<CreateCompleteSampleInput>,
    ) -> String {
        let result = async {
            SampleToolHandler::new(self.database()?)
                .create_complete_sample(input)
                .await
        }
        .await;
        render("create_complete_sample", result)
    }
}

#[tool_handler]
impl ServerHandler for BigQueryService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "bigquery-mcp-server".to_owned(),
                title: Some("BigQuery MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "BigQuery tools for exploring and analysing data.\n\
                \n\
                ## Discovery\n\
                - `list_tables` returns every `dataset.table` in the project\n\
                - `describe_table` returns the DDL of one table\n\
                \n\
                ## Analysis\n\
                - `execute_query` runs GoogleSQL; reference tables as `dataset.table`\n\
                \n\
                ## Setup\n\
                - `create_dataset`, `create_sample_tables`, `insert_sample_data`\n\
                - `create_complete_sample` runs all three in order\n\
                \n\
                Failures are returned as text starting with `Error:`."
                    .to_string(),
            ),
        }
    }
}
