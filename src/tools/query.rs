//! Query execution tool.
//!
//! This module implements the `execute_query` MCP tool. The SQL is sent to
//! BigQuery as-is; BigQuery itself rejects anything invalid.

use crate::db::BigQueryDatabase;
use crate::error::BqResult;
use crate::tools::format::{OutputFormat, render_rows};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Input for the execute_query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExecuteQueryInput {
    /// GoogleSQL query to run, e.g. SELECT * FROM `dataset.table` LIMIT 10
    pub query: String,
    /// Output format: "json" (default) returns an array of row objects, "table" an ASCII table, "markdown" a markdown table
    #[serde(default)]
    pub format: OutputFormat,
}

/// Handler for query execution.
pub struct QueryToolHandler {
    db: Arc<BigQueryDatabase>,
}

impl QueryToolHandler {
    pub fn new(db: Arc<BigQueryDatabase>) -> Self {
        Self { db }
    }

    pub async fn execute_query(&self, input: ExecuteQueryInput) -> BqResult<String> {
        info!(format = ?input.format, "Executing query");
        let start = Instant::now();
        let rows = self.db.execute_query(&input.query, Vec::new()).await?;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        render_rows(&rows, input.format, elapsed_ms)
    }
}
