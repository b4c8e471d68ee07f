//! Schema introspection tools.
//!
//! This module implements the `list_tables` and `describe_table` MCP tools.

use crate::db::BigQueryDatabase;
use crate::error::{BqError, BqResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Input for the describe_table tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DescribeTableInput {
    /// Table as `dataset.table` or `project.dataset.table`
    pub table_name: String,
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> BqResult<String> {
    serde_json::to_string(value)
        .map_err(|e| BqError::internal(format!("Failed to serialize result: {}", e)))
}

/// Handler for schema tools.
pub struct SchemaToolHandler {
    db: Arc<BigQueryDatabase>,
}

impl SchemaToolHandler {
    pub fn new(db: Arc<BigQueryDatabase>) -> Self {
        Self { db }
    }

    /// JSON array of `dataset.table` names.
    pub async fn list_tables(&self) -> BqResult<String> {
        let tables = self.db.list_tables().await?;
        info!(count = tables.len(), "Listed tables");
        to_json(&tables)
    }

    /// JSON array of rows carrying the table's DDL. Empty if the table does not exist.
    pub async fn describe_table(&self, input: DescribeTableInput) -> BqResult<String> {
        let rows = self.db.describe_table(input.table_name.trim()).await?;
        to_json(&rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::MemoryWarehouse;

    fn handler() -> SchemaToolHandler {
        let warehouse = Arc::new(MemoryWarehouse::new("p"));
        SchemaToolHandler::new(Arc::new(BigQueryDatabase::new(warehouse, "US")))
    }

    #[tokio::test]
    async fn test_list_tables_empty_project() {
        assert_eq!(handler().list_tables().await.unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_describe_table_invalid_name() {
        let err = handler()
            .describe_table(DescribeTableInput {
                table_name: "just_a_table".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid table name: just_a_table");
    }
}
