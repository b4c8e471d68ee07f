//! Remote warehouse abstraction.
//!
//! The data-access wrapper only talks to BigQuery through the [`Warehouse`]
//! trait. Implementations:
//! - `gcp`: the real service through `gcp-bigquery-client`
//! - `memory`: an in-process warehouse for tests and local development

pub mod gcp;
pub mod memory;

pub use gcp::GcpWarehouse;
pub use memory::{MemoryWarehouse, WarehouseOp};

use crate::error::BqResult;
use crate::models::{QueryJob, Row, TableSpec};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// A row rejected by a streaming insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// Position of the row in the insert request
    pub index: usize,
    pub message: String,
}

/// Primitive operations against the remote warehouse.
///
/// Every method maps to one remote call (or one page of results). Nothing is
/// cached and nothing is retried.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Project that owns datasets created and listed through this warehouse.
    fn project_id(&self) -> &str;

    /// Run a query job and return all rows of the first result page.
    async fn query(&self, job: &QueryJob) -> BqResult<Vec<Row>>;

    /// Ids of all datasets in the project.
    async fn list_datasets(&self) -> BqResult<Vec<String>>;

    /// Ids of all tables in a dataset.
    async fn list_tables(&self, dataset_id: &str) -> BqResult<Vec<String>>;

    /// Create a dataset. Fails with a conflict error if it already exists.
    async fn create_dataset(&self, dataset_id: &str, location: &str) -> BqResult<()>;

    /// Create a table. Fails with a conflict error if it already exists.
    async fn create_table(&self, dataset_id: &str, table: &TableSpec) -> BqResult<()>;

    /// Stream rows into a table, returning the rows that were rejected.
    async fn insert_rows(
        &self,
        dataset_id: &str,
        table_id: &str,
        rows: Vec<JsonValue>,
    ) -> BqResult<Vec<RowError>>;

    /// Name of this backend for logging.
    fn name(&self) -> &'static str;
}
