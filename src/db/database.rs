//! BigQuery data-access wrapper.
//!
//! Every operation forwards to the [`Warehouse`] it was built with. Multi-step
//! operations run their remote calls one after another and are not
//! transactional: a failure leaves the completed steps in place.

use crate::error::{BqError, BqResult};
use crate::models::sample::{
    DEPARTMENTS_TABLE, EMPLOYEES_TABLE, departments_table, employees_table,
};
use crate::models::{
    ConnectionSettings, QueryJob, QueryParam, Row, SampleData, TableRef, validate_dataset_name,
};
use crate::warehouse::{GcpWarehouse, Warehouse};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};

const STEP_CREATE_DATASET: &str = "create dataset";
const STEP_CREATE_TABLES: &str = "create sample tables";
const STEP_INSERT_DATA: &str = "insert sample data";

/// Shared handle to the warehouse. Cheap to share behind an `Arc`.
pub struct BigQueryDatabase {
    warehouse: Arc<dyn Warehouse>,
    /// Location for new datasets when the caller does not give one
    location: String,
}

impl BigQueryDatabase {
    pub fn new(warehouse: Arc<dyn Warehouse>, location: impl Into<String>) -> Self {
        Self {
            warehouse,
            location: location.into(),
        }
    }

    /// Connect to BigQuery with the given settings.
    ///
    /// Project and location are validated before any network call.
    pub async fn connect(settings: &ConnectionSettings) -> BqResult<Self> {
        settings.validate()?;
        let warehouse = GcpWarehouse::connect(settings).await?;
        info!(
            project = %settings.project,
            location = %settings.location,
            key_file = settings.has_key_file(),
            "Connected to BigQuery"
        );
        Ok(Self::new(Arc::new(warehouse), settings.location.clone()))
    }

    pub fn project_id(&self) -> &str {
        self.warehouse.project_id()
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Name of the warehouse backend.
    pub fn backend(&self) -> &'static str {
        self.warehouse.name()
    }

    /// Run a query and return its rows. The SQL is passed through unchecked.
    pub async fn execute_query(&self, query: &str, params: Vec<QueryParam>) -> BqResult<Vec<Row>> {
        let job = QueryJob::new(query).with_params(params);
        match self.warehouse.query(&job).await {
            Ok(rows) => {
                debug!(rows = rows.len(), "Query executed");
                Ok(rows)
            }
            Err(e) => {
                error!(kind = %e.kind(), error = %e, "Query failed");
                Err(e)
            }
        }
    }

    /// Every table in every dataset of the project, as `dataset.table`.
    pub async fn list_tables(&self) -> BqResult<Vec<String>> {
        let mut tables = Vec::new();
        for dataset in self.warehouse.list_datasets().await? {
            for table in self.warehouse.list_tables(&dataset).await? {
                tables.push(format!("{}.{}", dataset, table));
            }
        }
        debug!(count = tables.len(), "Listed tables");
        Ok(tables)
    }

    /// DDL of a table, looked up in the dataset's `INFORMATION_SCHEMA.TABLES`.
    pub async fn describe_table(&self, table_name: &str) -> BqResult<Vec<Row>> {
        let table = TableRef::parse(table_name)?;
        let sql = format!(
            "SELECT ddl FROM `{}.INFORMATION_SCHEMA.TABLES` WHERE table_name = @table_name",
            table.dataset_path()
        );
        let params = vec![QueryParam::string("table_name", table.table.clone())];
        self.execute_query(&sql, params).await
    }

    /// Create a dataset. An existing dataset is reported, not treated as a failure.
    pub async fn create_dataset(&self, dataset_name: &str, location: Option<&str>) -> BqResult<String> {
        let dataset = validate_dataset_name(dataset_name)?;
        let location = location.unwrap_or(self.location.as_str());

        match self.warehouse.create_dataset(dataset, location).await {
            Ok(()) => {
                info!(dataset = %dataset, location = %location, "Dataset created");
                Ok(format!("Dataset {} created", dataset))
            }
            Err(e) if e.is_conflict() => {
                info!(dataset = %dataset, "Dataset already exists");
                Ok(format!("Dataset {} already exists", dataset))
            }
            Err(e) => {
                error!(dataset = %dataset, error = %e, "Failed to create dataset");
                Err(e)
            }
        }
    }

    /// Create the `departments` and `employees` tables. Fails if either exists.
    pub async fn create_sample_tables(&self, dataset_name: &str) -> BqResult<String> {
        let dataset = validate_dataset_name(dataset_name)?;
        for table in [departments_table(), employees_table()] {
            self.warehouse.create_table(dataset, &table).await?;
            info!(dataset = %dataset, table = %table.table_id, "Table created");
        }
        Ok("Sample tables created".to_string())
    }

    /// Insert a freshly generated fixture into the sample tables.
    pub async fn insert_sample_data(&self, dataset_name: &str) -> BqResult<String> {
        let data = SampleData::generate()?;
        self.insert_fixture(dataset_name, &data).await
    }

    /// Insert the given fixture into the sample tables.
    pub async fn insert_fixture(&self, dataset_name: &str, data: &SampleData) -> BqResult<String> {
        let dataset = validate_dataset_name(dataset_name)?;
        self.insert_into(dataset, DEPARTMENTS_TABLE, &data.departments)
            .await?;
        self.insert_into(dataset, EMPLOYEES_TABLE, &data.employees)
            .await?;
        info!(
            dataset = %dataset,
            departments = data.departments.len(),
            employees = data.employees.len(),
            "Sample data inserted"
        );
        Ok(data.summary())
    }

    async fn insert_into<T: Serialize>(&self, dataset: &str, table: &str, rows: &[T]) -> BqResult<()> {
        let rows = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| BqError::internal(format!("Failed to encode {} rows: {}", table, e)))?;

        let errors = self.warehouse.insert_rows(dataset, table, rows).await?;
        if errors.is_empty() {
            return Ok(());
        }

        error!(dataset = %dataset, table = %table, rejected = errors.len(), "Rows rejected");
        let detail = serde_json::to_string(&errors)
            .map_err(|e| BqError::internal(format!("Failed to encode insert errors: {}", e)))?;
        Err(BqError::row_insert(table, detail))
    }

    /// Create a dataset, the sample tables and the sample rows.
    ///
    /// Returns the three status lines joined by newlines. On failure the error
    /// names the failing step and lists the steps already applied; nothing is
    /// rolled back.
    pub async fn create_complete_sample(
        &self,
        dataset_name: &str,
        location: Option<&str>,
    ) -> BqResult<String> {
        let dataset = validate_dataset_name(dataset_name)?;
        let mut completed = Vec::with_capacity(3);

        let status = self
            .create_dataset(dataset, location)
            .await
            .map_err(|e| BqError::partial_sample(STEP_CREATE_DATASET, completed.clone(), e))?;
        completed.push(status);

        let status = self
            .create_sample_tables(dataset)
            .await
            .map_err(|e| BqError::partial_sample(STEP_CREATE_TABLES, completed.clone(), e))?;
        completed.push(status);

        let status = self
            .insert_sample_data(dataset)
            .await
            .map_err(|e| BqError::partial_sample(STEP_INSERT_DATA, completed.clone(), e))?;
        completed.push(status);

        Ok(completed.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::warehouse::{MemoryWarehouse, WarehouseOp};

    fn database() -> (Arc<MemoryWarehouse>, BigQueryDatabase) {
        let warehouse = Arc::new(MemoryWarehouse::new("test-project"));
        let db = BigQueryDatabase::new(warehouse.clone(), "US");
        (warehouse, db)
    }

    #[tokio::test]
    async fn test_describe_table_rejects_bad_names_without_remote_call() {
        let (warehouse, db) = database();
        for name in ["orders", "a.b.c.d"] {
            let err = db.describe_table(name).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert!(warehouse.calls().is_empty());
    }

    #[tokio::test]
    async fn test_describe_table_issues_parameterized_query() {
        let (warehouse, db) = database();
        db.describe_table("proj.sales.orders").await.ok();

        let queries = warehouse.executed_queries();
        assert_eq!(queries.len(), 1);
        assert!(
            queries[0]
                .sql
                .contains("`proj.sales.INFORMATION_SCHEMA.TABLES`")
        );
        assert_eq!(
            queries[0].param("table_name").map(|p| p.value.as_str()),
            Some("orders")
        );
    }

    #[tokio::test]
    async fn test_create_dataset_uses_default_location() {
        let (warehouse, db) = database();
        assert_eq!(db.create_dataset("d1", None).await.unwrap(), "Dataset d1 created");
        assert_eq!(warehouse.dataset_location("d1").as_deref(), Some("US"));
    }

    #[tokio::test]
    async fn test_configured_location_applies_to_datasets_not_queries() {
        let warehouse = Arc::new(MemoryWarehouse::new("test-project"));
        let db = BigQueryDatabase::new(warehouse.clone(), "EU");

        db.create_dataset("d1", None).await.unwrap();
        db.execute_query("SELECT 1 AS n", Vec::new()).await.unwrap();

        assert_eq!(warehouse.dataset_location("d1").as_deref(), Some("EU"));
        assert_eq!(warehouse.executed_queries()[0].location, None);
    }

    #[tokio::test]
    async fn test_create_dataset_rejects_empty_name() {
        let (warehouse, db) = database();
        let err = db.create_dataset("  ", None).await.unwrap_err();
        assert_eq!(err.to_string(), "Dataset name is required");
        assert!(warehouse.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_dataset_propagates_other_failures() {
        let (warehouse, db) = database();
        warehouse.fail_on(WarehouseOp::CreateDataset, "Access Denied: Project test-project");
        let err = db.create_dataset("d1", Some("EU")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Remote);
    }

    #[tokio::test]
    async fn test_insert_rejected_departments() {
        let (warehouse, db) = database();
        db.create_dataset("d1", None).await.unwrap();
        db.create_sample_tables("d1").await.unwrap();
        warehouse.reject_rows(DEPARTMENTS_TABLE);

        let err = db.insert_sample_data("d1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RowInsert);
        assert!(err.to_string().starts_with("Failed to insert departments: "));
        assert_eq!(warehouse.rows("d1", EMPLOYEES_TABLE).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_list_tables_stops_on_remote_failure() {
        let (warehouse, db) = database();
        db.create_dataset("d1", None).await.unwrap();
        warehouse.fail_on(WarehouseOp::ListTables, "reason: backendError");
        let err = db.list_tables().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
    }
}
