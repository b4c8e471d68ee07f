//! Integration tests for sample data seeding and partial failures of the
//! complete sample setup.

use bigquery_mcp_server::db::BigQueryDatabase;
use bigquery_mcp_server::error::ErrorKind;
use bigquery_mcp_server::models::sample::{DEPARTMENTS_TABLE, EMPLOYEES_TABLE, employees_table};
use bigquery_mcp_server::models::SampleData;
use bigquery_mcp_server::warehouse::{MemoryWarehouse, Warehouse, WarehouseOp};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashSet;
use std::sync::Arc;

fn create_test_database() -> (Arc<MemoryWarehouse>, BigQueryDatabase) {
    let warehouse = Arc::new(MemoryWarehouse::new("test-project"));
    let db = BigQueryDatabase::new(warehouse.clone(), "US");
    (warehouse, db)
}

async fn prepared_dataset(db: &BigQueryDatabase, name: &str) {
    db.create_dataset(name, None).await.unwrap();
    db.create_sample_tables(name).await.unwrap();
}

#[tokio::test]
async fn test_insert_sample_data_counts_and_references() {
    let (warehouse, db) = create_test_database();
    prepared_dataset(&db, "d1").await;

    let status = db.insert_sample_data("d1").await.unwrap();
    assert_eq!(status, "Sample data inserted (10 departments, 50 employees)");

    let departments = warehouse.rows("d1", DEPARTMENTS_TABLE).unwrap();
    let employees = warehouse.rows("d1", EMPLOYEES_TABLE).unwrap();
    assert_eq!(departments.len(), 10);
    assert_eq!(employees.len(), 50);

    let dept_ids: HashSet<&str> = departments
        .iter()
        .map(|d| d["dept_id"].as_str().unwrap())
        .collect();
    assert_eq!(dept_ids.len(), 10);
    for employee in &employees {
        assert!(dept_ids.contains(employee["dept_id"].as_str().unwrap()));
    }
}

#[tokio::test]
async fn test_insert_fixture_is_deterministic_with_seed() {
    let (warehouse, db) = create_test_database();
    prepared_dataset(&db, "d1").await;
    let data = SampleData::generate_with(&mut StdRng::seed_from_u64(42)).unwrap();

    db.insert_fixture("d1", &data).await.unwrap();

    let employees = warehouse.rows("d1", EMPLOYEES_TABLE).unwrap();
    for (row, expected) in employees.iter().zip(&data.employees) {
        assert_eq!(row["emp_id"], expected.emp_id.as_str());
        assert_eq!(row["dept_id"], expected.dept_id.as_str());
    }
}

#[tokio::test]
async fn test_rejected_employee_rows_name_the_table() {
    let (warehouse, db) = create_test_database();
    prepared_dataset(&db, "d1").await;
    warehouse.reject_rows(EMPLOYEES_TABLE);

    let err = db.insert_sample_data("d1").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RowInsert);
    assert!(err.to_string().starts_with("Failed to insert employees: "));
    // departments went in before the employees insert failed
    assert_eq!(warehouse.rows("d1", DEPARTMENTS_TABLE).unwrap().len(), 10);
}

#[tokio::test]
async fn test_complete_sample_stops_when_a_table_exists() {
    let (warehouse, db) = create_test_database();
    warehouse.create_dataset("d1", "US").await.unwrap();
    warehouse.create_table("d1", &employees_table()).await.unwrap();

    let err = db.create_complete_sample("d1", None).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PartialFailure);
    let message = err.to_string();
    assert!(message.contains("create sample tables"), "got: {}", message);
    assert!(message.contains("completed: Dataset d1 already exists"), "got: {}", message);

    // departments was created before the conflict and is left in place, empty
    assert!(warehouse.has_table("d1", DEPARTMENTS_TABLE));
    assert_eq!(warehouse.rows("d1", DEPARTMENTS_TABLE).unwrap().len(), 0);
    assert_eq!(warehouse.rows("d1", EMPLOYEES_TABLE).unwrap().len(), 0);
}

#[tokio::test]
async fn test_complete_sample_insert_failure_keeps_dataset_and_tables() {
    let (warehouse, db) = create_test_database();
    warehouse.fail_on(WarehouseOp::InsertRows, "reason: backendError");

    let err = db.create_complete_sample("d2", Some("EU")).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PartialFailure);
    let message = err.to_string();
    assert!(message.contains("insert sample data"));
    assert!(message.contains("Dataset d2 created; Sample tables created"));

    assert_eq!(warehouse.dataset_location("d2").as_deref(), Some("EU"));
    assert!(warehouse.has_table("d2", DEPARTMENTS_TABLE));
    assert!(warehouse.has_table("d2", EMPLOYEES_TABLE));
    assert!(warehouse.rows("d2", DEPARTMENTS_TABLE).unwrap().is_empty());
}

#[tokio::test]
async fn test_complete_sample_dataset_failure_applies_nothing() {
    let (warehouse, db) = create_test_database();
    warehouse.fail_on(WarehouseOp::CreateDataset, "Access Denied: Project test-project");

    let err = db.create_complete_sample("d3", None).await.unwrap_err();

    assert!(err.to_string().ends_with("(completed: none)"));
    assert!(!warehouse.has_dataset("d3"));
    assert_eq!(warehouse.calls(), vec![WarehouseOp::CreateDataset]);
}

#[tokio::test]
async fn test_empty_dataset_name_is_rejected_before_remote_calls() {
    let (warehouse, db) = create_test_database();

    for result in [
        db.create_sample_tables("").await,
        db.insert_sample_data(" ").await,
        db.create_complete_sample("", None).await,
    ] {
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Validation);
    }
    assert!(warehouse.calls().is_empty());
}
