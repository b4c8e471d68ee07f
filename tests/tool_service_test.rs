//! Integration tests for the tool service backed by the in-memory warehouse.

use bigquery_mcp_server::db::BigQueryDatabase;
use bigquery_mcp_server::mcp::BigQueryService;
use bigquery_mcp_server::tools::{
    CreateCompleteSampleInput, CreateDatasetInput, DescribeTableInput, ExecuteQueryInput,
    OutputFormat, SampleDatasetInput,
};
use bigquery_mcp_server::warehouse::MemoryWarehouse;
use rmcp::handler::server::wrapper::Parameters;
use std::collections::HashSet;
use std::sync::Arc;

fn create_test_service() -> (Arc<MemoryWarehouse>, BigQueryService) {
    let warehouse = Arc::new(MemoryWarehouse::new("test-project"));
    let db = BigQueryDatabase::new(warehouse.clone(), "US");
    (warehouse, BigQueryService::new(Arc::new(db)))
}

fn dataset(name: &str) -> Parameters<SampleDatasetInput> {
    Parameters(SampleDatasetInput {
        dataset_name: name.to_string(),
    })
}

fn complete_sample(name: &str) -> Parameters<CreateCompleteSampleInput> {
    Parameters(CreateCompleteSampleInput {
        dataset_name: name.to_string(),
        location: "asia-south1".to_string(),
    })
}

fn query(sql: &str, format: OutputFormat) -> Parameters<ExecuteQueryInput> {
    Parameters(ExecuteQueryInput {
        query: sql.to_string(),
        format,
    })
}

#[tokio::test]
async fn test_create_complete_sample_on_fresh_project() {
    let (warehouse, service) = create_test_service();

    let result = service.create_complete_sample(complete_sample("d1")).await;

    assert_eq!(
        result,
        "Dataset d1 created\nSample tables created\nSample data inserted (10 departments, 50 employees)"
    );
    assert_eq!(warehouse.dataset_location("d1").as_deref(), Some("asia-south1"));
}

#[tokio::test]
async fn test_create_dataset_twice_reports_existing() {
    let (_warehouse, service) = create_test_service();
    let input = || {
        Parameters(CreateDatasetInput {
            dataset_name: "d1".to_string(),
            location: "US".to_string(),
        })
    };

    assert_eq!(service.create_dataset(input()).await, "Dataset d1 created");
    assert_eq!(service.create_dataset(input()).await, "Dataset d1 already exists");
}

#[tokio::test]
async fn test_create_sample_tables_twice_fails_with_conflict() {
    let (_warehouse, service) = create_test_service();
    service.create_complete_sample(complete_sample("d1")).await;

    let result = service.create_sample_tables(dataset("d1")).await;

    assert!(result.starts_with("Error: "), "got: {}", result);
    assert!(result.contains("Already Exists"), "got: {}", result);
}

#[tokio::test]
async fn test_create_sample_tables_in_missing_dataset() {
    let (_warehouse, service) = create_test_service();
    let result = service.create_sample_tables(dataset("ghost")).await;
    assert_eq!(result, "Error: Not found: Dataset test-project:ghost");
}

#[tokio::test]
async fn test_list_tables_returns_each_table_once() {
    let (_warehouse, service) = create_test_service();
    service.create_complete_sample(complete_sample("d1")).await;
    service.create_complete_sample(complete_sample("d2")).await;

    let result = service.list_tables().await;
    let tables: Vec<String> = serde_json::from_str(&result).unwrap();
    let unique: HashSet<&String> = tables.iter().collect();

    assert_eq!(tables.len(), 4);
    assert_eq!(unique.len(), 4);
    for name in ["d1.departments", "d1.employees", "d2.departments", "d2.employees"] {
        assert!(tables.iter().any(|t| t == name), "missing {}", name);
    }
}

#[tokio::test]
async fn test_describe_table_returns_ddl() {
    let (_warehouse, service) = create_test_service();
    service.create_complete_sample(complete_sample("d1")).await;

    let result = service
        .describe_table(Parameters(DescribeTableInput {
            table_name: "d1.employees".to_string(),
        }))
        .await;
    let rows: Vec<serde_json::Value> = serde_json::from_str(&result).unwrap();

    assert_eq!(rows.len(), 1);
    let ddl = rows[0]["ddl"].as_str().unwrap();
    assert!(ddl.starts_with("CREATE TABLE `test-project.d1.employees`"));
    assert!(ddl.contains("dept_id STRING NOT NULL"));
}

#[tokio::test]
async fn test_describe_table_rejects_malformed_names_without_remote_call() {
    let (warehouse, service) = create_test_service();

    for name in ["employees", "a.b.c.d"] {
        let result = service
            .describe_table(Parameters(DescribeTableInput {
                table_name: name.to_string(),
            }))
            .await;
        assert_eq!(result, format!("Error: Invalid table name: {}", name));
    }
    assert!(warehouse.calls().is_empty());
    assert!(warehouse.executed_queries().is_empty());
}

#[tokio::test]
async fn test_execute_query_json() {
    let (_warehouse, service) = create_test_service();
    service.create_complete_sample(complete_sample("d1")).await;

    let result = service
        .execute_query(query("SELECT * FROM `d1.departments`", OutputFormat::Json))
        .await;
    let rows: Vec<serde_json::Value> = serde_json::from_str(&result).unwrap();

    assert_eq!(rows.len(), 10);
    assert_eq!(rows[0]["dept_id"], "dept_1");
}

#[tokio::test]
async fn test_execute_query_table_format() {
    let (_warehouse, service) = create_test_service();
    service.create_complete_sample(complete_sample("d1")).await;

    let result = service
        .execute_query(query(
            "SELECT dept_name FROM d1.departments",
            OutputFormat::Table,
        ))
        .await;

    assert!(result.contains("|   dept_name   |"), "got: {}", result);
    assert!(result.contains("| Department_10 |"));
    assert!(result.contains("10 rows in set"));
}

#[tokio::test]
async fn test_execute_query_remote_error_is_rendered() {
    let (_warehouse, service) = create_test_service();
    let result = service
        .execute_query(query("SELECT * FROM d1.nothing", OutputFormat::Json))
        .await;
    assert!(result.starts_with("Error: Not found: Dataset"), "got: {}", result);
}

#[tokio::test]
async fn test_uninitialized_service_answers_every_tool() {
    let service = BigQueryService::uninitialized();
    let expected = "Error: Database not initialized";

    assert_eq!(
        service
            .execute_query(query("SELECT 1", OutputFormat::Json))
            .await,
        expected
    );
    assert_eq!(service.list_tables().await, expected);
    assert_eq!(
        service
            .describe_table(Parameters(DescribeTableInput {
                table_name: "d1.t".to_string(),
            }))
            .await,
        expected
    );
    assert_eq!(
        service
            .create_dataset(Parameters(CreateDatasetInput {
                dataset_name: "d1".to_string(),
                location: "US".to_string(),
            }))
            .await,
        expected
    );
    assert_eq!(service.create_sample_tables(dataset("d1")).await, expected);
    assert_eq!(service.insert_sample_data(dataset("d1")).await, expected);
    assert_eq!(
        service.create_complete_sample(complete_sample("d1")).await,
        expected
    );
}
