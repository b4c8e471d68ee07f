//! Tests against a real BigQuery project.
//!
//! Skipped unless `TEST_BIGQUERY_PROJECT` is set. Credentials come from
//! `TEST_BIGQUERY_KEY_FILE` when set, otherwise from Application Default
//! Credentials.

use bigquery_mcp_server::db::BigQueryDatabase;
use bigquery_mcp_server::error::ErrorKind;
use bigquery_mcp_server::models::ConnectionSettings;

fn live_settings() -> Option<ConnectionSettings> {
    let project = std::env::var("TEST_BIGQUERY_PROJECT").ok()?;
    let location = std::env::var("TEST_BIGQUERY_LOCATION").unwrap_or_else(|_| "US".to_string());
    let settings = ConnectionSettings::new(project, location);
    Some(match std::env::var("TEST_BIGQUERY_KEY_FILE") {
        Ok(key_file) => settings.with_key_file(key_file),
        Err(_) => settings,
    })
}

#[tokio::test]
async fn test_connect_validates_before_network() {
    let err = BigQueryDatabase::connect(&ConnectionSettings::new("", "US"))
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.to_string(), "Project is required");

    let err = BigQueryDatabase::connect(&ConnectionSettings::new("p", ""))
        .await
        .err()
        .unwrap();
    assert_eq!(err.to_string(), "Location is required");
}

#[tokio::test]
async fn test_live_query_and_listing() {
    let Some(settings) = live_settings() else {
        eprintln!("TEST_BIGQUERY_PROJECT not set, skipping");
        return;
    };
    let db = BigQueryDatabase::connect(&settings).await.unwrap();

    let rows = db
        .execute_query("SELECT 1 AS one, 'a' AS letter", Vec::new())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["one"], 1);
    assert_eq!(rows[0]["letter"], "a");

    db.list_tables().await.unwrap();
}

#[tokio::test]
async fn test_live_invalid_sql_is_remote_error() {
    let Some(settings) = live_settings() else {
        eprintln!("TEST_BIGQUERY_PROJECT not set, skipping");
        return;
    };
    let db = BigQueryDatabase::connect(&settings).await.unwrap();

    let err = db.execute_query("SELEC 1", Vec::new()).await.unwrap_err();
    assert!(!err.is_local());
}
