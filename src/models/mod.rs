//! Data models for the BigQuery MCP Server.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;
pub mod sample;
pub mod schema;

// Re-export commonly used types
pub use connection::{ConnectionSettings, DEFAULT_LOCATION};
pub use query::{QueryJob, QueryParam, Row, ScalarType};
pub use sample::{Department, Employee, SampleData};
pub use schema::{FieldMode, FieldSpec, TableRef, TableSpec, validate_dataset_name};
