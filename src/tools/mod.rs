//! MCP tool implementations.
//!
//! This module contains all BigQuery tool handlers:
//! - `query`: `execute_query`
//! - `schema`: `list_tables`, `describe_table`
//! - `dataset`: `create_dataset`
//! - `sample`: `create_sample_tables`, `insert_sample_data`, `create_complete_sample`
//! - `format`: JSON, ASCII table and markdown rendering of query rows

pub mod dataset;
pub mod format;
pub mod query;
pub mod sample;
pub mod schema;

pub use dataset::{CreateDatasetInput, DatasetToolHandler};
pub use format::OutputFormat;
pub use query::{ExecuteQueryInput, QueryToolHandler};
pub use sample::{CreateCompleteSampleInput, SampleDatasetInput, SampleToolHandler};
pub use schema::{DescribeTableInput, SchemaToolHandler};
