//! Sample dataset tools.
//!
//! This module implements `create_sample_tables`, `insert_sample_data` and
//! `create_complete_sample`.

use crate::db::BigQueryDatabase;
use crate::error::BqResult;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

/// Location used by `create_complete_sample` when none is given.
pub const DEFAULT_SAMPLE_LOCATION: &str = "asia-south1";

fn default_sample_location() -> String {
    DEFAULT_SAMPLE_LOCATION.to_string()
}

/// Input for the create_sample_tables and insert_sample_data tools.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SampleDatasetInput {
    /// Dataset that holds (or will hold) the departments and employees tables
    pub dataset_name: String,
}

/// Input for the create_complete_sample tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateCompleteSampleInput {
    /// Dataset to create
    pub dataset_name: String,
    /// Dataset location. Default: asia-south1
    #[serde(default = "default_sample_location")]
    pub location: String,
}

pub struct SampleToolHandler {
    db: Arc<BigQueryDatabase>,
}

impl SampleToolHandler {
    pub fn new(db: Arc<BigQueryDatabase>) -> Self {
        Self { db }
    }

    pub async fn create_sample_tables(&self, input: SampleDatasetInput) -> BqResult<String> {
        self.db.create_sample_tables(&input.dataset_name).await
    }

    pub async fn insert_sample_data(&self, input: SampleDatasetInput) -> BqResult<String> {
        self.db.insert_sample_data(&input.dataset_name).await
    }

    pub async fn create_complete_sample(&self, input: CreateCompleteSampleInput) -> BqResult<String> {
        self.db
            .create_complete_sample(&input.dataset_name, Some(&input.location))
            .await
    }
}
