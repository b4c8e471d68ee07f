//! Dataset creation tool.

use crate::db::BigQueryDatabase;
use crate::error::BqResult;
use crate::models::DEFAULT_LOCATION;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

fn default_location() -> String {
    DEFAULT_LOCATION.to_string()
}

/// Input for the create_dataset tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateDatasetInput {
    /// Dataset id, without project prefix
    pub dataset_name: String,
    /// Dataset location. Default: US
    #[serde(default = "default_location")]
    pub location: String,
}

pub struct DatasetToolHandler {
    db: Arc<BigQueryDatabase>,
}

impl DatasetToolHandler {
    pub fn new(db: Arc<BigQueryDatabase>) -> Self {
        Self { db }
    }

    pub async fn create_dataset(&self, input: CreateDatasetInput) -> BqResult<String> {
        self.db
            .create_dataset(&input.dataset_name, Some(&input.location))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_defaults_to_us() {
        let input: CreateDatasetInput = serde_json::from_str(r#"{"dataset_name": "d1"}"#).unwrap();
        assert_eq!(input.location, "US");
    }
}
