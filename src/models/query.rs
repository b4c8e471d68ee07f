//! Query-related data models.
//!
//! This module defines types for BigQuery query jobs and their results.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// A result row: column name to value.
pub type Row = serde_json::Map<String, JsonValue>;

/// BigQuery scalar type, used for query parameters and column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScalarType {
    String,
    Int64,
    Float64,
    Bool,
}

impl ScalarType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Int64 => "INT64",
            Self::Float64 => "FLOAT64",
            Self::Bool => "BOOL",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed scalar query parameter (`@name` in SQL).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParam {
    pub name: String,
    pub param_type: ScalarType,
    /// Value in BigQuery's string encoding
    pub value: String,
}

impl QueryParam {
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: ScalarType::String,
            value: value.into(),
        }
    }

    pub fn int64(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            param_type: ScalarType::Int64,
            value: value.to_string(),
        }
    }

    pub fn float64(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            param_type: ScalarType::Float64,
            value: value.to_string(),
        }
    }

    pub fn bool(name: impl Into<String>, value: bool) -> Self {
        Self {
            name: name.into(),
            param_type: ScalarType::Bool,
            value: value.to_string(),
        }
    }
}

/// A query to run as a BigQuery job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryJob {
    pub sql: String,
    pub params: Vec<QueryParam>,
    /// Location the job runs in. None lets BigQuery infer it.
    pub location: Option<String>,
}

impl QueryJob {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Default::default()
        }
    }

    /// Add a named parameter.
    pub fn with_param(mut self, param: QueryParam) -> Self {
        self.params.push(param);
        self
    }

    /// Add several named parameters.
    pub fn with_params(mut self, params: impl IntoIterator<Item = QueryParam>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Look up a parameter by name.
    pub fn param(&self, name: &str) -> Option<&QueryParam> {
        self.params.iter().find(|p| p.name == name)
    }
}
