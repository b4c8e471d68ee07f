//! Schema-related data models.
//!
//! This module defines table references and the table definitions used when
//! creating tables.

use crate::error::{BqError, BqResult};
use crate::models::query::ScalarType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A parsed `dataset.table` or `project.dataset.table` identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub project: Option<String>,
    pub dataset: String,
    pub table: String,
}

impl TableRef {
    /// Parse a dotted table name. Exactly 2 or 3 non-empty segments are accepted.
    pub fn parse(name: &str) -> BqResult<Self> {
        let parts: Vec<&str> = name.split('.').collect();
        if !(parts.len() == 2 || parts.len() == 3) || parts.iter().any(|p| p.trim().is_empty()) {
            return Err(BqError::invalid_input(format!("Invalid table name: {}", name)));
        }

        let table = parts[parts.len() - 1].to_string();
        let dataset = parts[parts.len() - 2].to_string();
        let project = (parts.len() == 3).then(|| parts[0].to_string());

        Ok(Self {
            project,
            dataset,
            table,
        })
    }

    /// Everything but the table segment: `dataset` or `project.dataset`.
    pub fn dataset_path(&self) -> String {
        match &self.project {
            Some(project) => format!("{}.{}", project, self.dataset),
            None => self.dataset.clone(),
        }
    }
}

impl FromStr for TableRef {
    type Err = BqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.dataset_path(), self.table)
    }
}

/// Validate a dataset name, returning it trimmed.
pub fn validate_dataset_name(name: &str) -> BqResult<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(BqError::invalid_input("Dataset name is required"));
    }
    if trimmed.contains('.') {
        return Err(BqError::invalid_input(format!(
            "Invalid dataset name: {}",
            name
        )));
    }
    Ok(trimmed)
}

/// Column mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldMode {
    #[default]
    Nullable,
    Required,
    Repeated,
}

impl FieldMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nullable => "NULLABLE",
            Self::Required => "REQUIRED",
            Self::Repeated => "REPEATED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: ScalarType,
    pub mode: FieldMode,
}

impl FieldSpec {
    /// A `REQUIRED` column.
    pub fn required(name: impl Into<String>, field_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            field_type,
            mode: FieldMode::Required,
        }
    }

    /// A `NULLABLE` column.
    pub fn nullable(name: impl Into<String>, field_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            field_type,
            mode: FieldMode::Nullable,
        }
    }

    fn column_ddl(&self) -> String {
        match self.mode {
            FieldMode::Nullable => format!("{} {}", self.name, self.field_type),
            FieldMode::Required => format!("{} {} NOT NULL", self.name, self.field_type),
            FieldMode::Repeated => format!("{} ARRAY<{}>", self.name, self.field_type),
        }
    }
}

/// Definition of a table to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub table_id: String,
    pub fields: Vec<FieldSpec>,
}

impl TableSpec {
    pub fn new(table_id: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            table_id: table_id.into(),
            fields,
        }
    }

    /// Render the `CREATE TABLE` statement BigQuery reports in
    /// `INFORMATION_SCHEMA.TABLES.ddl` for this definition.
    pub fn ddl(&self, project: &str, dataset: &str) -> String {
        let columns = self
            .fields
            .iter()
            .map(|f| format!("  {}", f.column_ddl()))
            .collect::<Vec<_>>()
            .join(",\n");
        format!(
            "CREATE TABLE `{}.{}.{}`\n(\n{}\n);",
            project, dataset, self.table_id, columns
        )
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}
