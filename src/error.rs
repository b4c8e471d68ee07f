//! Error types for the BigQuery MCP Server.
//!
//! Errors are categorized with [`ErrorKind`] so callers inside the crate can
//! tell validation failures apart from remote failures. The `Display` output of
//! every variant is the bare message; the tool boundary decides how to present it.

use gcp_bigquery_client::error::BQError;
use std::fmt;
use thiserror::Error;

/// Category of a [`BqError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotInitialized,
    Credentials,
    NotFound,
    Conflict,
    Unavailable,
    Remote,
    RowInsert,
    PartialFailure,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotInitialized => "not_initialized",
            Self::Credentials => "credentials",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Unavailable => "unavailable",
            Self::Remote => "remote",
            Self::RowInsert => "row_insert",
            Self::PartialFailure => "partial_failure",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum BqError {
    #[error("{message}")]
    InvalidInput { message: String },

    #[error("Database not initialized")]
    NotInitialized,

    #[error("{message}")]
    Credentials { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("{message}")]
    Unavailable { message: String },

    #[error("{message}")]
    Remote { message: String },

    /// The insert request succeeded but some rows were rejected.
    #[error("Failed to insert {table}: {errors}")]
    RowInsert { table: String, errors: String },

    /// A multi-step operation stopped midway. Completed steps are not rolled back.
    #[error(
        "Sample setup stopped at step '{step}': {source} (completed: {})",
        completed_summary(.completed)
    )]
    PartialSample {
        step: String,
        completed: Vec<String>,
        source: Box<BqError>,
    },

    #[error("{message}")]
    Internal { message: String },
}

fn completed_summary(completed: &[String]) -> String {
    if completed.is_empty() {
        "none".to_string()
    } else {
        completed.join("; ")
    }
}

impl BqError {
    /// Create an invalid input (validation) error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a credentials error.
    pub fn credentials(message: impl Into<String>) -> Self {
        Self::Credentials {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// Create a row insert error from the rejected rows' description.
    pub fn row_insert(table: impl Into<String>, errors: impl Into<String>) -> Self {
        Self::RowInsert {
            table: table.into(),
            errors: errors.into(),
        }
    }

    /// Wrap the error of a failed step together with the steps that already completed.
    pub fn partial_sample(step: impl Into<String>, completed: Vec<String>, source: BqError) -> Self {
        Self::PartialSample {
            step: step.into(),
            completed,
            source: Box::new(source),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::Validation,
            Self::NotInitialized => ErrorKind::NotInitialized,
            Self::Credentials { .. } => ErrorKind::Credentials,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Unavailable { .. } => ErrorKind::Unavailable,
            Self::Remote { .. } => ErrorKind::Remote,
            Self::RowInsert { .. } => ErrorKind::RowInsert,
            Self::PartialSample { .. } => ErrorKind::PartialFailure,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// True if the error was raised locally, before any remote call.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. } | Self::NotInitialized | Self::Credentials { .. }
        )
    }

    /// True if the remote service reported that the entity already exists.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Classify a BigQuery error response by its HTTP status code.
pub(crate) fn classify_status(code: i64, message: String) -> BqError {
    match code {
        409 => BqError::conflict(message),
        404 => BqError::not_found(message),
        429 | 500..=599 => BqError::unavailable(message),
        _ => BqError::remote(message),
    }
}

/// Classify an error that only carries BigQuery's message text.
///
/// Used by the in-memory warehouse, whose injected failures have no status.
pub(crate) fn classify_message(message: String) -> BqError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("already exists") || lower.contains("duplicate") {
        BqError::conflict(message)
    } else if lower.contains("not found") || lower.contains("notfound") {
        BqError::not_found(message)
    } else if lower.contains("backenderror") || lower.contains("ratelimitexceeded") {
        BqError::unavailable(message)
    } else {
        BqError::remote(message)
    }
}

/// Convert client library errors to BqError.
impl From<BQError> for BqError {
    fn from(err: BQError) -> Self {
        match &err {
            BQError::InvalidServiceAccountKey(_)
            | BQError::InvalidServiceAccountAuthenticator(_)
            | BQError::InvalidApplicationDefaultCredentialsAuthenticator(_)
            | BQError::InvalidInstalledFlowAuthenticator(_)
            | BQError::InvalidAuthorizedUserAuthenticator(_)
            | BQError::AuthError(_)
            | BQError::YupAuthError(_)
            | BQError::NoToken => BqError::credentials(err.to_string()),
            BQError::RequestError(_) | BQError::TonicTransportError(_) => {
                BqError::unavailable(err.to_string())
            }
            BQError::ResponseError { error } => {
                classify_status(i64::from(error.error.code), error.error.message.clone())
            }
            _ => BqError::remote(err.to_string()),
        }
    }
}

/// Result type alias for BigQuery operations.
pub type BqResult<T> = Result<T, BqError>;
