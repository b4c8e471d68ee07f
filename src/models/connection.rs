//! Connection-related data models.
//!
//! This module defines the settings used to open the single BigQuery
//! connection held by the server.

use crate::error::{BqError, BqResult};
use std::fmt;
use std::path::PathBuf;

/// Default BigQuery location for new datasets.
pub const DEFAULT_LOCATION: &str = "US";

/// Settings for the BigQuery connection.
///
/// The key file path is sensitive and is never included in `Debug` output.
#[derive(Clone)]
pub struct ConnectionSettings {
    pub project: String,
    pub location: String,
    /// Service account key file. When absent, Application Default Credentials are used.
    pub key_file: Option<PathBuf>,
    /// Override for the BigQuery v2 REST base URL (emulators, tests)
    pub api_endpoint: Option<String>,
}

impl ConnectionSettings {
    /// Create settings for a project and location, using ADC.
    pub fn new(project: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            location: location.into(),
            key_file: None,
            api_endpoint: None,
        }
    }

    /// Use a service account key file.
    pub fn with_key_file(mut self, key_file: impl Into<PathBuf>) -> Self {
        self.key_file = Some(key_file.into());
        self
    }

    /// Use a custom v2 REST base URL.
    pub fn with_api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = Some(endpoint.into());
        self
    }

    /// Check the settings before any network call is made.
    pub fn validate(&self) -> BqResult<()> {
        if self.project.trim().is_empty() {
            return Err(BqError::invalid_input("Project is required"));
        }
        if self.location.trim().is_empty() {
            return Err(BqError::invalid_input("Location is required"));
        }
        Ok(())
    }

    /// True if a key file is configured.
    pub fn has_key_file(&self) -> bool {
        self.key_file.is_some()
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("project", &self.project)
            .field("location", &self.location)
            .field("key_file", &self.key_file.as_ref().map(|_| "<set>"))
            .field("api_endpoint", &self.api_endpoint)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ok() {
        let settings = ConnectionSettings::new("my-project", "US");
        assert!(settings.validate().is_ok());
        assert!(!settings.has_key_file());
    }

    #[test]
    fn test_validate_rejects_empty_project() {
        let err = ConnectionSettings::new("", "US").validate().unwrap_err();
        assert_eq!(err.to_string(), "Project is required");
    }

    #[test]
    fn test_validate_rejects_blank_location() {
        let err = ConnectionSettings::new("p", "  ").validate().unwrap_err();
        assert_eq!(err.to_string(), "Location is required");
    }

    #[test]
    fn test_debug_hides_key_file_path() {
        let settings =
            ConnectionSettings::new("p", "US").with_key_file("/secrets/service-account.json");
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("service-account.json"));
        assert!(debug.contains("<set>"));
    }
}
