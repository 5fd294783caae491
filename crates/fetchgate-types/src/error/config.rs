//! Configuration errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading, validating or saving configuration.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum ConfigError {
    /// Configuration file could not be read or written.
    #[error("Config I/O error at {path}: {message}")]
    Io { path: String, message: String },

    /// Configuration file is not valid JSON for the expected schema.
    #[error("Failed to parse config: {message}")]
    Parse { message: String },

    /// A field is out of its allowed range.
    #[error("Invalid config value for {field}: {message}")]
    Invalid { field: String, message: String },

    /// No usable data directory could be determined.
    #[error("Data directory unavailable: {message}")]
    DataDir { message: String },
}

impl From<validator::ValidationErrors> for ConfigError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        match fields.first() {
            Some((field, errs)) => Self::Invalid {
                field: field.to_string(),
                message: errs
                    .iter()
                    .map(|e| e.code.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            },
            None => Self::Invalid { field: "config".to_string(), message: errors.to_string() },
        }
    }
}
