//! Unified error types for fetchgate Core.

use fetchgate_types::ConfigError;
use serde::Serialize;
use thiserror::Error;

/// Error type for engine-level operations (startup, configuration, I/O).
///
/// Per-request failures use [`fetchgate_types::InterceptError`] instead.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    /// Network client could not be built or a request failed.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// File system I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Install or activation failed; the proxy never becomes active.
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

/// Result type alias for engine operations.
pub type AppResult<T> = Result<T, AppError>;
