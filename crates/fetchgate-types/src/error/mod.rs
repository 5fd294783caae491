//! Typed error definitions for fetchgate.
//!
//! All errors are serializable (for the admin API and error responses),
//! displayable (for logging) and matchable (for dispatch logic).

mod config;
mod intercept;

pub use config::ConfigError;
pub use intercept::{InterceptError, NETWORK_ERROR_NAME};

/// Standard Result type for interception operations.
pub type Result<T> = std::result::Result<T, InterceptError>;
