//! Errors surfaced to the caller of an intercepted request.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name a controller uses to report a connectivity-class failure.
pub const NETWORK_ERROR_NAME: &str = "NetworkError";

/// Terminal failure of a single intercepted request.
///
/// Failures are local to one request: none of these variants touch the
/// session registry or other in-flight exchanges.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum InterceptError {
    /// The owning controller did not reply within the exchange window.
    #[error("Controller did not answer request {request_id} within {timeout_ms}ms")]
    ExchangeTimeout { request_id: String, timeout_ms: u64 },

    /// The controller explicitly answered with a network error.
    #[error("{name}: {message}")]
    ControllerNetwork { name: String, message: String },

    /// The real network call failed (DNS, connect, TLS, redirect policy).
    #[error("Upstream request failed: {message}")]
    Upstream { message: String },

    /// The controller went away while an exchange was outstanding.
    #[error("Client {client_id} disconnected")]
    ClientGone { client_id: String },

    /// The request could not be captured (bad URL, unsupported method).
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// A controller answered an integrity probe with a different checksum.
    #[error("Integrity check failed: expected {expected}, got {actual}")]
    Integrity { expected: String, actual: String },

    /// The request already passed through this proxy once.
    #[error("Request to {url} looped back into the proxy")]
    LoopDetected { url: String },
}

impl InterceptError {
    /// Whether this failure belongs to the connectivity class that callers may
    /// special-case (e.g. to surface CORS guidance).
    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::ControllerNetwork { name, .. } => name == NETWORK_ERROR_NAME,
            Self::Upstream { .. } => true,
            _ => false,
        }
    }

    /// HTTP status used when the failure is rendered as an HTTP response.
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::ExchangeTimeout { .. } => 504,
            Self::ControllerNetwork { .. } | Self::Upstream { .. } => 502,
            Self::ClientGone { .. } => 503,
            Self::InvalidRequest { .. } => 400,
            Self::Integrity { .. } => 500,
            Self::LoopDetected { .. } => 508,
        }
    }
}
