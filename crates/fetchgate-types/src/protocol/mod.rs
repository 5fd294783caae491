//! Messages exchanged between the proxy and controller sessions.
//!
//! Every message is adjacently tagged: `{"type": "MOCK_ACTIVATE"}` or
//! `{"type": "MOCK_RESPONSE", "payload": {...}}`. Direction-specific enums
//! keep dispatch an exhaustive `match` on both ends.

mod envelope;
mod frame;

pub use envelope::RequestEnvelope;
pub use frame::Frame;

use serde::{Deserialize, Serialize};

use crate::models::{MockResponse, NetworkErrorPayload, ResponseRecord};

/// Bumped whenever the message contract changes; feeds the integrity checksum.
pub const PROTOCOL_REVISION: u32 = 2;

/// Controller → proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControllerMessage {
    KeepaliveRequest,
    KeepaliveResponse,
    IntegrityCheckRequest,
    IntegrityCheckResponse(String),
    MockActivate,
    MockDeactivate,
    ClientClosed,
    MockResponse(MockResponse),
    MockNotFound,
    NetworkError(NetworkErrorPayload),
    /// A tag this build does not know, or a reply whose payload did not parse.
    #[serde(other)]
    Unknown,
}

impl ControllerMessage {
    /// Wire tag, for logging.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::KeepaliveRequest => "KEEPALIVE_REQUEST",
            Self::KeepaliveResponse => "KEEPALIVE_RESPONSE",
            Self::IntegrityCheckRequest => "INTEGRITY_CHECK_REQUEST",
            Self::IntegrityCheckResponse(_) => "INTEGRITY_CHECK_RESPONSE",
            Self::MockActivate => "MOCK_ACTIVATE",
            Self::MockDeactivate => "MOCK_DEACTIVATE",
            Self::ClientClosed => "CLIENT_CLOSED",
            Self::MockResponse(_) => "MOCK_RESPONSE",
            Self::MockNotFound => "MOCK_NOT_FOUND",
            Self::NetworkError(_) => "NETWORK_ERROR",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Proxy → controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProxyMessage {
    KeepaliveRequest,
    KeepaliveResponse,
    IntegrityCheckRequest,
    IntegrityCheckResponse(String),
    MockingEnabled(bool),
    Request(Box<RequestEnvelope>),
    Response(Box<ResponseRecord>),
}

/// A controller's answer to a `REQUEST` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerVerdict {
    MockResponse(MockResponse),
    NotFound,
    NetworkError(NetworkErrorPayload),
    /// Any other message arrived on the reply port; treated as passthrough.
    Unrecognized(&'static str),
}

impl From<ControllerMessage> for ControllerVerdict {
    fn from(message: ControllerMessage) -> Self {
        match message {
            ControllerMessage::MockResponse(mock) => Self::MockResponse(mock),
            ControllerMessage::MockNotFound => Self::NotFound,
            ControllerMessage::NetworkError(err) => Self::NetworkError(err),
            other @ (ControllerMessage::KeepaliveRequest
            | ControllerMessage::KeepaliveResponse
            | ControllerMessage::IntegrityCheckRequest
            | ControllerMessage::IntegrityCheckResponse(_)
            | ControllerMessage::MockActivate
            | ControllerMessage::MockDeactivate
            | ControllerMessage::ClientClosed
            | ControllerMessage::Unknown) => Self::Unrecognized(other.tag()),
        }
    }
}
