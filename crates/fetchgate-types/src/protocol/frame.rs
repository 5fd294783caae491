//! Transport framing for message-oriented links (WebSocket).

use serde::{Deserialize, Serialize};

/// A message plus the reply port it belongs to.
///
/// Outbound frames that expect an answer carry a fresh `port`; the
/// controller echoes it on the reply. Frames without a port (or with a port
/// nobody waits on) are unsolicited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame<M> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(flatten)]
    pub message: M,
}

impl<M> Frame<M> {
    pub fn unsolicited(message: M) -> Self {
        Self { port: None, message }
    }

    pub fn on_port(port: impl Into<String>, message: M) -> Self {
        Self { port: Some(port.into()), message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ControllerMessage, ProxyMessage};

    #[test]
    fn test_reply_frame_parses_port() {
        let frame: Frame<ControllerMessage> =
            serde_json::from_str(r#"{"port":"7","type":"MOCK_NOT_FOUND"}"#).unwrap();
        assert_eq!(frame.port.as_deref(), Some("7"));
        assert_eq!(frame.message, ControllerMessage::MockNotFound);
    }

    #[test]
    fn test_unsolicited_frame_omits_port() {
        let json = serde_json::to_value(Frame::unsolicited(ProxyMessage::KeepaliveResponse)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "KEEPALIVE_RESPONSE"}));
    }
}
