//! Correlated, timeout-bounded request/reply with a single controller.
//!
//! Every exchange opens its own oneshot reply port, so a reply can only ever
//! answer the message it was posted with. Concurrent exchanges on the same
//! session never see each other's replies.

use dashmap::DashSet;
use fetchgate_types::{
    ClientId, ControllerMessage, ControllerVerdict, InterceptError, InterceptedRequest,
    ProxyMessage, RequestEnvelope,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::proxy::clients::{Client, PortClosed};
use crate::proxy::common::random_id::generate_request_id;
use crate::proxy::lifecycle::integrity_checksum;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    #[error("no reply within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    /// The controller dropped the reply port without answering.
    #[error("reply port dropped")]
    Disconnected,
    /// The message could not be posted at all.
    #[error("client port closed")]
    Closed,
    #[error("unexpected reply {0}")]
    Unexpected(&'static str),
}

impl ExchangeError {
    pub fn into_intercept(self, request_id: &str, client_id: &ClientId) -> InterceptError {
        match self {
            Self::Timeout { timeout_ms } => {
                InterceptError::ExchangeTimeout { request_id: request_id.to_string(), timeout_ms }
            },
            Self::Disconnected | Self::Closed => {
                InterceptError::ClientGone { client_id: client_id.to_string() }
            },
            Self::Unexpected(tag) => InterceptError::InvalidRequest {
                message: format!("controller answered {} with {}", request_id, tag),
            },
        }
    }
}

impl From<PortClosed> for ExchangeError {
    fn from(_: PortClosed) -> Self {
        Self::Closed
    }
}

/// Ids of exchanges that are still waiting on, or acting on, a reply.
#[derive(Debug, Clone, Default)]
pub struct OutstandingIds {
    ids: Arc<DashSet<String>>,
}

impl OutstandingIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a fresh id, regenerating on collision with an outstanding one.
    pub fn reserve(&self) -> OutstandingGuard {
        loop {
            let id = generate_request_id();
            if self.ids.insert(id.clone()) {
                return OutstandingGuard { ids: Arc::clone(&self.ids), id };
            }
            tracing::debug!("[Exchange] Request id {} already outstanding, regenerating", id);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// RAII reservation of a request id. Releases the id on drop, including when
/// the owning future is cancelled.
#[derive(Debug)]
pub struct OutstandingGuard {
    ids: Arc<DashSet<String>>,
    id: String,
}

impl OutstandingGuard {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for OutstandingGuard {
    fn drop(&mut self) {
        self.ids.remove(&self.id);
    }
}

pub struct MessageExchange {
    outstanding: OutstandingIds,
    request_timeout: Duration,
    control_timeout: Duration,
}

impl MessageExchange {
    pub fn new(request_timeout: Duration, control_timeout: Duration) -> Self {
        Self { outstanding: OutstandingIds::new(), request_timeout, control_timeout }
    }

    pub fn outstanding(&self) -> &OutstandingIds {
        &self.outstanding
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Post `message` with a dedicated reply port and wait for the answer.
    pub async fn send(
        &self,
        client: &Client,
        message: ProxyMessage,
        timeout: Duration,
    ) -> Result<ControllerMessage, ExchangeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        client.post(message, Some(reply_tx))?;

        tokio::select! {
            reply = reply_rx => reply.map_err(|_| ExchangeError::Disconnected),
            () = tokio::time::sleep(timeout) => {
                Err(ExchangeError::Timeout { timeout_ms: duration_ms(timeout) })
            },
        }
    }

    /// Forward a captured request and wait for the controller's verdict.
    ///
    /// A timeout fails the request. It is never retried and never passed
    /// through to the network.
    pub async fn request(
        &self,
        client: &Client,
        request: &InterceptedRequest,
    ) -> Result<ControllerVerdict, InterceptError> {
        let envelope = RequestEnvelope::from(request);
        let started = Instant::now();

        match self.send(client, ProxyMessage::Request(Box::new(envelope)), self.request_timeout).await {
            Ok(reply) => {
                tracing::debug!(
                    "[Exchange] {} answered {} with {} in {}ms",
                    client.id,
                    request.id,
                    reply.tag(),
                    started.elapsed().as_millis()
                );
                Ok(ControllerVerdict::from(reply))
            },
            Err(e) => {
                tracing::warn!("[Exchange] Request {} to {} failed: {}", request.id, client.id, e);
                Err(e.into_intercept(&request.id, &client.id))
            },
        }
    }

    /// Round-trip a keepalive probe. Returns the observed latency.
    pub async fn keepalive(&self, client: &Client) -> Result<Duration, ExchangeError> {
        let started = Instant::now();
        match self.send(client, ProxyMessage::KeepaliveRequest, self.control_timeout).await? {
            ControllerMessage::KeepaliveResponse => Ok(started.elapsed()),
            other => Err(ExchangeError::Unexpected(other.tag())),
        }
    }

    /// Ask the controller for the checksum it was built against and compare.
    pub async fn verify_integrity(&self, client: &Client) -> Result<(), InterceptError> {
        let expected = integrity_checksum();
        let reply = self
            .send(client, ProxyMessage::IntegrityCheckRequest, self.control_timeout)
            .await
            .map_err(|e| e.into_intercept("integrity-check", &client.id))?;

        match reply {
            ControllerMessage::IntegrityCheckResponse(actual) if actual == expected => Ok(()),
            ControllerMessage::IntegrityCheckResponse(actual) => {
                tracing::warn!(
                    "[Exchange] Integrity mismatch for {}: expected {}, got {}",
                    client.id,
                    expected,
                    actual
                );
                Err(InterceptError::Integrity { expected: expected.to_string(), actual })
            },
            other => Err(ExchangeError::Unexpected(other.tag()).into_intercept("integrity-check", &client.id)),
        }
    }

    /// Fire-and-forget. No reply port is attached.
    pub fn post(&self, client: &Client, message: ProxyMessage) -> Result<(), PortClosed> {
        client.post(message, None)
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::tests::channel_window;
    use fetchgate_types::{MockResponse, NetworkErrorPayload};

    fn exchange() -> MessageExchange {
        MessageExchange::new(Duration::from_millis(200), Duration::from_millis(100))
    }

    #[tokio::test]
    async fn test_request_receives_verdict_on_dedicated_port() {
        let (client, mut rx) = channel_window("a", None);
        let request = InterceptedRequest::get("req-1", "http://localhost/api");

        tokio::spawn(async move {
            let msg = rx.recv().await.unwrap();
            match msg.message {
                ProxyMessage::Request(envelope) => assert_eq!(envelope.id, "req-1"),
                other => panic!("expected REQUEST, got {:?}", other),
            }
            let mock = MockResponse {
                status: 200,
                status_text: None,
                headers: Default::default(),
                body: Some("ok".to_string()),
                ok: None,
            };
            msg.reply.unwrap().send(ControllerMessage::MockResponse(mock)).unwrap();
        });

        let verdict = exchange().request(&client, &request).await.unwrap();
        assert!(matches!(verdict, ControllerVerdict::MockResponse(m) if m.body.as_deref() == Some("ok")));
    }

    #[tokio::test]
    async fn test_silent_controller_times_out() {
        let (client, _rx) = channel_window("a", None);
        let request = InterceptedRequest::get("req-2", "http://localhost/api");

        let err = exchange().request(&client, &request).await.unwrap_err();
        assert_eq!(
            err,
            InterceptError::ExchangeTimeout { request_id: "req-2".to_string(), timeout_ms: 200 }
        );
    }

    #[tokio::test]
    async fn test_dropped_port_is_client_gone() {
        let (client, mut rx) = channel_window("a", None);
        tokio::spawn(async move {
            let msg = rx.recv().await.unwrap();
            drop(msg.reply);
        });

        let err = exchange()
            .request(&client, &InterceptedRequest::get("r", "http://localhost/"))
            .await
            .unwrap_err();
        assert_eq!(err, InterceptError::ClientGone { client_id: "a".to_string() });
    }

    #[tokio::test]
    async fn test_closed_port_fails_immediately() {
        let (client, rx) = channel_window("a", None);
        drop(rx);
        let result = exchange().send(&client, ProxyMessage::KeepaliveRequest, Duration::from_secs(5)).await;
        assert_eq!(result, Err(ExchangeError::Closed));
    }

    #[tokio::test]
    async fn test_out_of_order_replies_reach_their_own_exchange() {
        let (client, mut rx) = channel_window("a", None);
        let ex = exchange();

        tokio::spawn(async move {
            let first = rx.recv().await.unwrap();
            let second = rx.recv().await.unwrap();
            second.reply.unwrap().send(ControllerMessage::MockNotFound).unwrap();
            first
                .reply
                .unwrap()
                .send(ControllerMessage::NetworkError(NetworkErrorPayload {
                    name: "TypeError".to_string(),
                    message: "boom".to_string(),
                }))
                .unwrap();
        });

        let r1 = InterceptedRequest::get("one", "http://localhost/1");
        let r2 = InterceptedRequest::get("two", "http://localhost/2");
        let (v1, v2) = tokio::join!(ex.request(&client, &r1), ex.request(&client, &r2));

        assert!(matches!(v1.unwrap(), ControllerVerdict::NetworkError(_)));
        assert_eq!(v2.unwrap(), ControllerVerdict::NotFound);
    }

    #[tokio::test]
    async fn test_integrity_mismatch() {
        let (client, mut rx) = channel_window("a", None);
        tokio::spawn(async move {
            let msg = rx.recv().await.unwrap();
            assert_eq!(msg.message, ProxyMessage::IntegrityCheckRequest);
            msg.reply
                .unwrap()
                .send(ControllerMessage::IntegrityCheckResponse("deadbeef".to_string()))
                .unwrap();
        });

        let err = exchange().verify_integrity(&client).await.unwrap_err();
        assert!(matches!(err, InterceptError::Integrity { actual, .. } if actual == "deadbeef"));
    }

    #[tokio::test]
    async fn test_keepalive_round_trip() {
        let (client, mut rx) = channel_window("a", None);
        tokio::spawn(async move {
            let msg = rx.recv().await.unwrap();
            msg.reply.unwrap().send(ControllerMessage::KeepaliveResponse).unwrap();
        });

        assert!(exchange().keepalive(&client).await.is_ok());
    }

    #[test]
    fn test_guard_releases_id_on_drop() {
        let ids = OutstandingIds::new();
        let guard = ids.reserve();
        let id = guard.id().to_string();

        assert!(ids.contains(&id));
        assert_eq!(ids.len(), 1);
        drop(guard);
        assert!(!ids.contains(&id));
        assert!(ids.is_empty());
    }

    #[test]
    fn test_reserved_ids_are_distinct() {
        let ids = OutstandingIds::new();
        let guards: Vec<_> = (0..64).map(|_| ids.reserve()).collect();
        assert_eq!(ids.len(), guards.len());
    }
}
