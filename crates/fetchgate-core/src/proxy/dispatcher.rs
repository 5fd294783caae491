//! Turns a controller verdict (or the lack of one) into the response the
//! caller receives, and reports that response back to the owning session.

use fetchgate_types::error::NETWORK_ERROR_NAME;
use fetchgate_types::{
    InterceptError, InterceptedRequest, MockResponse, NetworkErrorPayload, ProxyMessage,
    ProxyResponse,
};
use std::sync::Arc;

use crate::proxy::clients::Client;
use crate::proxy::registry::SessionRegistry;
use crate::proxy::upstream::Network;

pub struct ResponseDispatcher {
    network: Arc<dyn Network>,
    bypass_header: String,
}

impl ResponseDispatcher {
    pub fn new(network: Arc<dyn Network>, bypass_header: impl Into<String>) -> Self {
        Self { network, bypass_header: bypass_header.into() }
    }

    pub fn network(&self) -> &Arc<dyn Network> {
        &self.network
    }

    /// Fetch from the real network with a duplicate of the captured request.
    /// The duplicate drops the bypass marker so it never reaches the server.
    pub async fn passthrough(
        &self,
        request: &InterceptedRequest,
    ) -> Result<ProxyResponse, InterceptError> {
        let outbound = request.without_header(&self.bypass_header);
        self.network.fetch(outbound).await
    }

    pub fn respond_with_mock(&self, mock: MockResponse) -> ProxyResponse {
        ProxyResponse::from_mock(mock)
    }

    /// Fail the request with the controller-supplied error.
    pub fn fail_with(
        &self,
        request: &InterceptedRequest,
        error: NetworkErrorPayload,
    ) -> InterceptError {
        if error.name == NETWORK_ERROR_NAME {
            tracing::warn!(
                "[Dispatcher] Mock handler for {} {} reported a network error: {}. \
                 This is usually a CORS failure: make sure the mocked resource \
                 answers with the appropriate Access-Control-Allow-* headers.",
                request.method,
                request.url,
                error.message
            );
        } else {
            tracing::warn!(
                "[Dispatcher] Controller failed {} {} with {}: {}",
                request.method,
                request.url,
                error.name,
                error.message
            );
        }
        InterceptError::ControllerNetwork { name: error.name, message: error.message }
    }

    /// Send the `RESPONSE` lifecycle notice if `client` is still active.
    ///
    /// Runs on a detached task over a clone of the response; the caller's copy
    /// is never awaited on or consumed.
    pub fn notify(
        &self,
        registry: &SessionRegistry,
        client: &Client,
        request_id: &str,
        response: &ProxyResponse,
    ) -> bool {
        if !registry.is_active(&client.id) {
            return false;
        }

        let client = client.clone();
        let request_id = request_id.to_string();
        let response = response.clone();
        tokio::spawn(async move {
            let record = response.to_record(&request_id);
            if client.post(ProxyMessage::Response(Box::new(record)), None).is_err() {
                tracing::debug!(
                    "[Dispatcher] Lifecycle notice for {} dropped, {} is gone",
                    request_id,
                    client.id
                );
            }
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::tests::channel_window;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Records what reaches the network.
    #[derive(Default)]
    struct RecordingNetwork {
        seen: Mutex<Vec<InterceptedRequest>>,
    }

    #[async_trait]
    impl Network for RecordingNetwork {
        async fn fetch(
            &self,
            request: InterceptedRequest,
        ) -> Result<ProxyResponse, InterceptError> {
            self.seen.lock().push(request);
            Ok(ProxyResponse::from_mock(MockResponse {
                status: 200,
                status_text: Some("OK".to_string()),
                headers: Default::default(),
                body: Some("net".to_string()),
                ok: None,
            }))
        }
    }

    #[tokio::test]
    async fn test_passthrough_strips_marker_and_keeps_original() {
        let network = Arc::new(RecordingNetwork::default());
        let dispatcher = ResponseDispatcher::new(network.clone(), "x-fetchgate-bypass");
        let request = InterceptedRequest::get("r", "http://localhost/api")
            .with_header("x-fetchgate-bypass", "true")
            .with_header("x-other", "1");

        let response = dispatcher.passthrough(&request).await.unwrap();

        assert_eq!(response.status, 200);
        let seen = network.seen.lock();
        assert!(seen[0].header("x-fetchgate-bypass").is_none());
        assert_eq!(seen[0].header("x-other"), Some("1"));
        assert!(request.header("x-fetchgate-bypass").is_some());
    }

    #[test]
    fn test_fail_with_keeps_name_and_message() {
        let dispatcher =
            ResponseDispatcher::new(Arc::new(RecordingNetwork::default()), "x-fetchgate-bypass");
        let err = dispatcher.fail_with(
            &InterceptedRequest::get("r", "http://localhost/api"),
            NetworkErrorPayload {
                name: "NetworkError".to_string(),
                message: "Failed to fetch".to_string(),
            },
        );
        assert!(err.is_connectivity());
        assert_eq!(err.to_string(), "NetworkError: Failed to fetch");
    }

    #[tokio::test]
    async fn test_notify_only_active_sessions() {
        let dispatcher =
            ResponseDispatcher::new(Arc::new(RecordingNetwork::default()), "x-fetchgate-bypass");
        let registry = SessionRegistry::new();
        let (client, mut rx) = channel_window("a", None);
        let response = ProxyResponse::from_mock(MockResponse {
            status: 404,
            status_text: None,
            headers: Default::default(),
            body: None,
            ok: None,
        });

        assert!(!dispatcher.notify(&registry, &client, "r1", &response));

        registry.activate(&client).unwrap();
        let _ack = rx.recv().await.unwrap();
        assert!(dispatcher.notify(&registry, &client, "r1", &response));

        match rx.recv().await.unwrap().message {
            ProxyMessage::Response(record) => {
                assert_eq!(record.request_id, "r1");
                assert_eq!(record.status, 404);
                assert!(!record.ok);
                assert!(record.body.is_none());
            },
            other => panic!("expected RESPONSE, got {:?}", other),
        }
    }
}
