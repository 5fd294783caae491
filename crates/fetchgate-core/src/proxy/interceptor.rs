//! Wires lifecycle, registry, classification, routing and dispatch into the
//! two event handlers the host drives: controller messages and fetches.

use fetchgate_types::{
    ClientId, ConfigError, ControllerMessage, ControllerVerdict, InterceptError,
    InterceptedRequest, ProxyConfig, ProxyMessage, ProxyResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::error::AppResult;
use crate::proxy::classifier::{Decision, RequestClassifier};
use crate::proxy::clients::{Client, ClientDirectory};
use crate::proxy::dispatcher::ResponseDispatcher;
use crate::proxy::exchange::MessageExchange;
use crate::proxy::lifecycle::{integrity_checksum, Lifecycle, LifecycleState};
use crate::proxy::registry::SessionRegistry;
use crate::proxy::resolver::SessionResolver;
use crate::proxy::upstream::{Network, UpstreamClient};

/// One captured request plus the id of the client that issued it, if known.
#[derive(Debug, Clone)]
pub struct FetchEvent {
    pub request: InterceptedRequest,
    pub client_id: Option<ClientId>,
}

impl FetchEvent {
    pub fn new(request: InterceptedRequest, client_id: Option<ClientId>) -> Self {
        Self { request, client_id }
    }
}

#[derive(Debug)]
pub enum FetchOutcome {
    /// Not ours to handle. The host forwards the request untouched.
    Native(InterceptedRequest),
    Responded(Result<ProxyResponse, InterceptError>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterceptorStatus {
    pub state: LifecycleState,
    pub scope: String,
    pub active_sessions: Vec<ClientId>,
    pub open_clients: usize,
    pub in_flight: usize,
    pub checksum: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionCheck {
    pub client_id: ClientId,
    pub active: bool,
    pub latency_ms: u64,
}

pub struct InterceptorBuilder {
    scope: Url,
    request_timeout: Duration,
    control_timeout: Duration,
    upstream_timeout_secs: u64,
    bypass_header: String,
    network: Option<Arc<dyn Network>>,
}

impl InterceptorBuilder {
    pub fn new(scope: Url) -> Self {
        let defaults = ProxyConfig::default();
        Self {
            scope,
            request_timeout: Duration::from_millis(defaults.request_timeout_ms),
            control_timeout: Duration::from_millis(defaults.control_timeout_ms),
            upstream_timeout_secs: defaults.upstream_timeout_secs,
            bypass_header: defaults.bypass_header,
            network: None,
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Result<Self, ConfigError> {
        let scope = Url::parse(&config.scope).map_err(|e| ConfigError::Invalid {
            field: "scope".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::new(scope)
            .request_timeout(Duration::from_millis(config.request_timeout_ms))
            .control_timeout(Duration::from_millis(config.control_timeout_ms))
            .upstream_timeout_secs(config.upstream_timeout_secs)
            .bypass_header(config.bypass_header.clone()))
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn control_timeout(mut self, timeout: Duration) -> Self {
        self.control_timeout = timeout;
        self
    }

    pub fn upstream_timeout_secs(mut self, secs: u64) -> Self {
        self.upstream_timeout_secs = secs;
        self
    }

    pub fn bypass_header(mut self, name: impl Into<String>) -> Self {
        self.bypass_header = name.into();
        self
    }

    /// Replace the real network, e.g. with a recording stub.
    pub fn network(mut self, network: Arc<dyn Network>) -> Self {
        self.network = Some(network);
        self
    }

    pub fn build(self) -> AppResult<Interceptor> {
        let network: Arc<dyn Network> = match self.network {
            Some(network) => network,
            None => Arc::new(UpstreamClient::new(self.upstream_timeout_secs)?),
        };
        let classifier = RequestClassifier::new(self.bypass_header);
        let dispatcher = ResponseDispatcher::new(network, classifier.bypass_header());

        Ok(Interceptor {
            lifecycle: Lifecycle::new(self.scope.clone()),
            directory: ClientDirectory::new(),
            registry: SessionRegistry::new(),
            resolver: SessionResolver::new(self.scope),
            exchange: MessageExchange::new(self.request_timeout, self.control_timeout),
            classifier,
            dispatcher,
        })
    }
}

pub struct Interceptor {
    lifecycle: Lifecycle,
    directory: ClientDirectory,
    registry: SessionRegistry,
    classifier: RequestClassifier,
    resolver: SessionResolver,
    exchange: MessageExchange,
    dispatcher: ResponseDispatcher,
}

impl Interceptor {
    pub fn builder(scope: Url) -> InterceptorBuilder {
        InterceptorBuilder::new(scope)
    }

    /// Install and activate. Either failing is fatal for the host.
    pub fn start(&self) -> AppResult<usize> {
        self.lifecycle.install()?;
        self.lifecycle.activate(&self.directory)
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn directory(&self) -> &ClientDirectory {
        &self.directory
    }

    // ------------------------------------------------------------------
    // Clients
    // ------------------------------------------------------------------

    /// A client opened. Once activated, new clients are controlled right away.
    pub fn connect_client(&self, mut client: Client) {
        client.controlled = self.lifecycle.state() == LifecycleState::Activated;
        tracing::debug!("[Interceptor] Client {} connected ({:?})", client.id, client.kind);
        self.directory.connect(client);
    }

    /// The client's connection went away. Its session is destroyed, but this
    /// alone never unregisters the proxy.
    pub fn disconnect_client(&self, id: &ClientId) {
        self.directory.disconnect(id);
        self.registry.close(id);
        tracing::debug!("[Interceptor] Client {} disconnected", id);
    }

    pub fn navigate_client(&self, id: &ClientId, url: Url) -> bool {
        self.directory.navigate(id, url)
    }

    // ------------------------------------------------------------------
    // Message event
    // ------------------------------------------------------------------

    /// Handle an unsolicited message from a client.
    pub fn handle_message(&self, client_id: &ClientId, message: ControllerMessage) {
        let Some(client) = self.directory.get(client_id) else {
            tracing::debug!("[Interceptor] {} from unknown client {} ignored", message.tag(), client_id);
            return;
        };

        match message {
            ControllerMessage::KeepaliveRequest => {
                self.reply(&client, ProxyMessage::KeepaliveResponse);
            },
            ControllerMessage::IntegrityCheckRequest => {
                self.reply(
                    &client,
                    ProxyMessage::IntegrityCheckResponse(integrity_checksum().to_string()),
                );
            },
            ControllerMessage::MockActivate => {
                // Opting in after the last window closed re-registers first.
                if !self.lifecycle.is_registered() {
                    if let Err(e) = self.lifecycle.reinstate(&self.directory) {
                        tracing::warn!("[Interceptor] Activation from {} refused: {}", client_id, e);
                        return;
                    }
                }
                // Activation acknowledges itself; a failed ack means the client is gone.
                let _ = self.registry.activate(&client);
            },
            ControllerMessage::MockDeactivate => {
                self.registry.deactivate(client_id);
            },
            ControllerMessage::ClientClosed => {
                self.registry.close(client_id);
                self.lifecycle.on_client_closed(&self.directory, client_id);
            },
            ControllerMessage::Unknown => {
                tracing::debug!("[Interceptor] Unrecognized message from {} ignored", client_id);
            },
            reply @ (ControllerMessage::KeepaliveResponse
            | ControllerMessage::IntegrityCheckResponse(_)
            | ControllerMessage::MockResponse(_)
            | ControllerMessage::MockNotFound
            | ControllerMessage::NetworkError(_)) => {
                tracing::debug!(
                    "[Interceptor] {} from {} has no pending exchange, dropped",
                    reply.tag(),
                    client_id
                );
            },
        }
    }

    fn reply(&self, client: &Client, message: ProxyMessage) {
        if self.exchange.post(client, message).is_err() {
            tracing::debug!("[Interceptor] Reply to {} undeliverable", client.id);
        }
    }

    // ------------------------------------------------------------------
    // Fetch event
    // ------------------------------------------------------------------

    pub async fn handle_fetch(&self, event: FetchEvent) -> FetchOutcome {
        let FetchEvent { mut request, client_id } = event;

        if !self.lifecycle.is_registered() {
            tracing::debug!("[Interceptor] Unregistered, bypassing {}", request.url);
            return FetchOutcome::Native(request);
        }

        let classification = self.classifier.classify(&request, &self.registry, || {
            self.resolver.resolve(&request, client_id.as_ref(), &self.directory, &self.registry)
        });

        if let Decision::Bypass(reason) = classification.decision {
            tracing::debug!("[Interceptor] {} {} bypassed: {:?}", request.method, request.url, reason);
            return FetchOutcome::Native(request);
        }

        let guard = self.exchange.outstanding().reserve();
        request.id = guard.id().to_string();

        let result = match (classification.decision, classification.owner) {
            (Decision::Route, Some(owner)) => {
                tracing::debug!("[Interceptor] {} {} routed to {}", request.method, request.url, owner.id);
                self.route(&request, &owner).await
            },
            (decision, owner) => {
                tracing::debug!("[Interceptor] {} {}: {}", request.method, request.url, decision);
                let response = self.dispatcher.passthrough(&request).await;
                if let (Ok(response), Some(owner)) = (&response, &owner) {
                    self.dispatcher.notify(&self.registry, owner, &request.id, response);
                }
                response
            },
        };

        drop(guard);
        FetchOutcome::Responded(result)
    }

    async fn route(
        &self,
        request: &InterceptedRequest,
        owner: &Client,
    ) -> Result<ProxyResponse, InterceptError> {
        let response = match self.exchange.request(owner, request).await? {
            ControllerVerdict::MockResponse(mock) => self.dispatcher.respond_with_mock(mock),
            ControllerVerdict::NotFound => self.dispatcher.passthrough(request).await?,
            ControllerVerdict::Unrecognized(tag) => {
                tracing::debug!("[Interceptor] Reply {} to {} treated as passthrough", tag, request.id);
                self.dispatcher.passthrough(request).await?
            },
            ControllerVerdict::NetworkError(error) => {
                return Err(self.dispatcher.fail_with(request, error));
            },
        };

        self.dispatcher.notify(&self.registry, owner, &request.id, &response);
        Ok(response)
    }

    /// Like [`handle_fetch`](Self::handle_fetch), but also performs a native
    /// bypass on the network so the caller always gets a response.
    pub async fn fetch(&self, event: FetchEvent) -> Result<ProxyResponse, InterceptError> {
        match self.handle_fetch(event).await {
            FetchOutcome::Native(request) => self.dispatcher.network().fetch(request).await,
            FetchOutcome::Responded(result) => result,
        }
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Probe a client: keepalive round trip, then integrity.
    pub async fn check_session(&self, id: &ClientId) -> Result<SessionCheck, InterceptError> {
        let client = self
            .directory
            .get(id)
            .ok_or_else(|| InterceptError::ClientGone { client_id: id.to_string() })?;

        let latency = self
            .exchange
            .keepalive(&client)
            .await
            .map_err(|e| e.into_intercept("keepalive", &client.id))?;
        self.exchange.verify_integrity(&client).await?;

        Ok(SessionCheck {
            client_id: client.id.clone(),
            active: self.registry.is_active(&client.id),
            latency_ms: u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
        })
    }

    pub fn status(&self) -> InterceptorStatus {
        InterceptorStatus {
            state: self.lifecycle.state(),
            scope: self.lifecycle.scope().to_string(),
            active_sessions: self.registry.snapshot(),
            open_clients: self.directory.len(),
            in_flight: self.exchange.outstanding().len(),
            checksum: integrity_checksum().to_string(),
        }
    }
}
