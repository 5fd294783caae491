//! Controller WebSocket
//!
//! One connection is one client. Outbound messages that expect an answer get
//! a numbered port; the controller echoes the port on its reply, which is
//! then delivered to the exchange waiting on it. Frames without a port are
//! unsolicited and go to the interceptor's message handler.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use fetchgate_core::proxy::{ChannelPort, Client, Interceptor, PortMessage, ReplyPort};
use fetchgate_types::{ClientId, ClientType, ControllerMessage, Frame};

use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ControllerParams {
    pub client_id: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl ControllerParams {
    fn client_id(&self) -> ClientId {
        match self.client_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => ClientId::from(id),
            None => ClientId::from(uuid::Uuid::new_v4().to_string()),
        }
    }

    fn client_type(&self) -> ClientType {
        self.kind.as_deref().and_then(|k| k.parse().ok()).unwrap_or_default()
    }

    fn url(&self) -> Option<Url> {
        self.url.as_deref().and_then(|u| Url::parse(u).ok())
    }
}

/// Reply ports waiting on this connection.
#[derive(Default)]
pub struct ControllerLink {
    pending: DashMap<String, ReplyPort>,
    next_port: AtomicU64,
}

impl ControllerLink {
    /// Serialize an outbound message, parking its reply port if it has one.
    pub fn encode(&self, msg: PortMessage) -> Option<String> {
        let frame = match msg.reply {
            Some(reply) => {
                // Exchanges that timed out dropped their receiver.
                self.pending.retain(|_, tx| !tx.is_closed());
                let port = self.next_port.fetch_add(1, Ordering::Relaxed).to_string();
                self.pending.insert(port.clone(), reply);
                Frame::on_port(port, msg.message)
            },
            None => Frame::unsolicited(msg.message),
        };

        match serde_json::to_string(&frame) {
            Ok(json) => Some(json),
            Err(e) => {
                warn!("[Controller] Failed to serialize frame: {}", e);
                None
            },
        }
    }

    /// Route one inbound text frame.
    ///
    /// A reply on a pending port always completes that port. If its message
    /// cannot be read it is delivered as `Unknown`, which the exchange treats
    /// as passthrough instead of waiting out its timeout.
    pub fn dispatch(&self, text: &str, client_id: &ClientId, interceptor: &Interceptor) {
        let frame: Frame<serde_json::Value> = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("[Controller] Unparseable frame from {}: {}", client_id, e);
                return;
            },
        };
        let message = serde_json::from_value::<ControllerMessage>(frame.message);

        match frame.port {
            Some(port) => match self.pending.remove(&port) {
                Some((_, reply)) => {
                    let message = message.unwrap_or_else(|e| {
                        warn!("[Controller] Unreadable reply on port {} from {}: {}", port, client_id, e);
                        ControllerMessage::Unknown
                    });
                    if reply.send(message).is_err() {
                        debug!("[Controller] Reply on port {} arrived after its exchange ended", port);
                    }
                },
                None => debug!("[Controller] Reply on unknown port {} from {} dropped", port, client_id),
            },
            None => match message {
                Ok(message) => interceptor.handle_message(client_id, message),
                Err(e) => warn!("[Controller] Unreadable message from {}: {}", client_id, e),
            },
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// WebSocket upgrade handler
pub async fn controller_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<ControllerParams>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params))
}

async fn handle_socket(socket: WebSocket, state: AppState, params: ControllerParams) {
    let client_id = params.client_id();
    let (port, mut outbound_rx) = ChannelPort::new();
    let client = Client::new(client_id.clone(), params.client_type(), params.url(), Arc::new(port));
    state.interceptor().connect_client(client);
    info!("[Controller] {} connected", client_id);

    let link = Arc::new(ControllerLink::default());
    let (mut ws_tx, mut ws_rx) = socket.split();

    let send_link = Arc::clone(&link);
    let send_task = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let Some(json) = send_link.encode(msg) else { continue };
            if ws_tx.send(Message::Text(json)).await.is_err() {
                debug!("[Controller] WebSocket send failed, client disconnected");
                break;
            }
        }
    });

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Text(text)) => link.dispatch(&text, &client_id, state.interceptor()),
            Ok(Message::Close(_)) => {
                debug!("[Controller] {} sent close frame", client_id);
                break;
            },
            Ok(_) => continue,
            Err(e) => {
                warn!("[Controller] WebSocket error from {}: {}", client_id, e);
                break;
            },
        }
    }

    // Dropping the link drops every parked reply port, so outstanding
    // exchanges fail with ClientGone instead of waiting out their timeout.
    send_task.abort();
    state.interceptor().disconnect_client(&client_id);
    info!("[Controller] {} disconnected", client_id);
}
