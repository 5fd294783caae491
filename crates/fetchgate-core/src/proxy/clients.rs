//! Open clients and the ports used to message them.
//!
//! A client is open from the moment it connects, whether or not it has opted
//! into interception; that opt-in lives in the [`SessionRegistry`].
//!
//! [`SessionRegistry`]: crate::proxy::registry::SessionRegistry

use fetchgate_types::{ClientId, ClientType, ControllerMessage, ProxyMessage};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use url::Url;

/// Dedicated reply channel for a single exchange.
pub type ReplyPort = oneshot::Sender<ControllerMessage>;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("client port is closed")]
pub struct PortClosed;

/// Something that can deliver proxy messages to a client.
pub trait ClientPort: Send + Sync {
    /// Post a message, optionally with a reply port the client answers on.
    fn post(&self, message: ProxyMessage, reply: Option<ReplyPort>) -> Result<(), PortClosed>;
}

/// A message queued on a [`ChannelPort`].
#[derive(Debug)]
pub struct PortMessage {
    pub message: ProxyMessage,
    pub reply: Option<ReplyPort>,
}

/// [`ClientPort`] backed by an unbounded tokio channel. The receiving half is
/// driven by the transport (a WebSocket task, or a scripted controller in tests).
#[derive(Clone)]
pub struct ChannelPort {
    tx: mpsc::UnboundedSender<PortMessage>,
}

impl ChannelPort {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PortMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ClientPort for ChannelPort {
    fn post(&self, message: ProxyMessage, reply: Option<ReplyPort>) -> Result<(), PortClosed> {
        self.tx.send(PortMessage { message, reply }).map_err(|_| PortClosed)
    }
}

/// Snapshot of one open client.
#[derive(Clone)]
pub struct Client {
    pub id: ClientId,
    pub kind: ClientType,
    /// Last-known document URL; `None` before the client has navigated.
    pub url: Option<Url>,
    pub controlled: bool,
    port: Arc<dyn ClientPort>,
}

impl Client {
    pub fn new(id: ClientId, kind: ClientType, url: Option<Url>, port: Arc<dyn ClientPort>) -> Self {
        Self { id, kind, url, controlled: false, port }
    }

    pub fn post(&self, message: ProxyMessage, reply: Option<ReplyPort>) -> Result<(), PortClosed> {
        self.port.post(message, reply)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("url", &self.url.as_ref().map(Url::as_str))
            .field("controlled", &self.controlled)
            .finish()
    }
}

/// All currently open clients, in connection order.
#[derive(Default)]
pub struct ClientDirectory {
    clients: RwLock<Vec<Client>>,
}

impl ClientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an open client. Reconnecting with a known id replaces the old entry
    /// but keeps its position.
    pub fn connect(&self, client: Client) {
        let mut clients = self.clients.write();
        if let Some(existing) = clients.iter_mut().find(|c| c.id == client.id) {
            *existing = client;
        } else {
            clients.push(client);
        }
    }

    pub fn disconnect(&self, id: &ClientId) -> Option<Client> {
        let mut clients = self.clients.write();
        let pos = clients.iter().position(|c| &c.id == id)?;
        Some(clients.remove(pos))
    }

    pub fn get(&self, id: &ClientId) -> Option<Client> {
        self.clients.read().iter().find(|c| &c.id == id).cloned()
    }

    /// Open clients of the given type, in connection order.
    pub fn match_all(&self, kind: ClientType) -> Vec<Client> {
        self.clients.read().iter().filter(|c| c.kind == kind).cloned().collect()
    }

    pub fn count(&self, kind: ClientType) -> usize {
        self.clients.read().iter().filter(|c| c.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }

    /// Record the client's current document URL. Returns false for unknown ids.
    pub fn navigate(&self, id: &ClientId, url: Url) -> bool {
        match self.clients.write().iter_mut().find(|c| &c.id == id) {
            Some(client) => {
                client.url = Some(url);
                true
            },
            None => false,
        }
    }

    /// Take control of every open client. Returns how many were newly claimed.
    pub fn claim(&self) -> usize {
        let mut claimed = 0;
        for client in self.clients.write().iter_mut().filter(|c| !c.controlled) {
            client.controlled = true;
            claimed += 1;
        }
        claimed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(id: &str, kind: ClientType) -> Client {
        let (port, _rx) = ChannelPort::new();
        Client::new(ClientId::from(id), kind, None, Arc::new(port))
    }

    #[test]
    fn test_match_all_keeps_connection_order() {
        let dir = ClientDirectory::new();
        dir.connect(client("b", ClientType::Window));
        dir.connect(client("w", ClientType::Worker));
        dir.connect(client("a", ClientType::Window));

        let ids: Vec<_> =
            dir.match_all(ClientType::Window).into_iter().map(|c| c.id.to_string()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(dir.count(ClientType::Worker), 1);
    }

    #[test]
    fn test_reconnect_replaces_in_place() {
        let dir = ClientDirectory::new();
        dir.connect(client("a", ClientType::Window));
        dir.connect(client("b", ClientType::Window));
        dir.connect(client("a", ClientType::Window));

        assert_eq!(dir.len(), 2);
        assert_eq!(dir.match_all(ClientType::Window)[0].id.as_str(), "a");
    }

    #[test]
    fn test_claim_and_navigate() {
        let dir = ClientDirectory::new();
        dir.connect(client("a", ClientType::Window));
        dir.connect(client("b", ClientType::Window));

        assert_eq!(dir.claim(), 2);
        assert_eq!(dir.claim(), 0);

        let url = Url::parse("http://localhost:3000/app/").unwrap();
        assert!(dir.navigate(&ClientId::from("a"), url.clone()));
        assert!(!dir.navigate(&ClientId::from("zzz"), url));
        assert!(dir.get(&ClientId::from("a")).unwrap().url.is_some());
    }

    #[test]
    fn test_post_after_receiver_dropped_fails() {
        let (port, rx) = ChannelPort::new();
        drop(rx);
        assert_eq!(port.post(ProxyMessage::KeepaliveResponse, None), Err(PortClosed));
    }
}
