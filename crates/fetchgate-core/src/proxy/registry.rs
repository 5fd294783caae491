//! Session registry: which clients have opted into interception.
//!
//! A client is open before it is active (its bootstrap code sends
//! `MOCK_ACTIVATE` after the page has loaded), so the registry tracks
//! activation separately from the [`ClientDirectory`].
//!
//! [`ClientDirectory`]: crate::proxy::clients::ClientDirectory

use dashmap::DashSet;
use fetchgate_types::{ClientId, ProxyMessage};

use crate::proxy::clients::{Client, PortClosed};

/// The set of active session ids. No other component mutates it.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    active: DashSet<ClientId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the client active and acknowledge with `MOCKING_ENABLED: true`.
    ///
    /// If the acknowledgment cannot be delivered the client is gone, so the
    /// activation is rolled back.
    pub fn activate(&self, client: &Client) -> Result<(), PortClosed> {
        self.active.insert(client.id.clone());
        if let Err(e) = client.post(ProxyMessage::MockingEnabled(true), None) {
            self.active.remove(&client.id);
            tracing::warn!("[Registry] Activation ack for {} undeliverable", client.id);
            return Err(e);
        }
        tracing::info!("[Registry] Session {} activated ({} active)", client.id, self.active.len());
        Ok(())
    }

    /// Opt the client out. Returns whether it was active.
    pub fn deactivate(&self, id: &ClientId) -> bool {
        let removed = self.active.remove(id).is_some();
        if removed {
            tracing::info!("[Registry] Session {} deactivated", id);
        }
        removed
    }

    /// Forget a closing client. The caller decides on self-unregistration.
    pub fn close(&self, id: &ClientId) -> bool {
        let removed = self.active.remove(id).is_some();
        tracing::debug!("[Registry] Session {} closed (was_active={})", id, removed);
        removed
    }

    pub fn is_active(&self, id: &ClientId) -> bool {
        self.active.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Sorted snapshot of active ids.
    pub fn snapshot(&self) -> Vec<ClientId> {
        let mut ids: Vec<_> = self.active.iter().map(|id| id.key().clone()).collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::clients::ChannelPort;
    use fetchgate_types::ClientType;
    use std::sync::Arc;

    fn client(id: &str) -> (Client, tokio::sync::mpsc::UnboundedReceiver<crate::proxy::clients::PortMessage>) {
        let (port, rx) = ChannelPort::new();
        (Client::new(ClientId::from(id), ClientType::Window, None, Arc::new(port)), rx)
    }

    #[test]
    fn test_activate_acknowledges() {
        let registry = SessionRegistry::new();
        let (a, mut rx) = client("a");

        registry.activate(&a).unwrap();

        assert!(registry.is_active(&a.id));
        let ack = rx.try_recv().unwrap();
        assert_eq!(ack.message, ProxyMessage::MockingEnabled(true));
        assert!(ack.reply.is_none());
    }

    #[test]
    fn test_active_iff_activated_and_not_deactivated_or_closed() {
        let registry = SessionRegistry::new();
        let (a, _rx_a) = client("a");
        let (b, _rx_b) = client("b");

        assert!(!registry.is_active(&a.id));
        registry.activate(&a).unwrap();
        registry.activate(&b).unwrap();
        assert_eq!(registry.len(), 2);

        assert!(registry.deactivate(&a.id));
        assert!(!registry.is_active(&a.id));
        assert!(!registry.deactivate(&a.id));

        assert!(registry.close(&b.id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_activation_rolled_back_when_ack_fails() {
        let registry = SessionRegistry::new();
        let (a, rx) = client("a");
        drop(rx);

        assert!(registry.activate(&a).is_err());
        assert!(!registry.is_active(&a.id));
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let registry = SessionRegistry::new();
        let (b, _rx_b) = client("b");
        let (a, _rx_a) = client("a");
        registry.activate(&b).unwrap();
        registry.activate(&a).unwrap();

        assert_eq!(registry.snapshot(), vec![ClientId::from("a"), ClientId::from("b")]);
    }
}
