//! Shared fixtures for engine unit tests.

use fetchgate_types::{ClientId, ClientType, ProxyMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

use crate::proxy::clients::{ChannelPort, Client, ClientPort, PortClosed, PortMessage, ReplyPort};

/// Port that accepts and discards everything.
pub(crate) struct SinkPort;

impl ClientPort for SinkPort {
    fn post(&self, _message: ProxyMessage, _reply: Option<ReplyPort>) -> Result<(), PortClosed> {
        Ok(())
    }
}

pub(crate) fn sink_window(id: &str, url: Option<&str>) -> Client {
    let url = url.map(|u| Url::parse(u).expect("test url"));
    Client::new(ClientId::from(id), ClientType::Window, url, Arc::new(SinkPort))
}

pub(crate) fn channel_window(
    id: &str,
    url: Option<&str>,
) -> (Client, mpsc::UnboundedReceiver<PortMessage>) {
    let (port, rx) = ChannelPort::new();
    let url = url.map(|u| Url::parse(u).expect("test url"));
    (Client::new(ClientId::from(id), ClientType::Window, url, Arc::new(port)), rx)
}
