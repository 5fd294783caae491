//! In-process controllers for driving the interceptor end to end.

#![allow(dead_code)]

use fetchgate_core::proxy::{ChannelPort, Client, Interceptor, PortMessage};
use fetchgate_types::{ClientId, ClientType, ControllerMessage, ProxyMessage, RequestEnvelope};
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

/// Answers every `REQUEST` with whatever `script` returns. `None` leaves the
/// exchange unanswered. All non-reply traffic is forwarded to `observed`.
pub struct ScriptedController {
    pub id: ClientId,
    pub observed: mpsc::UnboundedReceiver<ProxyMessage>,
}

impl ScriptedController {
    pub async fn connect<F>(interceptor: &Interceptor, id: &str, url: &str, script: F) -> Self
    where
        F: Fn(&RequestEnvelope) -> Option<ControllerMessage> + Send + 'static,
    {
        let (port, mut rx) = ChannelPort::new();
        let (observed_tx, observed) = mpsc::unbounded_channel();
        let client = Client::new(
            ClientId::from(id),
            ClientType::Window,
            Some(Url::parse(url).expect("controller url")),
            Arc::new(port),
        );
        interceptor.connect_client(client);

        tokio::spawn(async move {
            // Replies held back by the script stay alive until the task ends.
            let mut parked = Vec::new();
            while let Some(PortMessage { message, reply }) = rx.recv().await {
                match (message, reply) {
                    (ProxyMessage::Request(envelope), Some(reply)) => match script(&*envelope) {
                        Some(answer) => {
                            let _ = reply.send(answer);
                        },
                        None => parked.push(reply),
                    },
                    (message, _) => {
                        let _ = observed_tx.send(message);
                    },
                }
            }
        });

        Self { id: ClientId::from(id), observed }
    }

    /// Opt in and wait for the acknowledgment.
    pub async fn activate(&mut self, interceptor: &Interceptor) {
        interceptor.handle_message(&self.id, ControllerMessage::MockActivate);
        let ack = self.observed.recv().await.expect("activation ack");
        assert_eq!(ack, ProxyMessage::MockingEnabled(true));
    }
}
