//! Proxy lifecycle: install, activate (claiming open clients), self-unregister.

use fetchgate_types::protocol::PROTOCOL_REVISION;
use fetchgate_types::{ClientId, ClientType};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use tokio::sync::watch;
use url::Url;

use crate::error::{AppError, AppResult};
use crate::proxy::clients::ClientDirectory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Unregistered. The instance keeps serving (bypassing everything) until
    /// the host restarts it.
    Redundant,
}

/// Checksum controllers compare against to detect a mismatched proxy build.
pub fn integrity_checksum() -> &'static str {
    static CHECKSUM: OnceLock<String> = OnceLock::new();
    CHECKSUM.get_or_init(|| {
        let mut hasher = Sha256::new();
        hasher.update(env!("CARGO_PKG_VERSION").as_bytes());
        hasher.update(PROTOCOL_REVISION.to_be_bytes());
        let digest = format!("{:x}", hasher.finalize());
        digest[..32].to_string()
    })
}

pub struct Lifecycle {
    scope: Url,
    state: watch::Sender<LifecycleState>,
}

impl Lifecycle {
    pub fn new(scope: Url) -> Self {
        let (state, _) = watch::channel(LifecycleState::Parsed);
        Self { scope, state }
    }

    pub fn scope(&self) -> &Url {
        &self.scope
    }

    /// Path prefix of the registration scope (e.g. `/app/`).
    pub fn scope_path(&self) -> &str {
        self.scope.path()
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub fn is_registered(&self) -> bool {
        self.state() != LifecycleState::Redundant
    }

    /// Install, skipping the wait for idle clients so new interception logic
    /// applies without a reload.
    pub fn install(&self) -> AppResult<()> {
        self.transition(LifecycleState::Parsed, LifecycleState::Installing)?;
        tracing::debug!("[Lifecycle] skipWaiting requested");
        self.transition(LifecycleState::Installing, LifecycleState::Installed)
    }

    /// Activate and claim every open client, including ones that connected
    /// before this instance existed. Returns the number of clients claimed.
    pub fn activate(&self, directory: &ClientDirectory) -> AppResult<usize> {
        self.transition(LifecycleState::Installed, LifecycleState::Activating)?;
        let claimed = directory.claim();
        self.transition(LifecycleState::Activating, LifecycleState::Activated)?;
        tracing::info!(
            "[Lifecycle] Activated for scope {} (claimed {} clients)",
            self.scope,
            claimed
        );
        Ok(claimed)
    }

    /// Drop the registration. Returns false if already unregistered.
    pub fn unregister(&self) -> bool {
        let previous = self.state.send_replace(LifecycleState::Redundant);
        if previous == LifecycleState::Redundant {
            return false;
        }
        tracing::info!("[Lifecycle] Unregistered from scope {}", self.scope);
        true
    }

    /// Register again after self-unregistering: install and activate from
    /// scratch, claiming whatever clients are open now.
    pub fn reinstate(&self, directory: &ClientDirectory) -> AppResult<usize> {
        if self.is_registered() {
            return Err(AppError::Lifecycle("already registered".to_string()));
        }
        self.state.send_replace(LifecycleState::Parsed);
        tracing::info!("[Lifecycle] Re-registering for scope {}", self.scope);
        self.install()?;
        self.activate(directory)
    }

    /// Called after a client reported `CLIENT_CLOSED`. Unregisters when no other
    /// window remains open. Returns whether unregistration happened.
    pub fn on_client_closed(&self, directory: &ClientDirectory, closing: &ClientId) -> bool {
        let remaining = directory
            .match_all(ClientType::Window)
            .into_iter()
            .filter(|c| &c.id != closing)
            .count();

        if remaining == 0 {
            self.unregister()
        } else {
            tracing::debug!("[Lifecycle] {} window(s) still open after {} closed", remaining, closing);
            false
        }
    }

    fn transition(&self, from: LifecycleState, to: LifecycleState) -> AppResult<()> {
        let current = self.state();
        if current != from {
            return Err(AppError::Lifecycle(format!(
                "cannot move to {:?} from {:?} (expected {:?})",
                to, current, from
            )));
        }
        self.state.send_replace(to);
        Ok(())
    }
}
