//! Per-request decision: bypass, passthrough, or route to a controller.

use fetchgate_types::{CacheMode, InterceptedRequest, RequestMode};
use std::fmt;

use crate::proxy::clients::Client;
use crate::proxy::registry::SessionRegistry;

/// Reasons to leave a request entirely to the host network stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassReason {
    /// Server-sent events cannot be buffered into a message exchange.
    EventStream,
    /// Document loads are never altered.
    Navigation,
    /// DevTools `only-if-cached` probe outside same-origin mode.
    OnlyIfCached,
    /// Nobody has opted in (also covers a lingering unregistered instance).
    NoActiveSessions,
}

/// Reasons to fetch from the network on the proxy's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughReason {
    BypassHeader,
    NoOwningSession,
    InactiveSession,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Bypass(BypassReason),
    Passthrough(PassthroughReason),
    Route,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bypass(reason) => write!(f, "bypass ({:?})", reason),
            Self::Passthrough(reason) => write!(f, "passthrough ({:?})", reason),
            Self::Route => f.write_str("route"),
        }
    }
}

/// Outcome of classification plus the owning session, if one was resolved.
#[derive(Debug)]
pub struct Classification {
    pub decision: Decision,
    pub owner: Option<Client>,
}

pub struct RequestClassifier {
    bypass_header: String,
}

impl RequestClassifier {
    pub fn new(bypass_header: impl Into<String>) -> Self {
        Self { bypass_header: bypass_header.into().to_ascii_lowercase() }
    }

    pub fn bypass_header(&self) -> &str {
        &self.bypass_header
    }

    /// Classify in strict priority order. `resolve` runs only once the cheap
    /// bypass checks have passed.
    pub fn classify<F>(
        &self,
        request: &InterceptedRequest,
        registry: &SessionRegistry,
        resolve: F,
    ) -> Classification
    where
        F: FnOnce() -> Option<Client>,
    {
        if let Some(reason) = Self::bypass_reason(request, registry) {
            return Classification { decision: Decision::Bypass(reason), owner: None };
        }

        let owner = resolve();
        let decision = if request.has_bypass_marker(&self.bypass_header) {
            Decision::Passthrough(PassthroughReason::BypassHeader)
        } else {
            match &owner {
                None => Decision::Passthrough(PassthroughReason::NoOwningSession),
                Some(client) if !registry.is_active(&client.id) => {
                    Decision::Passthrough(PassthroughReason::InactiveSession)
                },
                Some(_) => Decision::Route,
            }
        };

        Classification { decision, owner }
    }

    fn bypass_reason(
        request: &InterceptedRequest,
        registry: &SessionRegistry,
    ) -> Option<BypassReason> {
        if request.accepts_event_stream() {
            return Some(BypassReason::EventStream);
        }
        if request.mode == RequestMode::Navigate {
            return Some(BypassReason::Navigation);
        }
        if request.cache == CacheMode::OnlyIfCached && request.mode != RequestMode::SameOrigin {
            return Some(BypassReason::OnlyIfCached);
        }
        if registry.is_empty() {
            return Some(BypassReason::NoActiveSessions);
        }
        None
    }
}
