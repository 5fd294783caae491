//! Application State
//!
//! Holds the interceptor and the configuration it was built from.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use fetchgate_core::proxy::Interceptor;
use fetchgate_types::ProxyConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub interceptor: Interceptor,
    pub config: ProxyConfig,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(interceptor: Interceptor, config: ProxyConfig) -> Self {
        Self { inner: Arc::new(AppStateInner { interceptor, config, started_at: Utc::now() }) }
    }

    pub fn interceptor(&self) -> &Interceptor {
        &self.inner.interceptor
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.inner.config
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }
}
