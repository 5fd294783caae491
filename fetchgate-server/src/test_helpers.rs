//! Test helpers for fetchgate-server unit tests.

use fetchgate_core::proxy::Interceptor;
use fetchgate_types::ProxyConfig;
use url::Url;

use crate::state::AppState;

/// Create a started `AppState` scoped to `http://localhost:3000/`.
pub fn test_app_state() -> AppState {
    let config = ProxyConfig { scope: "http://localhost:3000/".to_string(), ..Default::default() };
    let interceptor = Interceptor::builder(Url::parse(&config.scope).expect("test scope"))
        .build()
        .expect("failed to build test interceptor");
    interceptor.start().expect("failed to start test interceptor");
    AppState::new(interceptor, config)
}
