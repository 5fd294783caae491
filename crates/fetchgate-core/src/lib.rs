//! # fetchgate Core
//!
//! The interception engine behind fetchgate.
//!
//! ## Architecture
//!
//! ```text
//! fetchgate-core/src/proxy/
//! ├── registry.rs     # active session set (only mutated here)
//! ├── lifecycle.rs    # install / activate / claim / self-unregister
//! ├── clients.rs      # open clients and their message ports
//! ├── classifier.rs   # bypass / passthrough / route decision
//! ├── resolver.rs     # which controller owns a request
//! ├── exchange.rs     # correlated, timeout-bounded request/reply
//! ├── dispatcher.rs   # mock / passthrough / error + lifecycle notices
//! ├── upstream/       # real network (reqwest)
//! └── interceptor.rs  # wires the above into message and fetch events
//! ```

#![allow(
    clippy::significant_drop_tightening,
    reason = "RwLock guards in async code require careful lifetime management"
)]
#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

pub mod error;
pub mod modules;
pub mod proxy;
pub mod utils;

// Re-export commonly used types
pub use error::{AppError, AppResult};
pub use proxy::{FetchEvent, FetchOutcome, Interceptor, InterceptorBuilder};
