//! # fetchgate Types
//!
//! Core types, wire protocol, and error definitions for fetchgate.
//!
//! - **`error`** - Typed errors for interception and configuration
//! - **`models`** - Clients, intercepted requests, responses, proxy config
//! - **`protocol`** - Messages exchanged between the proxy and controllers
//!
//! ## Architecture Role
//!
//! `fetchgate-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!          fetchgate-types (this crate)
//!                  │
//!                  ▼
//!          fetchgate-core
//!                  │
//!                  ▼
//!          fetchgate-server
//! ```
//!
//! Everything here is plain data: serializable, cloneable, no I/O.

pub mod error;
pub mod models;
pub mod protocol;

pub use error::{ConfigError, InterceptError, Result};

pub use models::{
    CacheMode, ClientId, ClientType, CredentialsMode, InterceptedRequest, MockResponse,
    NetworkErrorPayload, ProxyConfig, ProxyResponse, RedirectMode, RequestMode, ResponseRecord,
    ResponseType,
};
pub use protocol::{ControllerMessage, ControllerVerdict, Frame, ProxyMessage, RequestEnvelope};
