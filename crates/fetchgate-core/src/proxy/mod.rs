//! Proxy module - the interception engine
//!
//! Requests enter through [`Interceptor::handle_fetch`]; controller messages
//! through [`Interceptor::handle_message`]. Everything else is an internal
//! stage of those two paths.

pub mod classifier;
pub mod clients;
pub mod common;
pub mod dispatcher;
pub mod exchange;
pub mod interceptor;
pub mod lifecycle;
pub mod registry;
pub mod resolver;
pub mod upstream;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use clients::{ChannelPort, Client, ClientDirectory, ClientPort, PortClosed, PortMessage, ReplyPort};
pub use interceptor::{
    FetchEvent, FetchOutcome, Interceptor, InterceptorBuilder, InterceptorStatus, SessionCheck,
};
pub use lifecycle::{integrity_checksum, LifecycleState};
pub use registry::SessionRegistry;
pub use upstream::{Network, UpstreamClient};

#[cfg(test)]
pub mod tests;
