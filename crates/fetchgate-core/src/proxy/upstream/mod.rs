//! Upstream module - the real network behind passthrough and native bypass

mod client;

#[cfg(test)]
mod tests;

pub use client::UpstreamClient;

use async_trait::async_trait;
use fetchgate_types::{InterceptError, InterceptedRequest, ProxyResponse};

/// Performs a request against the real network.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: InterceptedRequest) -> Result<ProxyResponse, InterceptError>;
}
