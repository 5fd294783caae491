//! Domain models shared by the proxy engine and the server.

mod client;
mod config;
mod request;
mod response;

pub use client::{ClientId, ClientType};
pub use config::{ProxyConfig, DEFAULT_BYPASS_HEADER};
pub use request::{CacheMode, CredentialsMode, InterceptedRequest, RedirectMode, RequestMode};
pub use response::{MockResponse, NetworkErrorPayload, ProxyResponse, ResponseRecord, ResponseType};
