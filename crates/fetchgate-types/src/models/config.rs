//! Proxy server configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Header that forces a request straight to the network.
pub const DEFAULT_BYPASS_HEADER: &str = "x-fetchgate-bypass";

/// Full proxy configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct ProxyConfig {
    /// Port to listen on
    #[validate(range(min = 1_u16))]
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allow LAN access (bind to 0.0.0.0)
    #[serde(default)]
    pub allow_lan_access: bool,
    /// Registration scope: origin plus path prefix the proxy serves
    #[validate(url)]
    #[serde(default = "default_scope")]
    pub scope: String,
    /// How long a routed request waits for its controller's verdict
    #[validate(range(min = 100_u64, max = 600_000_u64))]
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// How long keepalive and integrity probes wait for a reply
    #[validate(range(min = 50_u64, max = 60_000_u64))]
    #[serde(default = "default_control_timeout_ms")]
    pub control_timeout_ms: u64,
    /// Timeout for passthrough network calls
    #[validate(range(min = 5_u64, max = 3600_u64))]
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,
    /// Escape-hatch header name
    #[validate(length(min = 1_u64))]
    #[serde(default = "default_bypass_header")]
    pub bypass_header: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            allow_lan_access: false,
            scope: default_scope(),
            request_timeout_ms: default_request_timeout_ms(),
            control_timeout_ms: default_control_timeout_ms(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
            bypass_header: default_bypass_header(),
        }
    }
}

impl ProxyConfig {
    /// Get the bind address based on LAN access setting.
    pub fn get_bind_address(&self) -> String {
        if self.allow_lan_access {
            "0.0.0.0".to_string()
        } else {
            "127.0.0.1".to_string()
        }
    }

    /// Get the full bind socket address.
    pub fn get_socket_addr(&self) -> String {
        format!("{}:{}", self.get_bind_address(), self.port)
    }
}

pub const fn default_port() -> u16 {
    8046
}

pub fn default_scope() -> String {
    format!("http://localhost:{}/", default_port())
}

pub const fn default_request_timeout_ms() -> u64 {
    5000
}

pub const fn default_control_timeout_ms() -> u64 {
    1000
}

pub const fn default_upstream_timeout_secs() -> u64 {
    120
}

pub fn default_bypass_header() -> String {
    DEFAULT_BYPASS_HEADER.to_string()
}
