//! Intercepted request model.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request mode as reported by the issuing client (`Sec-Fetch-Mode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    NoCors,
    #[default]
    Cors,
    Websocket,
}

/// Cache mode of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMode {
    #[default]
    Default,
    NoStore,
    Reload,
    NoCache,
    ForceCache,
    OnlyIfCached,
}

/// Credentials mode of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialsMode {
    Omit,
    #[default]
    SameOrigin,
    Include,
}

/// Redirect policy of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RedirectMode {
    #[default]
    Follow,
    Error,
    Manual,
}

fn parse_kebab<T: DeserializeOwned>(s: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(s.trim().to_ascii_lowercase())).ok()
}

macro_rules! impl_from_str {
    ($($ty:ty),*) => {$(
        impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_kebab(s).ok_or_else(|| format!("invalid {}: {}", stringify!($ty), s))
            }
        }
    )*};
}

impl_from_str!(RequestMode, CacheMode, CredentialsMode, RedirectMode);

/// A request captured by the proxy.
///
/// The body is read exactly once at capture time. `Bytes` clones share the
/// same buffer, so the mock path and the passthrough duplicate both read it
/// without re-consuming anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptedRequest {
    pub id: String,
    pub url: String,
    pub method: String,
    pub mode: RequestMode,
    /// Header names are lower-cased.
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
    pub cache: CacheMode,
    pub credentials: CredentialsMode,
    pub destination: String,
    pub integrity: String,
    pub redirect: RedirectMode,
    pub referrer: String,
    pub referrer_policy: String,
    pub keepalive: bool,
}

impl InterceptedRequest {
    /// Minimal GET request, mostly useful for tests and synthetic probes.
    pub fn get(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            method: "GET".to_string(),
            mode: RequestMode::default(),
            headers: BTreeMap::new(),
            body: Bytes::new(),
            cache: CacheMode::default(),
            credentials: CredentialsMode::default(),
            destination: String::new(),
            integrity: String::new(),
            redirect: RedirectMode::default(),
            referrer: String::new(),
            referrer_policy: String::new(),
            keepalive: false,
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Whether the caller expects a long-lived event stream.
    pub fn accepts_event_stream(&self) -> bool {
        self.header("accept").is_some_and(|v| v.contains("text/event-stream"))
    }

    /// Whether the explicit bypass marker is set to `true`.
    pub fn has_bypass_marker(&self, header_name: &str) -> bool {
        self.header(header_name) == Some("true")
    }

    /// Duplicate of this request with one header removed.
    pub fn without_header(&self, name: &str) -> Self {
        let mut copy = self.clone();
        copy.headers.remove(&name.to_ascii_lowercase());
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = InterceptedRequest::get("1", "http://localhost/api")
            .with_header("Accept", "text/event-stream");
        assert_eq!(req.header("ACCEPT"), Some("text/event-stream"));
        assert!(req.accepts_event_stream());
    }

    #[test]
    fn test_bypass_marker_requires_true() {
        let on = InterceptedRequest::get("1", "http://x/").with_header("x-bypass", "true");
        let off = InterceptedRequest::get("1", "http://x/").with_header("x-bypass", "1");
        assert!(on.has_bypass_marker("x-bypass"));
        assert!(!off.has_bypass_marker("x-bypass"));
    }

    #[test]
    fn test_without_header_shares_body() {
        let mut req = InterceptedRequest::get("1", "http://x/").with_header("x-bypass", "true");
        req.body = Bytes::from_static(b"payload");

        let copy = req.without_header("X-Bypass");

        assert!(copy.header("x-bypass").is_none());
        assert!(req.header("x-bypass").is_some());
        assert_eq!(copy.body.as_ptr(), req.body.as_ptr());
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("same-origin".parse::<RequestMode>(), Ok(RequestMode::SameOrigin));
        assert_eq!("only-if-cached".parse::<CacheMode>(), Ok(CacheMode::OnlyIfCached));
        assert!("sideways".parse::<RedirectMode>().is_err());
    }
}
