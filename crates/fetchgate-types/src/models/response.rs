//! Response models: controller answers, proxy responses, lifecycle records.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Response type as observed by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Basic,
    Cors,
    #[default]
    Default,
    Error,
    Opaque,
    Opaqueredirect,
}

/// A synthesized response supplied by a controller in `MOCK_RESPONSE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockResponse {
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default)]
    pub status_text: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// `None` produces a response without a body.
    #[serde(default)]
    pub body: Option<String>,
    /// Informational; the synthesized response derives `ok` from `status`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
}

const fn default_status() -> u16 {
    200
}

/// Payload of `NETWORK_ERROR`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkErrorPayload {
    pub name: String,
    pub message: String,
}

/// The response actually returned to the caller, whether synthesized or fetched.
///
/// The body is a shared `Bytes` buffer: cloning the response for the lifecycle
/// notice never disturbs the copy delivered to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    pub status: u16,
    pub status_text: String,
    /// In wire order; names may repeat.
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
    pub redirected: bool,
    pub kind: ResponseType,
}

impl ProxyResponse {
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Equivalent of constructing a response from a controller-provided init.
    pub fn from_mock(mock: MockResponse) -> Self {
        Self {
            status: mock.status,
            status_text: mock.status_text.unwrap_or_default(),
            headers: mock.headers.into_iter().collect(),
            body: mock.body.map(Bytes::from),
            redirected: false,
            kind: ResponseType::Default,
        }
    }

    /// Headers folded into a map; repeated names are joined with `", "`.
    pub fn header_map(&self) -> BTreeMap<String, String> {
        let mut map: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in &self.headers {
            map.entry(name.to_ascii_lowercase())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.clone());
        }
        map
    }

    /// Snapshot for the `RESPONSE` lifecycle notice.
    pub fn to_record(&self, request_id: &str) -> ResponseRecord {
        ResponseRecord {
            request_id: request_id.to_string(),
            kind: self.kind,
            ok: self.ok(),
            status: self.status,
            status_text: self.status_text.clone(),
            body: self.body.as_ref().map(|b| String::from_utf8_lossy(b).into_owned()),
            headers: self.header_map(),
            redirected: self.redirected,
        }
    }
}

/// Payload of the `RESPONSE` lifecycle notice sent to the owning controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecord {
    pub request_id: String,
    #[serde(rename = "type")]
    pub kind: ResponseType,
    pub ok: bool,
    pub status: u16,
    pub status_text: String,
    pub body: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub redirected: bool,
}
