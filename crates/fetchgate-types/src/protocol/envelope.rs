//! The `REQUEST` envelope sent to a controller.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::models::{CacheMode, CredentialsMode, InterceptedRequest, RedirectMode, RequestMode};

/// Serializable snapshot of an intercepted request. The body travels base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    pub id: String,
    pub url: String,
    pub mode: RequestMode,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub cache: CacheMode,
    pub credentials: CredentialsMode,
    pub destination: String,
    pub integrity: String,
    pub redirect: RedirectMode,
    pub referrer: String,
    pub referrer_policy: String,
    #[serde(serialize_with = "encode_body", deserialize_with = "decode_body")]
    pub body: Bytes,
    pub body_used: bool,
    pub keepalive: bool,
}

impl From<&InterceptedRequest> for RequestEnvelope {
    fn from(req: &InterceptedRequest) -> Self {
        Self {
            id: req.id.clone(),
            url: req.url.clone(),
            mode: req.mode,
            method: req.method.clone(),
            headers: req.headers.clone(),
            cache: req.cache,
            credentials: req.credentials,
            destination: req.destination.clone(),
            integrity: req.integrity.clone(),
            redirect: req.redirect,
            referrer: req.referrer.clone(),
            referrer_policy: req.referrer_policy.clone(),
            body: req.body.clone(),
            body_used: false,
            keepalive: req.keepalive,
        }
    }
}

fn encode_body<S: Serializer>(body: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(body))
}

fn decode_body<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
    let raw = String::deserialize(deserializer)?;
    STANDARD.decode(raw.as_bytes()).map(Bytes::from).map_err(serde::de::Error::custom)
}
