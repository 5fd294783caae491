use async_trait::async_trait;
use fetchgate_types::{
    InterceptError, InterceptedRequest, ProxyResponse, RedirectMode, ResponseType,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, VIA};
use reqwest::{Client, Method};

use super::Network;
use crate::proxy::common::client_builder::build_http_client;
use crate::proxy::common::header_constants::{is_hop_by_hop, VIA_VALUE};

pub struct UpstreamClient {
    following: Client,
    manual: Client,
}

impl UpstreamClient {
    pub fn new(timeout_secs: u64) -> Result<Self, reqwest::Error> {
        Ok(Self {
            following: build_http_client(timeout_secs, true)?,
            manual: build_http_client(timeout_secs, false)?,
        })
    }

    fn client_for(&self, redirect: RedirectMode) -> &Client {
        match redirect {
            RedirectMode::Follow => &self.following,
            RedirectMode::Manual | RedirectMode::Error => &self.manual,
        }
    }
}

pub(super) fn build_headers(request: &InterceptedRequest) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in &request.headers {
        if is_hop_by_hop(name) {
            continue;
        }
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            },
            _ => tracing::debug!("[Upstream] Dropping unrepresentable header {}", name),
        }
    }
    // Marks the hop so a request aimed back at the proxy is refused on re-entry.
    headers.append(VIA, HeaderValue::from_static(VIA_VALUE));
    headers
}

fn upstream_error(e: impl std::fmt::Display) -> InterceptError {
    InterceptError::Upstream { message: e.to_string() }
}

#[async_trait]
impl Network for UpstreamClient {
    async fn fetch(&self, request: InterceptedRequest) -> Result<ProxyResponse, InterceptError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| InterceptError::InvalidRequest { message: e.to_string() })?;
        let url = reqwest::Url::parse(&request.url)
            .map_err(|e| InterceptError::InvalidRequest { message: format!("{}: {}", request.url, e) })?;

        let mut builder =
            self.client_for(request.redirect).request(method, url.clone()).headers(build_headers(&request));
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!("[Upstream] {} {} failed: {}", request.method, request.url, e);
            upstream_error(e)
        })?;

        let status = response.status();
        if request.redirect == RedirectMode::Error && status.is_redirection() {
            return Err(upstream_error(format!(
                "redirect ({}) refused for {} with redirect mode \"error\"",
                status.as_u16(),
                request.url
            )));
        }

        let redirected = response.url() != &url;
        let kind = if request.redirect == RedirectMode::Manual && status.is_redirection() {
            ResponseType::Opaqueredirect
        } else {
            ResponseType::Basic
        };
        let headers = response
            .headers()
            .iter()
            .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
            .map(|(name, value)| {
                (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
            })
            .collect();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let bodiless = request.method.eq_ignore_ascii_case("HEAD")
            || matches!(status.as_u16(), 204 | 205 | 304);
        let body = response.bytes().await.map_err(upstream_error)?;

        tracing::debug!("[Upstream] {} {} -> {}", request.method, request.url, status.as_u16());

        Ok(ProxyResponse {
            status: status.as_u16(),
            status_text,
            headers,
            body: (!bodiless).then_some(body),
            redirected,
            kind,
        })
    }
}
