//! Fallback handler: every request that is not part of the control surface
//! is captured and handed to the interceptor.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use fetchgate_core::proxy::common::header_constants::{via_includes_self, X_FETCHGATE_CLIENT};
use fetchgate_core::proxy::common::random_id::generate_request_id;
use fetchgate_core::proxy::FetchEvent;
use fetchgate_types::{
    CacheMode, ClientId, InterceptError, InterceptedRequest, ProxyResponse, RequestMode,
};

use crate::state::AppState;

pub const MAX_BODY_BYTES: usize = 100 * 1024 * 1024;

pub async fn intercept(State(state): State<AppState>, request: Request) -> Response {
    if request.method() == Method::CONNECT {
        return (StatusCode::METHOD_NOT_ALLOWED, "CONNECT tunnelling is not supported").into_response();
    }
    if let Some(error) = loop_error(&request) {
        warn!("[Intercept] {}", error);
        return error_response(&error);
    }

    let (captured, client_id) = match capture(request).await {
        Ok(parts) => parts,
        Err(e) => return error_response(&e),
    };
    debug!("[Intercept] {} {} (client {:?})", captured.method, captured.url, client_id);

    match state.interceptor().fetch(FetchEvent::new(captured, client_id)).await {
        Ok(response) => proxy_response(response),
        Err(e) => error_response(&e),
    }
}

/// Read the request once into an owned capture. The issuing-client header is
/// consumed here and never forwarded.
pub async fn capture(
    request: Request,
) -> Result<(InterceptedRequest, Option<ClientId>), InterceptError> {
    let (parts, body) = request.into_parts();
    let url = absolute_url(&parts.uri, &parts.headers)?;
    let body = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| InterceptError::InvalidRequest { message: e.to_string() })?;

    let mut headers = collect_headers(&parts.headers);
    let client_id = headers.remove(X_FETCHGATE_CLIENT).map(ClientId::from);

    let mode = headers
        .get("sec-fetch-mode")
        .and_then(|m| m.parse::<RequestMode>().ok())
        .unwrap_or_default();
    let destination = headers.get("sec-fetch-dest").cloned().unwrap_or_default();
    let referrer = headers.get(header::REFERER.as_str()).cloned().unwrap_or_default();
    let cache = cache_mode(&headers);

    let mut captured = InterceptedRequest::get(generate_request_id(), url);
    captured.method = parts.method.as_str().to_string();
    captured.mode = mode;
    captured.cache = cache;
    captured.destination = destination;
    captured.referrer = referrer;
    captured.headers = headers;
    captured.body = body;
    Ok((captured, client_id))
}

/// A request this proxy already sent upstream came back to it, e.g. a direct
/// request whose `Host` is the proxy's own listener.
fn loop_error(request: &Request) -> Option<InterceptError> {
    let looped = request
        .headers()
        .get_all(header::VIA)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(via_includes_self);
    looped.then(|| InterceptError::LoopDetected { url: request.uri().to_string() })
}

/// Forward-proxy requests carry an absolute URI; direct requests are rebuilt
/// from `Host`.
fn absolute_url(uri: &Uri, headers: &HeaderMap) -> Result<String, InterceptError> {
    if uri.scheme().is_some() && uri.authority().is_some() {
        return Ok(uri.to_string());
    }
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| InterceptError::InvalidRequest { message: "missing Host header".to_string() })?;
    let path = uri.path_and_query().map_or("/", |pq| pq.as_str());
    Ok(format!("http://{}{}", host, path))
}

fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else { continue };
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    map
}

fn cache_mode(headers: &BTreeMap<String, String>) -> CacheMode {
    let cache_control = headers.get("cache-control").map(|v| v.to_ascii_lowercase());
    let cache_control = cache_control.as_deref().unwrap_or_default();

    if cache_control.contains("only-if-cached") {
        CacheMode::OnlyIfCached
    } else if cache_control.contains("no-store") {
        CacheMode::NoStore
    } else if cache_control.contains("no-cache")
        || headers.get("pragma").is_some_and(|p| p.eq_ignore_ascii_case("no-cache"))
    {
        CacheMode::NoCache
    } else {
        CacheMode::Default
    }
}

fn proxy_response(response: ProxyResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut out = Response::new(Body::from(response.body.unwrap_or_default()));
    *out.status_mut() = status;
    for (name, value) in &response.headers {
        if let (Ok(name), Ok(value)) =
            (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value))
        {
            out.headers_mut().append(name, value);
        }
    }
    out
}

fn error_response(error: &InterceptError) -> Response {
    let status =
        StatusCode::from_u16(error.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(serde_json::json!({ "error": error.to_string(), "details": error }))).into_response()
}
