use super::client::build_headers;
use super::{Network, UpstreamClient};
use bytes::Bytes;
use fetchgate_types::{InterceptError, InterceptedRequest, RedirectMode, ResponseType};
use wiremock::matchers::{body_bytes, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn test_hop_by_hop_headers_are_dropped() {
    let request = InterceptedRequest::get("r", "http://localhost/")
        .with_header("Connection", "keep-alive")
        .with_header("Host", "localhost")
        .with_header("X-Custom", "1");

    let headers = build_headers(&request);
    assert!(headers.get("connection").is_none());
    assert!(headers.get("host").is_none());
    assert_eq!(headers.get("x-custom").and_then(|v| v.to_str().ok()), Some("1"));
    assert_eq!(headers.get("via").and_then(|v| v.to_str().ok()), Some("1.1 fetchgate"));
}

#[tokio::test]
async fn test_forwards_method_headers_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/items"))
        .and(header("x-custom", "1"))
        .and(header("via", "1.1 fetchgate"))
        .and(body_bytes(b"payload".to_vec()))
        .respond_with(ResponseTemplate::new(201).set_body_string("created"))
        .expect(1)
        .mount(&server)
        .await;

    let mut request = InterceptedRequest::get("r", format!("{}/api/items", server.uri()))
        .with_header("x-custom", "1");
    request.method = "POST".to_string();
    request.body = Bytes::from_static(b"payload");

    let upstream = UpstreamClient::new(10).unwrap();
    let response = upstream.fetch(request).await.unwrap();

    assert_eq!(response.status, 201);
    assert_eq!(response.status_text, "Created");
    assert_eq!(response.body.as_deref(), Some(&b"created"[..]));
    assert_eq!(response.kind, ResponseType::Basic);
    assert!(!response.redirected);
}

#[tokio::test]
async fn test_follow_marks_redirected() {
    let server = MockServer::start().await;
    Mock::given(path("/old"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", format!("{}/new", server.uri())),
        )
        .mount(&server)
        .await;
    Mock::given(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
        .mount(&server)
        .await;

    let upstream = UpstreamClient::new(10).unwrap();
    let response =
        upstream.fetch(InterceptedRequest::get("r", format!("{}/old", server.uri()))).await.unwrap();

    assert_eq!(response.status, 200);
    assert!(response.redirected);
}

#[tokio::test]
async fn test_redirect_error_mode_fails_on_3xx() {
    let server = MockServer::start().await;
    Mock::given(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .mount(&server)
        .await;

    let mut request = InterceptedRequest::get("r", format!("{}/old", server.uri()));
    request.redirect = RedirectMode::Error;

    let upstream = UpstreamClient::new(10).unwrap();
    let err = upstream.fetch(request).await.unwrap_err();
    assert!(matches!(err, InterceptError::Upstream { .. }));
}

#[tokio::test]
async fn test_redirect_manual_mode_is_opaque() {
    let server = MockServer::start().await;
    Mock::given(path("/old"))
        .respond_with(ResponseTemplate::new(307).insert_header("location", "/new"))
        .mount(&server)
        .await;

    let mut request = InterceptedRequest::get("r", format!("{}/old", server.uri()));
    request.redirect = RedirectMode::Manual;

    let upstream = UpstreamClient::new(10).unwrap();
    let response = upstream.fetch(request).await.unwrap();
    assert_eq!(response.status, 307);
    assert_eq!(response.kind, ResponseType::Opaqueredirect);
}

#[tokio::test]
async fn test_invalid_url_is_rejected() {
    let upstream = UpstreamClient::new(10).unwrap();
    let err = upstream.fetch(InterceptedRequest::get("r", "not a url")).await.unwrap_err();
    assert!(matches!(err, InterceptError::InvalidRequest { .. }));
}

#[tokio::test]
async fn test_empty_body_is_kept_unless_status_has_none() {
    let server = MockServer::start().await;
    Mock::given(path("/empty"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(path("/gone"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let upstream = UpstreamClient::new(10).unwrap();
    let empty =
        upstream.fetch(InterceptedRequest::get("r", format!("{}/empty", server.uri()))).await.unwrap();
    assert_eq!(empty.body.as_deref(), Some(&b""[..]));

    let no_content =
        upstream.fetch(InterceptedRequest::get("r", format!("{}/gone", server.uri()))).await.unwrap();
    assert_eq!(no_content.status, 204);
    assert!(no_content.body.is_none());
}
