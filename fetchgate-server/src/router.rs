use axum::{
    extract::DefaultBodyLimit, http::StatusCode, response::IntoResponse, routing::get, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::api;
use crate::intercept::{intercept, MAX_BODY_BYTES};
use crate::state::AppState;
use crate::ws::controller_ws;

/// Path controllers connect to. Namespaced so it never shadows an
/// intercepted application route.
pub const CONTROLLER_PATH: &str = "/__fetchgate/controller";

pub fn build_router(state: AppState) -> Router {
    // CORS applies to the control API only; intercepted requests (including
    // preflights) must reach the interceptor untouched.
    let api_routes = Router::<AppState>::new().nest("/api", api::router()).layer(
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    );

    let public_routes = Router::<AppState>::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .route("/version", get(version_info))
        .route(CONTROLLER_PATH, get(controller_ws));

    api_routes
        .merge(public_routes)
        .fallback(intercept)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, axum::Json(serde_json::json!({"status": "ok"})))
}

async fn version_info() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({
            "version": option_env!("GIT_VERSION").unwrap_or("dev"),
            "build_time": option_env!("BUILD_TIME").unwrap_or("unknown"),
            "cargo_version": env!("CARGO_PKG_VERSION"),
            "checksum": fetchgate_core::proxy::integrity_checksum(),
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::test_app_state;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_route() {
        let app = build_router(test_app_state());
        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_version_includes_checksum() {
        let app = build_router(test_app_state());
        let response = app
            .oneshot(Request::builder().uri("/version").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["checksum"].as_str().map(str::len), Some(32));
    }

    #[tokio::test]
    async fn test_controller_path_requires_upgrade() {
        let app = build_router(test_app_state());
        let response = app
            .oneshot(Request::builder().uri(CONTROLLER_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
