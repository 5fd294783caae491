use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

use fetchgate_types::{ClientId, ClientType};

use crate::state::AppState;

#[derive(Serialize)]
pub struct ClientView {
    pub id: ClientId,
    #[serde(rename = "type")]
    pub kind: ClientType,
    pub url: Option<String>,
    pub controlled: bool,
    pub active: bool,
}

#[derive(Serialize)]
pub struct SessionsResponse {
    pub active: Vec<ClientId>,
    pub clients: Vec<ClientView>,
}

pub async fn list_sessions(State(state): State<AppState>) -> Json<SessionsResponse> {
    let interceptor = state.interceptor();
    let registry = interceptor.registry();
    let clients = [ClientType::Window, ClientType::Worker, ClientType::SharedWorker]
        .into_iter()
        .flat_map(|kind| interceptor.directory().match_all(kind))
        .map(|client| ClientView {
            active: registry.is_active(&client.id),
            url: client.url.as_ref().map(ToString::to_string),
            controlled: client.controlled,
            kind: client.kind,
            id: client.id,
        })
        .collect();

    Json(SessionsResponse { active: registry.snapshot(), clients })
}

pub async fn check_session(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Response {
    match state.interceptor().check_session(&ClientId::from(client_id)).await {
        Ok(check) => Json(check).into_response(),
        Err(e) => {
            let status = StatusCode::from_u16(e.http_status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(serde_json::json!({ "error": e.to_string(), "details": e })))
                .into_response()
        },
    }
}

#[derive(Deserialize)]
pub struct NavigateRequest {
    pub url: String,
}

pub async fn navigate_session(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    Json(body): Json<NavigateRequest>,
) -> Response {
    let url = match url::Url::parse(&body.url) {
        Ok(url) => url,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": e.to_string() })))
                .into_response();
        },
    };

    if state.interceptor().navigate_client(&ClientId::from(client_id), url) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "unknown client" })))
            .into_response()
    }
}
