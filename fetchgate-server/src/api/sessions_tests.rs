#![allow(clippy::unwrap_used, clippy::indexing_slicing, reason = "test assertions")]

use super::sessions::{check_session, list_sessions, navigate_session, NavigateRequest};
use crate::test_helpers::test_app_state;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use fetchgate_core::proxy::{ChannelPort, Client, PortMessage};
use fetchgate_types::{ClientId, ClientType, ControllerMessage};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

fn connect(
    state: &crate::state::AppState,
    id: &str,
    kind: ClientType,
) -> UnboundedReceiver<PortMessage> {
    let (port, rx) = ChannelPort::new();
    state.interceptor().connect_client(Client::new(ClientId::from(id), kind, None, Arc::new(port)));
    rx
}

#[tokio::test]
async fn test_list_sessions_marks_active_clients() {
    let state = test_app_state();
    let _a = connect(&state, "a", ClientType::Window);
    let _w = connect(&state, "w", ClientType::Worker);
    state.interceptor().handle_message(&ClientId::from("a"), ControllerMessage::MockActivate);

    let response = list_sessions(State(state)).await.0;

    assert_eq!(response.active, vec![ClientId::from("a")]);
    assert_eq!(response.clients.len(), 2);
    assert!(response.clients[0].active);
    assert!(response.clients[0].controlled);
    assert!(!response.clients[1].active);
}

#[tokio::test]
async fn test_check_unknown_session_is_503() {
    let state = test_app_state();
    let response = check_session(State(state), Path("ghost".to_string())).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_navigate_updates_client_url() {
    let state = test_app_state();
    let _a = connect(&state, "a", ClientType::Window);

    let response = navigate_session(
        State(state.clone()),
        Path("a".to_string()),
        Json(NavigateRequest { url: "http://localhost:3000/app".to_string() }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let client = state.interceptor().directory().get(&ClientId::from("a")).unwrap();
    assert_eq!(client.url.unwrap().as_str(), "http://localhost:3000/app");

    let response = navigate_session(
        State(state),
        Path("a".to_string()),
        Json(NavigateRequest { url: "not a url".to_string() }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
