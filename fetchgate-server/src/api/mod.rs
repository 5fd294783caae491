//! API Routes
//!
//! Read-mostly control surface for the CLI and for humans.

mod sessions;
mod status;

#[cfg(test)]
mod sessions_tests;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(status::get_status))
        .route("/sessions", get(sessions::list_sessions))
        .route("/sessions/:client_id/check", post(sessions::check_session))
        .route("/sessions/:client_id/navigate", post(sessions::navigate_session))
}
