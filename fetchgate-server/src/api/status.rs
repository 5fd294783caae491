use axum::{extract::State, response::Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use fetchgate_core::proxy::InterceptorStatus;

use crate::state::AppState;

#[derive(Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    pub listen: String,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,
    pub interceptor: InterceptorStatus,
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let started_at = state.started_at();
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        listen: state.config().get_socket_addr(),
        started_at,
        uptime_secs: (Utc::now() - started_at).num_seconds(),
        interceptor: state.interceptor().status(),
    })
}
