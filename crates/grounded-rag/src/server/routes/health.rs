//! Health endpoint

use axum::{extract::State, Json};

use crate::server::state::AppState;
use crate::types::response::HealthResponse;

/// GET /health - Process liveness and pipeline readiness
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::new(state.is_ready()))
}
