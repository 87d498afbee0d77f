//! HTTP handlers for kbcheck-api.

pub mod chat;
pub mod check;
pub mod models;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::AppState;

/// Liveness probe. Not gated.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "analysis_configured": state.services.is_some(),
        "access_configured": state.gate.is_configured(),
    }))
}
