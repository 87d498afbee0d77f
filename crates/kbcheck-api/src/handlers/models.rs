//! Model discovery diagnostic handler.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use kbcheck_inference::DiscoveryResult;

use crate::{ApiError, AppState, RequireAccess};

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    /// Operator-facing one-liner, including the permissions warning when empty.
    pub summary: String,
    #[serde(flatten)]
    pub discovery: DiscoveryResult,
}

/// List the models the configured credential can use for generation.
pub async fn list_models(
    _access: RequireAccess,
    State(state): State<AppState>,
) -> Result<Json<ModelsResponse>, ApiError> {
    let services = state.services()?;
    let discovery = services.discovery.discover().await?;

    Ok(Json(ModelsResponse {
        summary: discovery.summary(),
        discovery,
    }))
}
