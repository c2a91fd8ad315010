//! Deploy hook handler.

use crate::error::{ApiError, ApiResult};
use crate::handlers::revalidate::SecretBody;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Serialize;

/// Deploy trigger response.
#[derive(Debug, Serialize)]
pub struct DeployResponse {
    pub success: bool,
    pub message: String,
    pub upstream_status: u16,
}

/// POST /api/deploy - Forward to the configured deploy hook.
pub async fn trigger_deploy(
    State(state): State<AppState>,
    payload: Result<Json<SecretBody>, JsonRejection>,
) -> ApiResult<Json<DeployResponse>> {
    let Json(body) = payload?;
    if !state.coordinator.authorize(&body.secret) {
        tracing::warn!("Deploy rejected: invalid secret");
        return Err(ApiError::Unauthorized("Invalid secret".to_string()));
    }

    let outcome = state.deploy.trigger().await?;
    Ok(Json(DeployResponse {
        success: true,
        message: "Deploy triggered".to_string(),
        upstream_status: outcome.upstream_status,
    }))
}
