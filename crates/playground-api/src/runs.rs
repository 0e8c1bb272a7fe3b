// Run HTTP routes

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use playground_core::RunStatus;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{ApiError, ErrorResponse};
use crate::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/runs/:workflow_run_id/status", get(get_run_status))
        .with_state(state)
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RunStatusResponse {
    pub workflow_run_id: String,
    #[schema(value_type = String, example = "RUNNING")]
    pub status: RunStatus,
}

/// GET /runs/{workflow_run_id}/status - Current status of a run
#[utoipa::path(
    get,
    path = "/runs/{workflow_run_id}/status",
    params(
        ("workflow_run_id" = String, Path, description = "Run id returned on submission")
    ),
    responses(
        (status = 200, description = "Current run status", body = RunStatusResponse),
        (status = 404, description = "Unknown run", body = ErrorResponse),
        (status = 502, description = "Platform error", body = ErrorResponse),
    ),
    tag = "runs"
)]
pub async fn get_run_status(
    State(state): State<AppState>,
    Path(workflow_run_id): Path<String>,
) -> Result<Json<RunStatusResponse>, ApiError> {
    let status = state.runner.client().get_status(&workflow_run_id).await?;
    Ok(Json(RunStatusResponse {
        workflow_run_id,
        status,
    }))
}
