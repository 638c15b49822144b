//! HTTP routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use forge_core::{DeleteResponse, ForgeError};
use forge_sandbox::{delete_workspace, DeleteOutcome};
use tracing::error;

use crate::state::SharedState;

/// Failures surfaced by the HTTP routes
#[derive(Debug)]
pub enum ApiError {
    /// The id cannot name a workspace
    BadRequest(String),
    /// The server failed to carry out the request
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(DeleteResponse {
                    success: false,
                    message,
                }),
            )
                .into_response(),
            ApiError::Internal(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "detail": detail })),
            )
                .into_response(),
        }
    }
}

/// DELETE /api/projects/:project_id
pub async fn delete_project(
    State(app): State<SharedState>,
    Path(project_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let registry = app.registry.clone();
    let id = project_id.clone();
    let outcome = tokio::task::spawn_blocking(move || delete_workspace(&registry, &id))
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to delete project: {}", e)))?;

    match outcome {
        Ok(DeleteOutcome::Removed) => Ok(Json(DeleteResponse {
            success: true,
            message: format!("Project {} deleted successfully", project_id),
        })),
        Ok(DeleteOutcome::AlreadyAbsent) => Ok(Json(DeleteResponse {
            success: true,
            message: format!("Project {} not found, but deletion completed", project_id),
        })),
        Err(e @ ForgeError::InvalidJobId(_)) => Err(ApiError::BadRequest(e.to_string())),
        Err(e) => {
            error!("Failed to delete project {}: {}", project_id, e);
            Err(ApiError::Internal(format!("Failed to delete project: {}", e)))
        }
    }
}

/// GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "forge"
    }))
}
