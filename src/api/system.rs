use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub struct HealthDto {
    pub status: String,
    pub version: String,
}

/// GET /system/health
/// Liveness probe; round-trips the database connection.
pub async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<HealthDto>>, ApiError> {
    state
        .store()
        .ping()
        .await
        .map_err(|e| ApiError::internal(format!("Database unreachable: {e}")))?;

    Ok(Json(ApiResponse::success(HealthDto {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })))
}
