//! Health check handler

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use tracing::warn;

use super::super::state::AppState;
use super::super::types::{ApiResponse, HealthResponse};

/// GET /health
///
/// 503 when PostgreSQL is configured but not answering.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
        (status = 503, description = "Database configured but unreachable")
    ),
    tag = "System"
)]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    let database = match &state.db {
        None => "disabled",
        Some(db) => match db.health_check().await {
            Ok(()) => "up",
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                "down"
            }
        },
    };

    let status = if database == "down" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (
        status,
        Json(ApiResponse::success(HealthResponse {
            timestamp_ms: Utc::now().timestamp_millis(),
            database,
        })),
    )
}
