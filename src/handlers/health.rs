use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::time::Instant;
use utoipa::ToSchema;

use crate::{handlers::AppState, ApiResponse};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub message: String,
    pub version: String,
    pub database: String,
    pub latency_ms: u64,
}

/// Liveness plus a database ping. Answers `503` when the database is down.
#[utoipa::path(
    get,
    path = "/api/health",
    summary = "Health check",
    responses(
        (status = 200, description = "API running", body = ApiResponse<HealthStatus>),
        (status = 503, description = "Database unreachable", body = ApiResponse<HealthStatus>),
    ),
    tag = "health"
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<HealthStatus>>) {
    let start = Instant::now();
    let db_result = crate::db::check_connection(&state.db).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let (status, health) = match db_result {
        Ok(()) => (
            StatusCode::OK,
            HealthStatus {
                status: "up".into(),
                message: "API Running".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                database: "up".into(),
                latency_ms,
            },
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check: database unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                HealthStatus {
                    status: "degraded".into(),
                    message: "Database unreachable".into(),
                    version: env!("CARGO_PKG_VERSION").into(),
                    database: "down".into(),
                    latency_ms,
                },
            )
        }
    };

    (status, Json(ApiResponse::success(health)))
}
