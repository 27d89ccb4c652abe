use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::time::Instant;
use utoipa::ToSchema;

use crate::AppState;

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    pub message: String,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub version: String,
    pub timestamp: String,
    pub uptime_secs: u64,
    pub database: ComponentHealth,
}

static START_TIME: OnceCell<Instant> = OnceCell::new();

/// Records the process start for uptime reporting.
pub fn init_start_time() {
    let _ = START_TIME.get_or_init(Instant::now);
}

fn uptime_secs() -> u64 {
    START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

/// Liveness plus database ping
#[utoipa::path(
    get,
    path = "/health",
    summary = "Health check",
    responses(
        (status = 200, description = "Service and database are up", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse),
    ),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let started = Instant::now();
    let db_result = crate::db::check_connection(&state.db).await;
    let latency_ms = started.elapsed().as_millis() as u64;

    let database = match db_result {
        Ok(()) => ComponentHealth {
            status: ComponentStatus::Up,
            message: "Connection successful".to_string(),
            latency_ms,
        },
        Err(e) => ComponentHealth {
            status: ComponentStatus::Down,
            message: format!("Connection failed: {}", e),
            latency_ms,
        },
    };

    let status = database.status;
    let code = match status {
        ComponentStatus::Up => StatusCode::OK,
        ComponentStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_secs: uptime_secs(),
            database,
        }),
    )
}
