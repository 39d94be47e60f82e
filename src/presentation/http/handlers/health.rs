//! Health Check Handlers
//!
//! # Endpoints
//! - `GET /health` - Status plus live connection, room and channel counts
//! - `GET /health/live` - Liveness probe (is the process serving HTTP?)

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::time::Instant;

use crate::startup::AppState;

/// Server start time for uptime calculation
static SERVER_START: Lazy<Instant> = Lazy::new(Instant::now);

/// Initialize the server start time (call during startup)
pub fn init_server_start() {
    Lazy::force(&SERVER_START);
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub connections: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rooms: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<usize>,
}

/// Simple liveness response
#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
}

/// Returns 200 with `status: "ok"` while the hub answers, 503 once it has stopped.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let connections = state.gateway.connection_count();
    let uptime_seconds = SERVER_START.elapsed().as_secs();

    match state.gateway.stats().await {
        Ok(stats) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                version: env!("CARGO_PKG_VERSION"),
                uptime_seconds,
                connections,
                rooms: Some(stats.rooms),
                channels: Some(stats.channels),
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check: hub unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable",
                    version: env!("CARGO_PKG_VERSION"),
                    uptime_seconds,
                    connections,
                    rooms: None,
                    channels: None,
                }),
            )
        }
    }
}

/// Liveness probe
pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse { status: "alive" })
}
