//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (accepting connections)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
///
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Returns 200 while new WebSocket connections would be accepted.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.hub.is_shutting_down() || state.hub.is_full() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

/// GET /health
///
/// Full health status with hub details.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let hub = &state.hub;
    let status = if hub.is_shutting_down() {
        "draining"
    } else {
        "healthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        connections: state.ws_connection_count(),
        max_connections: hub.config().max_connections,
        groups: hub.registry().group_names(),
        operations: hub.dispatcher().ops().into_iter().map(String::from).collect(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_liveness() {
        let status = liveness().await;
        assert_eq!(status, StatusCode::OK);
    }
}
