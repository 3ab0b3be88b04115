use crate::state::ServerState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

/// Health check endpoint (liveness)
///
/// Never calls the provider; a slow or failing provider does not make the
/// gateway unhealthy.
pub async fn health_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(json!({
        "status": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "model": state.gateway.model(),
    }))
}

/// Readiness check endpoint
pub async fn readiness_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ready",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime_seconds(),
        "model": state.gateway.model(),
        "provider": state.provider_kind,
        "max_concurrency": state.gateway.config().max_concurrency,
        "available_permits": state.gateway.available_permits(),
    }))
}
