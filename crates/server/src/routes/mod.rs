//! API route handlers
//!
//! - `health`: liveness and readiness
//! - `embeddings`: embedding generation and similarity ranking over HTTP
//! - `channel`: the same operations over a WebSocket connection

pub mod channel;
pub mod embeddings;
pub mod health;

use crate::error::ServerError;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info
///
/// # Response
///
/// ```json
/// {
///   "name": "embedgate",
///   "version": "0.1.0",
///   "endpoints": ["..."]
/// }
/// ```
pub async fn api_info() -> impl IntoResponse {
    Json(json!({
        "name": "embedgate",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "POST /embeddings/generate",
            "POST /embeddings/similarity",
            "GET /ws",
            "GET /health",
            "GET /ready"
        ]
    }))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
