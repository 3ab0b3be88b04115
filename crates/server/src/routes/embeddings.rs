use crate::error::ServerResult;
use crate::ops::{self, GenerateRequest, GenerateResponse, SimilarityRequest, SimilarityResponse};
use crate::state::ServerState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;

/// Generate embeddings for one text or a batch.
///
/// # Example
/// ```json
/// // Request
/// { "texts": ["deep learning intro", "cooking recipes"] }
///
/// // Response
/// { "embeddings": [[0.01, ...], [-0.2, ...]], "model": "sentence-transformers/all-MiniLM-L6-v2" }
/// ```
///
/// Exactly one of `text` / `texts` must be present, otherwise 400.
pub async fn generate(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> ServerResult<Json<GenerateResponse>> {
    let Json(request) = payload?;
    let response = ops::generate(&state.gateway, request).await?;
    Ok(Json(response))
}

/// Rank candidates against a query by cosine similarity.
///
/// # Example
/// ```json
/// // Request
/// {
///   "query": "machine learning basics",
///   "candidates": ["deep learning intro", "cooking recipes", "neural networks"],
///   "threshold": 0.5
/// }
///
/// // Response
/// {
///   "results": [
///     { "text": "deep learning intro", "index": 0, "score": 0.82 },
///     { "text": "neural networks", "index": 2, "score": 0.61 }
///   ],
///   "model": "sentence-transformers/all-MiniLM-L6-v2",
///   "threshold": 0.5
/// }
/// ```
pub async fn similarity(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<SimilarityRequest>, JsonRejection>,
) -> ServerResult<Json<SimilarityResponse>> {
    let Json(request) = payload?;
    let candidates = request.candidates.len();
    let response = ops::find_similar(&state.gateway, request).await?;

    tracing::debug!(
        candidates,
        matched = response.results.len(),
        threshold = response.threshold,
        "similarity ranked"
    );

    Ok(Json(response))
}
