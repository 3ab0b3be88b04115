//! Transport-agnostic request handling.
//!
//! The HTTP routes and the WebSocket channel both decode into these request
//! types and call the same functions, so validation and response shapes are
//! identical on either surface.

use embedding::{
    EmbeddingError, EmbeddingGateway, EmbeddingRequest, EmbeddingVector, SimilarityResult,
};
use serde::{Deserialize, Serialize};

/// `{ text?, texts? }`; exactly one must be set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub texts: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum GenerateResponse {
    Single {
        embedding: EmbeddingVector,
        model: String,
    },
    Batch {
        embeddings: Vec<EmbeddingVector>,
        model: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimilarityRequest {
    pub query: String,
    pub candidates: Vec<String>,
    #[serde(default)]
    pub threshold: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimilarityResponse {
    pub results: Vec<SimilarityResult>,
    pub model: String,
    /// Threshold actually applied (the default when the request omitted it).
    pub threshold: f32,
}

pub async fn generate(
    gateway: &EmbeddingGateway,
    request: GenerateRequest,
) -> Result<GenerateResponse, EmbeddingError> {
    let model = gateway.model().to_string();
    match EmbeddingRequest::from_parts(request.text, request.texts)? {
        EmbeddingRequest::Single(text) => Ok(GenerateResponse::Single {
            embedding: gateway.embed_one(&text).await?,
            model,
        }),
        EmbeddingRequest::Batch(texts) => Ok(GenerateResponse::Batch {
            embeddings: gateway.embed_many(&texts).await?,
            model,
        }),
    }
}

pub async fn find_similar(
    gateway: &EmbeddingGateway,
    request: SimilarityRequest,
) -> Result<SimilarityResponse, EmbeddingError> {
    let threshold = request
        .threshold
        .unwrap_or(gateway.config().default_threshold);
    let results = gateway
        .find_similar(&request.query, &request.candidates, Some(threshold))
        .await?;
    Ok(SimilarityResponse {
        results,
        model: gateway.model().to_string(),
        threshold,
    })
}
