use serde::{Deserialize, Serialize};

use crate::EmbeddingError;

/// Dense embedding produced by the provider for exactly one input text.
///
/// The values are fixed once constructed; there is no mutable access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Number of components.
    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl From<Vec<f32>> for EmbeddingVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

impl AsRef<[f32]> for EmbeddingVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

/// One ranked candidate returned by `find_similar`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    /// Candidate text as supplied by the caller.
    pub text: String,
    /// Position of the candidate in the input batch.
    pub index: usize,
    /// Cosine similarity against the query, in [-1, 1].
    pub score: f32,
}

/// Embedding work requested by a transport: one text or an ordered batch.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingRequest {
    Single(String),
    Batch(Vec<String>),
}

impl EmbeddingRequest {
    /// Builds a request from the `{ text?, texts? }` envelope both transports use.
    /// Exactly one of the two must be present.
    pub fn from_parts(
        text: Option<String>,
        texts: Option<Vec<String>>,
    ) -> Result<Self, EmbeddingError> {
        match (text, texts) {
            (Some(text), None) => Ok(EmbeddingRequest::Single(text)),
            (None, Some(texts)) => Ok(EmbeddingRequest::Batch(texts)),
            (Some(_), Some(_)) => Err(EmbeddingError::InvalidInput(
                "provide either `text` or `texts`, not both".into(),
            )),
            (None, None) => Err(EmbeddingError::InvalidInput(
                "either `text` or `texts` is required".into(),
            )),
        }
    }

    /// Number of texts the request will embed.
    pub fn len(&self) -> usize {
        match self {
            EmbeddingRequest::Single(_) => 1,
            EmbeddingRequest::Batch(texts) => texts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
