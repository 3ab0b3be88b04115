use async_trait::async_trait;
use fxhash::hash64;

use crate::provider::EmbeddingProvider;
use crate::{EmbeddingError, EmbeddingVector};

/// Deterministic provider for local development and tests.
///
/// Generates sinusoid values derived from a hash of the input text, so equal
/// texts always map to equal vectors and no network is touched.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    model: String,
    dimension: usize,
}

impl HashEmbeddingProvider {
    pub fn new(model: impl Into<String>, dimension: usize) -> Self {
        Self {
            model: model.into(),
            dimension: dimension.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

pub(crate) fn hash_vector(text: &str, dimension: usize) -> Vec<f32> {
    let h = hash64(text.as_bytes());
    (0..dimension)
        .map(|idx| ((h >> (idx % 32)) as f32 * 0.0001).sin())
        .collect()
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        Ok(EmbeddingVector::new(hash_vector(text, self.dimension)))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
