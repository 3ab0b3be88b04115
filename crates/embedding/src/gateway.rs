use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

use crate::provider::EmbeddingProvider;
use crate::similarity::{cosine_similarity, rank_candidates, validate_threshold};
use crate::{EmbeddingError, EmbeddingVector, GatewayConfig, SimilarityResult};

/// Transport-agnostic embedding and similarity operations.
///
/// The gateway holds no per-request state. The only shared resource is a
/// semaphore with [`GatewayConfig::max_concurrency`] permits: every provider
/// call, from any request, holds one permit while in flight.
pub struct EmbeddingGateway {
    provider: Arc<dyn EmbeddingProvider>,
    config: GatewayConfig,
    permits: Arc<Semaphore>,
}

impl EmbeddingGateway {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        config: GatewayConfig,
    ) -> Result<Self, EmbeddingError> {
        config.validate()?;
        Ok(Self {
            provider,
            permits: Arc::new(Semaphore::new(config.max_concurrency)),
            config,
        })
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Provider calls that can start right now without waiting for a permit.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Embeds one text. The text must be non-empty after trimming.
    pub async fn embed_one(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        validate_text(text, None)?;
        self.call_provider(text).await
    }

    /// Embeds every text concurrently and returns the vectors in input order.
    ///
    /// At most `max_concurrency` calls of the batch run at once. The first
    /// failure fails the whole batch; the remaining in-flight calls are
    /// dropped and their results discarded.
    pub async fn embed_many(
        &self,
        texts: &[String],
    ) -> Result<Vec<EmbeddingVector>, EmbeddingError> {
        if texts.is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "texts must contain at least one entry".into(),
            ));
        }
        for (idx, text) in texts.iter().enumerate() {
            validate_text(text, Some(idx))?;
        }

        let started = Instant::now();
        let pending: Vec<_> = texts
            .iter()
            .enumerate()
            .map(|(idx, text)| async move { (idx, self.call_provider(text).await) })
            .collect();
        let mut calls = stream::iter(pending).buffer_unordered(self.config.max_concurrency);

        let mut slots: Vec<Option<EmbeddingVector>> = vec![None; texts.len()];
        while let Some((idx, result)) = calls.next().await {
            match result {
                Ok(vector) => slots[idx] = Some(vector),
                Err(err) => {
                    tracing::debug!(index = idx, error = %err, "batch embedding failed");
                    return Err(err);
                }
            }
        }

        tracing::debug!(
            count = texts.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch embedded"
        );

        slots
            .into_iter()
            .enumerate()
            .map(|(idx, slot)| {
                slot.ok_or_else(|| {
                    EmbeddingError::provider(format!("no embedding produced for text {idx}"))
                })
            })
            .collect()
    }

    /// Cosine similarity between two vectors.
    pub fn similarity(a: &EmbeddingVector, b: &EmbeddingVector) -> Result<f32, EmbeddingError> {
        cosine_similarity(a.as_slice(), b.as_slice())
    }

    /// Ranks `candidates` against `query`.
    ///
    /// `threshold` defaults to [`GatewayConfig::default_threshold`]. Only
    /// candidates scoring at least `threshold` are returned, sorted by
    /// descending score with ties in candidate order. An empty result is not
    /// an error.
    pub async fn find_similar(
        &self,
        query: &str,
        candidates: &[String],
        threshold: Option<f32>,
    ) -> Result<Vec<SimilarityResult>, EmbeddingError> {
        let threshold = threshold.unwrap_or(self.config.default_threshold);
        validate_threshold(threshold)?;
        if candidates.is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "candidates must contain at least one entry".into(),
            ));
        }

        let (query_vector, candidate_vectors) =
            tokio::try_join!(self.embed_one(query), self.embed_many(candidates))?;

        let results = rank_candidates(&query_vector, candidates, &candidate_vectors, threshold)?;
        tracing::debug!(
            candidates = candidates.len(),
            matched = results.len(),
            threshold,
            "ranked candidates"
        );
        Ok(results)
    }

    async fn call_provider(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| EmbeddingError::provider("gateway is shutting down"))?;
        self.provider.embed(text).await
    }
}

fn validate_text(text: &str, index: Option<usize>) -> Result<(), EmbeddingError> {
    if !text.trim().is_empty() {
        return Ok(());
    }
    Err(EmbeddingError::InvalidInput(match index {
        Some(idx) => format!("texts[{idx}] must not be empty"),
        None => "text must not be empty".into(),
    }))
}
