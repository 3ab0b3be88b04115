//! Workspace umbrella crate for embedgate.
//!
//! Re-exports the embedding core and adds file/environment configuration so
//! callers can build a ready [`EmbeddingGateway`] with a single call.

pub mod config;

pub use config::{ConfigLoadError, EmbedgateConfig, RetryYamlConfig};
pub use embedding::{
    ApiFormat, EmbeddingError, EmbeddingGateway, EmbeddingProvider, EmbeddingRequest,
    EmbeddingVector, GatewayConfig, HashEmbeddingProvider, HttpEmbeddingProvider, ProviderConfig,
    ProviderKind, RetryConfig, RetryingProvider, SimilarityResult, build_provider,
    cosine_similarity, rank_candidates,
};

/// Builds the provider described by `config` (wrapped in retry when enabled)
/// and the gateway around it.
pub fn build_gateway(config: &EmbedgateConfig) -> Result<EmbeddingGateway, EmbeddingError> {
    let provider = build_provider(&config.provider, config.retry_policy())?;
    tracing::info!(
        kind = ?config.provider.kind,
        model = %config.provider.model,
        max_concurrency = config.gateway.max_concurrency,
        retry = config.retry.enabled,
        "embedding gateway configured"
    );
    EmbeddingGateway::new(provider, config.gateway)
}
