use async_trait::async_trait;
use std::sync::Arc;

use crate::api::HttpEmbeddingProvider;
use crate::retry::{execute_with_retry, RetryConfig};
use crate::stub::HashEmbeddingProvider;
use crate::{EmbeddingError, EmbeddingVector, ProviderConfig, ProviderKind};

/// Source of embeddings for one text at a time.
///
/// Implementations perform at most one logical remote call per `embed` and
/// never retry on their own; wrap them in [`RetryingProvider`] for that.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a single, already validated text.
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError>;

    /// Model identifier reported to callers.
    fn model(&self) -> &str;
}

#[async_trait]
impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for Arc<P> {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        (**self).embed(text).await
    }

    fn model(&self) -> &str {
        (**self).model()
    }
}

/// Decorator adding bounded retry with backoff around another provider.
pub struct RetryingProvider<P> {
    inner: P,
    config: RetryConfig,
}

impl<P: EmbeddingProvider> RetryingProvider<P> {
    pub fn new(inner: P, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: EmbeddingProvider> EmbeddingProvider for RetryingProvider<P> {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        let outcome = execute_with_retry(&self.config, |_| self.inner.embed(text)).await;
        if outcome.attempts > 1 {
            tracing::debug!(
                attempts = outcome.attempts,
                elapsed_ms = outcome.total_duration.as_millis() as u64,
                succeeded = outcome.succeeded(),
                "provider call finished after retries"
            );
        }
        outcome.into_result()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}

/// Builds the provider selected by `cfg`, optionally wrapped in a retry decorator.
pub fn build_provider(
    cfg: &ProviderConfig,
    retry: Option<RetryConfig>,
) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    cfg.validate()?;
    let provider: Arc<dyn EmbeddingProvider> = match (cfg.kind, retry) {
        (ProviderKind::Http, Some(retry)) => Arc::new(RetryingProvider::new(
            HttpEmbeddingProvider::new(cfg)?,
            retry,
        )),
        (ProviderKind::Http, None) => Arc::new(HttpEmbeddingProvider::new(cfg)?),
        // The stub never fails transiently, so retry would be a no-op.
        (ProviderKind::Stub, _) => Arc::new(HashEmbeddingProvider::new(
            cfg.model.clone(),
            cfg.stub_dimension,
        )),
    };
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct Flaky {
        failures_left: AtomicU32,
        calls: AtomicU32,
        error: EmbeddingError,
    }

    #[async_trait]
    impl EmbeddingProvider for Flaky {
        async fn embed(&self, _text: &str) -> Result<EmbeddingVector, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(self.error.clone());
            }
            Ok(EmbeddingVector::new(vec![1.0, 0.0]))
        }

        fn model(&self) -> &str {
            "flaky"
        }
    }

    fn retry_cfg() -> RetryConfig {
        RetryConfig::default()
            .with_max_retries(3)
            .with_base_delay(Duration::from_millis(1))
            .with_jitter(false)
    }

    #[tokio::test]
    async fn retrying_provider_recovers_from_transient_errors() {
        let provider = RetryingProvider::new(
            Flaky {
                failures_left: AtomicU32::new(2),
                calls: AtomicU32::new(0),
                error: EmbeddingError::ProviderTimeout(Duration::from_millis(1)),
            },
            retry_cfg(),
        );

        let v = provider.embed("hello").await.unwrap();
        assert_eq!(v.as_slice(), &[1.0, 0.0]);
        assert_eq!(provider.inner().calls.load(Ordering::SeqCst), 3);
        assert_eq!(provider.model(), "flaky");
    }

    #[tokio::test]
    async fn retrying_provider_does_not_retry_client_errors() {
        let provider = RetryingProvider::new(
            Flaky {
                failures_left: AtomicU32::new(1),
                calls: AtomicU32::new(0),
                error: EmbeddingError::provider_status(403, "forbidden"),
            },
            retry_cfg(),
        );

        let err = provider.embed("hello").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Provider { status: Some(403), .. }));
        assert_eq!(provider.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn build_provider_stub_kind() {
        let cfg = ProviderConfig {
            kind: ProviderKind::Stub,
            model: "stub-model".into(),
            stub_dimension: 8,
            ..Default::default()
        };
        let provider = build_provider(&cfg, Some(RetryConfig::default())).unwrap();
        assert_eq!(provider.model(), "stub-model");
        assert_eq!(provider.embed("text").await.unwrap().dimension(), 8);
    }

    #[test]
    fn build_provider_fails_fast_without_credential() {
        let err = build_provider(&ProviderConfig::default(), None)
            .err()
            .expect("missing api key must be rejected");
        assert!(matches!(err, EmbeddingError::InvalidConfig(_)));
    }
}
