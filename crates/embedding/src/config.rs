use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::EmbeddingError;

/// Default endpoint template. `{model}` is replaced by [`ProviderConfig::model`].
pub const DEFAULT_ENDPOINT: &str =
    "https://router.huggingface.co/hf-inference/models/{model}/pipeline/feature-extraction";

/// 384-dimension sentence-embedding model served by the default endpoint.
pub const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Which provider implementation the gateway is built with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Remote HTTP embedding API.
    #[default]
    Http,
    /// Deterministic hash-derived vectors. Local development and tests only.
    Stub,
}

/// Request/response shape spoken by the remote provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiFormat {
    /// Hugging Face feature-extraction pipeline: `{"inputs": text}`.
    #[default]
    #[serde(alias = "hf")]
    HuggingFace,
    /// OpenAI-compatible embeddings endpoint: `{"input": text, "model": ...}`.
    #[serde(rename = "openai", alias = "open_ai")]
    OpenAi,
    /// Plain `{"text": text}` payload.
    Custom,
}

/// Remote embedding provider settings.
///
/// # Example
/// ```
/// use embedding::{ApiFormat, ProviderConfig};
///
/// let cfg = ProviderConfig {
///     api_key: Some("hf_xxx".into()),
///     api_format: ApiFormat::HuggingFace,
///     ..Default::default()
/// };
/// assert!(cfg.validate().is_ok());
/// assert!(cfg.endpoint().contains("all-MiniLM-L6-v2"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// Endpoint URL. A `{model}` placeholder is substituted with [`model`](Self::model).
    pub base_url: String,
    /// Model identifier, reported back to callers on every response.
    pub model: String,
    /// Credential sent as `Authorization: Bearer <api_key>`. Required for `http`.
    pub api_key: Option<String>,
    pub api_format: ApiFormat,
    /// Upper bound on the wall-clock time of one provider call.
    #[serde(with = "crate::serde_millis")]
    pub timeout: Duration,
    #[serde(with = "crate::serde_millis")]
    pub connect_timeout: Duration,
    /// Vector length produced by the `stub` provider.
    pub stub_dimension: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Http,
            base_url: DEFAULT_ENDPOINT.into(),
            model: DEFAULT_MODEL.into(),
            api_key: None,
            api_format: ApiFormat::HuggingFace,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            stub_dimension: 384,
        }
    }
}

impl ProviderConfig {
    /// Resolved endpoint URL.
    pub fn endpoint(&self) -> String {
        self.base_url.replace("{model}", &self.model)
    }

    /// Rejects configurations that cannot produce a working provider.
    /// A missing credential for the `http` kind fails here rather than at the first call.
    pub fn validate(&self) -> Result<(), EmbeddingError> {
        if self.model.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig("model must not be empty".into()));
        }
        match self.kind {
            ProviderKind::Http => {
                if self.base_url.trim().is_empty() {
                    return Err(EmbeddingError::InvalidConfig(
                        "base_url is required for the http provider".into(),
                    ));
                }
                if self
                    .api_key
                    .as_deref()
                    .map_or(true, |key| key.trim().is_empty())
                {
                    return Err(EmbeddingError::InvalidConfig(
                        "api_key is required for the http provider".into(),
                    ));
                }
                if self.timeout.is_zero() {
                    return Err(EmbeddingError::InvalidConfig(
                        "timeout must be greater than zero".into(),
                    ));
                }
            }
            ProviderKind::Stub => {
                if self.stub_dimension == 0 {
                    return Err(EmbeddingError::InvalidConfig(
                        "stub_dimension must be >= 1".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Gateway-level knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Maximum simultaneous provider calls, both within one batch and across
    /// every request sharing the gateway.
    ///
    /// A permit covers the whole retried call, backoff sleeps included, so a
    /// degraded provider lowers the effective throughput.
    pub max_concurrency: usize,
    /// Threshold used by `find_similar` when the caller does not pass one.
    pub default_threshold: f32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 16,
            default_threshold: 0.7,
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<(), EmbeddingError> {
        if self.max_concurrency == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "max_concurrency must be >= 1".into(),
            ));
        }
        if !self.default_threshold.is_finite() || !(-1.0..=1.0).contains(&self.default_threshold)
        {
            return Err(EmbeddingError::InvalidConfig(
                "default_threshold must be within [-1, 1]".into(),
            ));
        }
        Ok(())
    }
}
