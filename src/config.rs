//! YAML Configuration File Support for embedgate
//!
//! Loads provider, gateway and retry settings from a single YAML file, with
//! environment variables layered on top. A deployment that keeps the
//! credential out of the file sets `EMBEDGATE_API_KEY` instead.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "production"
//!
//! provider:
//!   kind: "http"
//!   base_url: "https://router.huggingface.co/hf-inference/models/{model}/pipeline/feature-extraction"
//!   model: "sentence-transformers/all-MiniLM-L6-v2"
//!   api_format: "huggingface"
//!   timeout: 30000          # ms
//!   connect_timeout: 10000  # ms
//!
//! gateway:
//!   max_concurrency: 16
//!   default_threshold: 0.7
//!
//! retry:
//!   enabled: true
//!   max_retries: 3
//!   base_delay_ms: 100
//!   max_delay_ms: 10000
//!   jitter: true
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use embedding::{ApiFormat, EmbeddingError, GatewayConfig, ProviderConfig, ProviderKind, RetryConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_PROVIDER_URL: &str = "EMBEDGATE_PROVIDER_URL";
pub const ENV_MODEL: &str = "EMBEDGATE_MODEL";
pub const ENV_API_KEY: &str = "EMBEDGATE_API_KEY";
pub const ENV_PROVIDER_KIND: &str = "EMBEDGATE_PROVIDER_KIND";
pub const ENV_API_FORMAT: &str = "EMBEDGATE_API_FORMAT";
pub const ENV_TIMEOUT_MS: &str = "EMBEDGATE_TIMEOUT_MS";
pub const ENV_MAX_CONCURRENCY: &str = "EMBEDGATE_MAX_CONCURRENCY";

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

/// Top-level configuration for an embedgate deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EmbedgateConfig {
    /// Configuration format version
    pub version: String,

    /// Optional configuration name/description
    #[serde(default)]
    pub name: Option<String>,

    /// Remote embedding provider
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Concurrency bound and default ranking threshold
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Retry policy applied around the provider
    #[serde(default)]
    pub retry: RetryYamlConfig,
}

impl EmbedgateConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: EmbedgateConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from the process environment alone.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        Self::load(None::<&Path>)
    }

    /// Like [`from_env`](Self::from_env) with an injectable variable lookup.
    pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::load_with(None::<&Path>, lookup)
    }

    /// Reads the YAML file at `path` (or starts from defaults), applies
    /// environment overrides, then validates the result.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self, ConfigLoadError> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    pub fn load_with<P, F>(path: Option<P>, lookup: F) -> Result<Self, ConfigLoadError>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => serde_yaml::from_str(&fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlays `EMBEDGATE_*` variables. Blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(url) = get(ENV_PROVIDER_URL) {
            self.provider.base_url = url;
        }
        if let Some(model) = get(ENV_MODEL) {
            self.provider.model = model;
        }
        if let Some(key) = get(ENV_API_KEY) {
            self.provider.api_key = Some(key);
        }
        if let Some(kind) = get(ENV_PROVIDER_KIND) {
            self.provider.kind = parse_kind(&kind)?;
        }
        if let Some(format) = get(ENV_API_FORMAT) {
            self.provider.api_format = parse_format(&format)?;
        }
        if let Some(ms) = get(ENV_TIMEOUT_MS) {
            let ms: u64 = ms.trim().parse().map_err(|_| ConfigLoadError::InvalidEnv {
                name: ENV_TIMEOUT_MS,
                value: ms.clone(),
            })?;
            self.provider.timeout = Duration::from_millis(ms);
        }
        if let Some(n) = get(ENV_MAX_CONCURRENCY) {
            self.gateway.max_concurrency =
                n.trim().parse().map_err(|_| ConfigLoadError::InvalidEnv {
                    name: ENV_MAX_CONCURRENCY,
                    value: n.clone(),
                })?;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.provider.validate()?;
        self.gateway.validate()?;
        self.retry.validate()?;

        Ok(())
    }

    /// Retry policy to wrap the provider in, or `None` when retry is disabled.
    pub fn retry_policy(&self) -> Option<RetryConfig> {
        self.retry.enabled.then(|| self.retry.to_retry_config())
    }

    /// Longest one provider call can take, retries included. The stub
    /// provider never waits, so its budget is zero.
    pub fn provider_budget(&self) -> Duration {
        match self.provider.kind {
            ProviderKind::Stub => Duration::ZERO,
            ProviderKind::Http => match self.retry_policy() {
                Some(policy) => policy.worst_case(self.provider.timeout),
                None => self.provider.timeout,
            },
        }
    }
}

impl Default for EmbedgateConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            provider: ProviderConfig::default(),
            gateway: GatewayConfig::default(),
            retry: RetryYamlConfig::default(),
        }
    }
}

/// Retry YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryYamlConfig {
    #[serde(default = "true_value")]
    pub enabled: bool,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "true_value")]
    pub jitter: bool,
}

impl RetryYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.max_delay_ms < self.base_delay_ms {
            return Err(ConfigLoadError::Validation(
                "retry.max_delay_ms must be >= retry.base_delay_ms".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig::default()
            .with_max_retries(self.max_retries)
            .with_base_delay(Duration::from_millis(self.base_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_jitter(self.jitter)
    }
}

impl Default for RetryYamlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: true,
        }
    }
}

fn parse_kind(value: &str) -> Result<ProviderKind, ConfigLoadError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "http" => Ok(ProviderKind::Http),
        "stub" => Ok(ProviderKind::Stub),
        _ => Err(ConfigLoadError::InvalidEnv {
            name: ENV_PROVIDER_KIND,
            value: value.to_string(),
        }),
    }
}

fn parse_format(value: &str) -> Result<ApiFormat, ConfigLoadError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "huggingface" | "hf" => Ok(ApiFormat::HuggingFace),
        "openai" | "open_ai" => Ok(ApiFormat::OpenAi),
        "custom" => Ok(ApiFormat::Custom),
        _ => Err(ConfigLoadError::InvalidEnv {
            name: ENV_API_FORMAT,
            value: value.to_string(),
        }),
    }
}

// Helper functions for serde defaults
fn true_value() -> bool {
    true
}
fn default_max_retries() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    100
}
fn default_max_delay_ms() -> u64 {
    10_000
}
