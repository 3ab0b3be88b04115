use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the embedding gateway and its providers.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EmbeddingError {
    /// Malformed or missing request fields. Always a client error.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Two vectors of unequal length were compared.
    #[error("dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
    /// Cosine similarity was attempted on a zero-magnitude vector.
    #[error("degenerate vector: cosine similarity is undefined for a zero-magnitude vector")]
    DegenerateVector,
    /// The remote provider failed, answered with a non-success status, or sent
    /// a body that could not be parsed into a numeric vector.
    #[error("provider error: {message}")]
    Provider {
        message: String,
        /// HTTP status returned by the provider, when there was one.
        status: Option<u16>,
    },
    /// The remote call did not complete within its allotted time.
    #[error("provider timed out after {}ms", .0.as_millis())]
    ProviderTimeout(Duration),
    /// Configuration is inconsistent (e.g. missing credential).
    #[error("invalid embedding config: {0}")]
    InvalidConfig(String),
}

impl EmbeddingError {
    pub(crate) fn provider(message: impl Into<String>) -> Self {
        EmbeddingError::Provider {
            message: message.into(),
            status: None,
        }
    }

    pub(crate) fn provider_status(status: u16, message: impl Into<String>) -> Self {
        EmbeddingError::Provider {
            message: message.into(),
            status: Some(status),
        }
    }

    /// Whether a caller may retry the operation that produced this error.
    ///
    /// Timeouts, transport failures, 408, 429 and 5xx answers are transient.
    /// Other 4xx answers, unparseable bodies and every local validation error
    /// are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::ProviderTimeout(_) => true,
            EmbeddingError::Provider { status, message } => match status {
                Some(code) => *code == 408 || *code == 429 || (500..600).contains(code),
                None => !message.starts_with("invalid response"),
            },
            EmbeddingError::InvalidInput(_)
            | EmbeddingError::DimensionMismatch { .. }
            | EmbeddingError::DegenerateVector
            | EmbeddingError::InvalidConfig(_) => false,
        }
    }

    /// Stable machine-readable code for transports.
    pub fn code(&self) -> &'static str {
        match self {
            EmbeddingError::InvalidInput(_) => "INVALID_INPUT",
            EmbeddingError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            EmbeddingError::DegenerateVector => "DEGENERATE_VECTOR",
            EmbeddingError::Provider { .. } => "PROVIDER_ERROR",
            EmbeddingError::ProviderTimeout(_) => "PROVIDER_TIMEOUT",
            EmbeddingError::InvalidConfig(_) => "INVALID_CONFIG",
        }
    }
}
