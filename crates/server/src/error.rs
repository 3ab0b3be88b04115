use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use embedding::EmbeddingError;
use serde::{Deserialize, Serialize};

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found")]
    NotFound,

    #[error("Request did not complete within the server timeout")]
    RequestTimeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// API error response body: `{ "error": <message>, "code": <CODE> }`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Embedding(err) => match err {
                EmbeddingError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                // Clients send text, so bad vectors always come from the provider.
                EmbeddingError::DimensionMismatch { .. } | EmbeddingError::DegenerateVector => {
                    StatusCode::BAD_GATEWAY
                }
                EmbeddingError::ProviderTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
                EmbeddingError::Provider { .. } | EmbeddingError::InvalidConfig(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ServerError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            ServerError::Config(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ServerError::Embedding(err) => err.code(),
            ServerError::Config(_) => "CONFIG_ERROR",
            ServerError::NotFound => "NOT_FOUND",
            ServerError::RequestTimeout => "REQUEST_TIMEOUT",
            ServerError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: self.error_code().to_string(),
        });

        (status, body).into_response()
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ServerError::PayloadTooLarge;
        }
        ServerError::BadRequest(rejection.body_text())
    }
}

impl From<embedgate::ConfigLoadError> for ServerError {
    fn from(err: embedgate::ConfigLoadError) -> Self {
        ServerError::Config(err.to_string())
    }
}
