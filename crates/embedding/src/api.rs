use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::provider::EmbeddingProvider;
use crate::{ApiFormat, EmbeddingError, EmbeddingVector, ProviderConfig};

/// Embedding provider backed by a remote HTTP API.
///
/// One instance owns one pooled `reqwest::Client`; clone-free sharing goes
/// through `Arc`. Every call is bounded by the configured timeout and surfaces
/// [`EmbeddingError::ProviderTimeout`] when it elapses.
#[derive(Clone)]
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    format: ApiFormat,
    timeout: Duration,
}

impl std::fmt::Debug for HttpEmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmbeddingProvider")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("format", &self.format)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpEmbeddingProvider {
    pub fn new(cfg: &ProviderConfig) -> Result<Self, EmbeddingError> {
        cfg.validate()?;
        let api_key = cfg
            .api_key
            .clone()
            .ok_or_else(|| EmbeddingError::InvalidConfig("api_key is required".into()))?;

        let client = reqwest::Client::builder()
            .connect_timeout(cfg.connect_timeout)
            .pool_max_idle_per_host(32)
            .build()
            .map_err(|e| EmbeddingError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: cfg.endpoint(),
            model: cfg.model.clone(),
            api_key,
            format: cfg.api_format,
            timeout: cfg.timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, payload: Value) -> Result<Value, EmbeddingError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::ProviderTimeout(self.timeout)
                } else {
                    EmbeddingError::provider(format!("HTTP request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::provider_status(
                status.as_u16(),
                format!("HTTP error {status}: {body}"),
            ));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| EmbeddingError::provider(format!("invalid response: {e}")))
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        let payload = build_payload(self.format, text, &self.model);
        tracing::debug!(endpoint = %self.endpoint, chars = text.len(), "requesting embedding");

        let response = tokio::time::timeout(self.timeout, self.send(payload))
            .await
            .map_err(|_| EmbeddingError::ProviderTimeout(self.timeout))??;

        let mut vectors = parse_embeddings_from_value(response)?;
        if vectors.len() != 1 {
            return Err(EmbeddingError::provider(format!(
                "invalid response: expected 1 embedding, got {}",
                vectors.len()
            )));
        }
        let vector = vectors.remove(0);
        if vector.is_empty() {
            return Err(EmbeddingError::provider(
                "invalid response: embedding is empty",
            ));
        }
        Ok(EmbeddingVector::new(vector))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn build_payload(format: ApiFormat, text: &str, model: &str) -> Value {
    match format {
        ApiFormat::HuggingFace => json!({ "inputs": text }),
        ApiFormat::OpenAi => json!({ "input": text, "model": model }),
        ApiFormat::Custom => json!({ "text": text }),
    }
}

/// Accepts the response shapes of the supported providers:
/// a bare vector, a list of vectors, `{"embedding": [...]}`,
/// `{"embeddings": [[...]]}` and OpenAI's `{"data": [{"embedding": [...]}]}`.
fn parse_embeddings_from_value(value: Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    match value {
        Value::Object(mut map) => {
            if let Some(embedding) = map.remove("embedding") {
                return parse_embedding_vector(embedding).map(|v| vec![v]);
            }

            if let Some(embeddings) = map.remove("embeddings") {
                return parse_embedding_collection(embeddings);
            }

            if let Some(Value::Array(items)) = map.remove("data") {
                let mut vectors = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Object(mut obj) => match obj.remove("embedding") {
                            Some(embedding) => vectors.push(parse_embedding_vector(embedding)?),
                            None => {
                                return Err(EmbeddingError::provider(
                                    "invalid response: missing `embedding` field in data item",
                                ))
                            }
                        },
                        _ => {
                            return Err(EmbeddingError::provider(
                                "invalid response: unexpected entry inside `data` array",
                            ))
                        }
                    }
                }
                return Ok(vectors);
            }

            if let Some(Value::String(message)) = map.remove("error") {
                return Err(EmbeddingError::provider(format!(
                    "invalid response: provider reported `{message}`"
                )));
            }

            Err(EmbeddingError::provider(
                "invalid response: unsupported response shape",
            ))
        }
        other => parse_embedding_collection(other),
    }
}

fn parse_embedding_collection(value: Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                Ok(Vec::new())
            } else if items.iter().all(|item| matches!(item, Value::Array(_))) {
                items.into_iter().map(parse_embedding_vector).collect()
            } else {
                parse_embedding_vector(Value::Array(items)).map(|vec| vec![vec])
            }
        }
        other => parse_embedding_vector(other).map(|vec| vec![vec]),
    }
}

fn parse_embedding_vector(value: Value) -> Result<Vec<f32>, EmbeddingError> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|entry| match entry {
                Value::Number(num) => num
                    .as_f64()
                    .map(|f| f as f32)
                    .filter(|f| f.is_finite())
                    .ok_or_else(|| {
                        EmbeddingError::provider("invalid response: non-finite embedding value")
                    }),
                other => Err(EmbeddingError::provider(format!(
                    "invalid response: embedding entries must be numbers, got {other}"
                ))),
            })
            .collect(),
        other => Err(EmbeddingError::provider(format!(
            "invalid response: embedding vector must be an array, got {other}"
        ))),
    }
}
