//! Embedgate core
//!
//! Turns text into vectors through a remote embedding provider, scores
//! vectors with cosine similarity, and ranks candidate texts against a query.
//! Nothing here knows about HTTP routes or sockets; the server crate wraps
//! [`EmbeddingGateway`] in both transports.
//!
//! Providers:
//!
//! - [`HttpEmbeddingProvider`] - Hugging Face, OpenAI-compatible or custom JSON APIs.
//! - [`HashEmbeddingProvider`] - deterministic vectors for local work and tests.
//! - [`RetryingProvider`] - wraps either of the above with bounded backoff.
//!
//! ## Quick example
//!
//! ```no_run
//! use embedding::{build_provider, EmbeddingGateway, GatewayConfig, ProviderConfig, RetryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), embedding::EmbeddingError> {
//!     let provider_cfg = ProviderConfig {
//!         api_key: Some("hf_xxx".into()),
//!         ..Default::default()
//!     };
//!     let provider = build_provider(&provider_cfg, Some(RetryConfig::default()))?;
//!     let gateway = EmbeddingGateway::new(provider, GatewayConfig::default())?;
//!
//!     let candidates = vec!["deep learning intro".to_string(), "cooking recipes".to_string()];
//!     let ranked = gateway
//!         .find_similar("machine learning basics", &candidates, Some(0.5))
//!         .await?;
//!     for hit in ranked {
//!         println!("{:.3} {}", hit.score, hit.text);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod retry;
pub mod similarity;
pub mod types;

mod api;
mod gateway;
mod provider;
mod serde_millis;
mod stub;

pub use crate::api::HttpEmbeddingProvider;
pub use crate::config::{ApiFormat, GatewayConfig, ProviderConfig, ProviderKind};
pub use crate::error::EmbeddingError;
pub use crate::gateway::EmbeddingGateway;
pub use crate::provider::{build_provider, EmbeddingProvider, RetryingProvider};
pub use crate::retry::RetryConfig;
pub use crate::similarity::{cosine_similarity, rank_candidates};
pub use crate::stub::HashEmbeddingProvider;
pub use crate::types::{EmbeddingRequest, EmbeddingVector, SimilarityResult};
