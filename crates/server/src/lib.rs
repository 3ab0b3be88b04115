//! embedgate server - HTTP and WebSocket API for the embedding gateway
//!
//! Both surfaces are thin adapters over the same operations in [`ops`]:
//! request validation, error mapping and response shapes are shared.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe (`{ status: "OK", timestamp, model }`)
//! - `GET /ready` - Readiness probe
//! - `POST /embeddings/generate` - `{ text }` or `{ texts }` to embeddings
//! - `POST /embeddings/similarity` - rank `candidates` against `query`
//! - `GET /ws` - WebSocket channel carrying the same two operations
//!
//! Errors are returned as `{ "error": <message>, "code": <CODE> }`.

pub mod config;
pub mod error;
pub mod middleware;
pub mod ops;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
