use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use embedgate::{build_gateway, EmbedgateConfig};
use embedding::EmbeddingGateway;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Embedding gateway shared by the HTTP routes and every channel session
    pub gateway: Arc<EmbeddingGateway>,

    /// Provider kind reported by `/ready` (`http` or `stub`)
    pub provider_kind: &'static str,

    pub started_at: Instant,
}

impl ServerState {
    /// Builds the gateway from `config.gateway_config`, or from the
    /// environment when no file is configured.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let gateway_config = EmbedgateConfig::load(config.gateway_config.as_deref())?;
        Self::from_gateway_config(config, &gateway_config)
    }

    /// Builds the gateway from an already loaded gateway config.
    ///
    /// The request timeout must leave room for at least one full provider
    /// call, otherwise a slow provider would surface as a request timeout
    /// instead of `PROVIDER_TIMEOUT`.
    pub fn from_gateway_config(
        config: ServerConfig,
        gateway_config: &EmbedgateConfig,
    ) -> ServerResult<Self> {
        let route_timeout = config.timeout();
        if gateway_config.provider.kind == embedding::ProviderKind::Http {
            if route_timeout < gateway_config.provider.timeout {
                return Err(ServerError::Config(format!(
                    "timeout_secs ({}s) is shorter than the provider timeout ({}ms)",
                    config.timeout_secs,
                    gateway_config.provider.timeout.as_millis()
                )));
            }
            let budget = gateway_config.provider_budget();
            if route_timeout < budget {
                tracing::warn!(
                    timeout_secs = config.timeout_secs,
                    provider_budget_ms = budget.as_millis() as u64,
                    "request timeout is shorter than the provider retry budget"
                );
            }
        }

        let gateway = build_gateway(gateway_config)?;
        let provider_kind = match gateway_config.provider.kind {
            embedding::ProviderKind::Http => "http",
            embedding::ProviderKind::Stub => "stub",
        };

        Ok(Self::with_gateway(config, Arc::new(gateway), provider_kind))
    }

    /// State around an already constructed gateway.
    pub fn with_gateway(
        config: ServerConfig,
        gateway: Arc<EmbeddingGateway>,
        provider_kind: &'static str,
    ) -> Self {
        Self {
            config: Arc::new(config),
            gateway,
            provider_kind,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
