// Process-wide application context
//
// Initialization order: telemetry backend, then the OpenAI client. The CPU
// pool is created on first use. Binaries build one AppContext, hand out
// references, and call `shutdown` once on the way out.

use playground_observability::{create_backend, NoopBackend, ObservabilityBackend, ObservabilityConfig};
use playground_openai::{OpenAiClient, OpenAiError};
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

use crate::error::WorkerError;
use crate::pool::{default_pool_size, CpuPool};

pub struct AppContext {
    observability: Arc<dyn ObservabilityBackend>,
    openai: Option<OpenAiClient>,
    cpu_pool: OnceLock<CpuPool>,
    cpu_pool_size: usize,
}

impl AppContext {
    /// Build the context from environment variables
    pub fn init() -> Result<Self, WorkerError> {
        let observability = create_backend(&ObservabilityConfig::from_env())?;
        info!(backend = observability.name(), "Telemetry initialized");

        let openai = match OpenAiClient::from_env() {
            Ok(client) => {
                info!(base_url = %client.base_url(), "OpenAI client initialized");
                Some(client)
            }
            Err(OpenAiError::MissingApiKey) => {
                warn!("OPENAI_API_KEY not set, chat-otel cannot be hosted");
                None
            }
            Err(e) => {
                warn!(error = %e, "OpenAI client unavailable");
                None
            }
        };

        Ok(Self::new(observability, openai))
    }

    pub fn new(observability: Arc<dyn ObservabilityBackend>, openai: Option<OpenAiClient>) -> Self {
        Self {
            observability,
            openai,
            cpu_pool: OnceLock::new(),
            cpu_pool_size: default_pool_size(),
        }
    }

    /// Context with telemetry disabled and no OpenAI client
    pub fn detached() -> Self {
        Self::new(Arc::new(NoopBackend), None)
    }

    pub fn with_cpu_pool_size(mut self, size: usize) -> Self {
        self.cpu_pool_size = size.max(1);
        self
    }

    pub fn observability(&self) -> Arc<dyn ObservabilityBackend> {
        self.observability.clone()
    }

    pub fn openai(&self) -> Result<OpenAiClient, WorkerError> {
        self.openai.clone().ok_or(WorkerError::MissingOpenAiKey)
    }

    /// Process-wide CPU pool, created on first call
    pub fn cpu_pool(&self) -> CpuPool {
        self.cpu_pool
            .get_or_init(|| CpuPool::new(self.cpu_pool_size))
            .clone()
    }

    /// Teardown hook: flush telemetry, close the CPU pool
    pub async fn shutdown(&self) {
        if let Err(e) = self.observability.shutdown().await {
            warn!(error = %e, "Failed to flush telemetry on shutdown");
        }
        if let Some(pool) = self.cpu_pool.get() {
            pool.close();
        }
        info!("Application context shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_pool_is_created_once() {
        let ctx = AppContext::detached().with_cpu_pool_size(3);
        let first = ctx.cpu_pool();
        let second = ctx.cpu_pool();
        assert_eq!(first.size(), 3);
        first.close();
        assert!(second.is_closed());
    }

    #[test]
    fn test_missing_openai_client() {
        assert!(matches!(
            AppContext::detached().openai(),
            Err(WorkerError::MissingOpenAiKey)
        ));
    }

    #[tokio::test]
    async fn test_shutdown_closes_pool() {
        let ctx = AppContext::detached();
        let pool = ctx.cpu_pool();
        ctx.shutdown().await;
        assert!(pool.is_closed());
    }
}
