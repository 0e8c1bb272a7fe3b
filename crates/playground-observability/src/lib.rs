// Observability for playground tasks
//
// Key design decisions:
// - Tasks emit a small set of high-level events (trace start/end, LLM generation)
// - Backends translate them to provider formats behind the ObservabilityBackend trait
// - Langfuse is reached over its HTTP ingestion API, batched
// - When nothing is configured the NoopBackend swallows everything

pub mod backend;
pub mod config;
pub mod langfuse;

use std::sync::Arc;

// Re-exports
pub use backend::{NoopBackend, ObservabilityBackend, ObservabilityError, ObservabilityEvent};
pub use config::{LangfuseConfig, ObservabilityConfig};
pub use langfuse::LangfuseBackend;

/// Backend for `config`: Langfuse when enabled and configured, no-op otherwise
pub fn create_backend(
    config: &ObservabilityConfig,
) -> Result<Arc<dyn ObservabilityBackend>, ObservabilityError> {
    match (&config.langfuse, config.is_enabled()) {
        (Some(langfuse), true) => {
            tracing::info!(host = %langfuse.host, "Langfuse observability enabled");
            Ok(Arc::new(LangfuseBackend::new(langfuse.clone())?))
        }
        _ => {
            tracing::debug!("Observability disabled");
            Ok(Arc::new(NoopBackend))
        }
    }
}
