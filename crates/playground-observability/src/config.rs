// Observability Configuration
//
// Configuration for observability backends, loaded from environment variables.

use std::env;

pub const DEFAULT_LANGFUSE_HOST: &str = "https://cloud.langfuse.com";
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

/// Configuration for observability integrations
#[derive(Debug, Clone, Default)]
pub struct ObservabilityConfig {
    /// Whether observability is enabled globally
    pub enabled: bool,

    /// Langfuse-specific configuration
    pub langfuse: Option<LangfuseConfig>,
}

impl ObservabilityConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `OBSERVABILITY_ENABLED`: Enable/disable observability (default: true if any backend configured)
    /// - `LANGFUSE_PUBLIC_KEY`: Langfuse public key (pk-lf-...)
    /// - `LANGFUSE_SECRET_KEY`: Langfuse secret key (sk-lf-...)
    /// - `LANGFUSE_HOST`: Langfuse host (default: https://cloud.langfuse.com)
    /// - `LANGFUSE_RELEASE`: Application release/version tag
    /// - `LANGFUSE_MAX_BATCH_SIZE`: Events buffered before a forced flush (default: 100)
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let langfuse = LangfuseConfig::from_vars(&lookup);

        // Default enabled if any backend is configured
        let default_enabled = langfuse.is_some();
        let enabled = lookup("OBSERVABILITY_ENABLED")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(default_enabled);

        Self { enabled, langfuse }
    }

    /// Check if any observability backend is configured and enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled && self.langfuse.is_some()
    }
}

/// Langfuse-specific configuration
#[derive(Clone)]
pub struct LangfuseConfig {
    /// Langfuse public key (pk-lf-...)
    pub public_key: String,

    /// Langfuse secret key (sk-lf-...)
    pub secret_key: String,

    /// Langfuse host (e.g., https://cloud.langfuse.com)
    pub host: String,

    /// Application release/version tag
    pub release: Option<String>,

    /// Maximum batch size before forced flush
    pub max_batch_size: usize,
}

impl std::fmt::Debug for LangfuseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LangfuseConfig")
            .field("public_key", &self.public_key)
            .field("secret_key", &"<redacted>")
            .field("host", &self.host)
            .field("release", &self.release)
            .field("max_batch_size", &self.max_batch_size)
            .finish()
    }
}

impl LangfuseConfig {
    pub fn new(public_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            secret_key: secret_key.into(),
            host: DEFAULT_LANGFUSE_HOST.to_string(),
            release: None,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Returns None if required variables are not set.
    pub fn from_env() -> Option<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let public_key = lookup("LANGFUSE_PUBLIC_KEY")?;
        let secret_key = lookup("LANGFUSE_SECRET_KEY")?;

        // Must have both keys
        if public_key.is_empty() || secret_key.is_empty() {
            return None;
        }

        let host = lookup("LANGFUSE_HOST").unwrap_or_else(|| DEFAULT_LANGFUSE_HOST.to_string());

        let max_batch_size = lookup("LANGFUSE_MAX_BATCH_SIZE")
            .and_then(|v| v.parse().ok())
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_MAX_BATCH_SIZE);

        Some(Self {
            public_key,
            secret_key,
            host,
            release: lookup("LANGFUSE_RELEASE"),
            max_batch_size,
        })
    }

    pub fn ingestion_endpoint(&self) -> String {
        format!("{}/api/public/ingestion", self.host.trim_end_matches('/'))
    }

    /// Generate the Basic Auth header value
    pub fn auth_header(&self) -> String {
        use base64::Engine;
        let credentials = format!("{}:{}", self.public_key, self.secret_key);
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        format!("Basic {}", encoded)
    }
}
