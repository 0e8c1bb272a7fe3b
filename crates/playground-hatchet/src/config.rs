// Hatchet client configuration
//
// Loaded from the HATCHET_CLIENT_* environment variables. The API token is a
// JWT whose claims carry the tenant id (`sub`) and the API server URL
// (`server_url`); explicit variables override both.

use base64::Engine;
use serde::Deserialize;
use std::env;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_EVENT_POLL_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid API token: {0}")]
    InvalidToken(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: &'static str, message: String },
}

/// Claims the platform embeds in API tokens
#[derive(Debug, Deserialize)]
struct TokenClaims {
    sub: Option<String>,
    server_url: Option<String>,
}

/// Connection settings for the Hatchet REST API
#[derive(Clone)]
pub struct HatchetConfig {
    /// Bearer token sent on every request
    pub token: String,
    /// API base URL, without trailing slash
    pub server_url: String,
    pub tenant_id: String,
    /// Prefix applied to task names
    pub namespace: Option<String>,
    /// Interval between task-event polls while subscribed
    pub event_poll_interval: Duration,
}

impl std::fmt::Debug for HatchetConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HatchetConfig")
            .field("token", &"<redacted>")
            .field("server_url", &self.server_url)
            .field("tenant_id", &self.tenant_id)
            .field("namespace", &self.namespace)
            .field("event_poll_interval", &self.event_poll_interval)
            .finish()
    }
}

impl HatchetConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `HATCHET_CLIENT_TOKEN`: API token (required)
    /// - `HATCHET_CLIENT_SERVER_URL`: API URL (default: token's `server_url` claim)
    /// - `HATCHET_CLIENT_TENANT_ID`: tenant (default: token's `sub` claim)
    /// - `HATCHET_CLIENT_NAMESPACE`: task name prefix (default: none)
    /// - `HATCHET_CLIENT_EVENT_POLL_INTERVAL_MS`: event poll interval (default: 1000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let token = var("HATCHET_CLIENT_TOKEN").ok_or(ConfigError::MissingVar("HATCHET_CLIENT_TOKEN"))?;

        let server_url = var("HATCHET_CLIENT_SERVER_URL");
        let tenant_id = var("HATCHET_CLIENT_TENANT_ID");

        // Only decode the token when something is missing
        let (server_url, tenant_id) = match (server_url, tenant_id) {
            (Some(url), Some(tenant)) => (url, tenant),
            (url, tenant) => {
                let claims = decode_claims(&token)?;
                let url = url.or(claims.server_url).ok_or(ConfigError::MissingVar(
                    "HATCHET_CLIENT_SERVER_URL",
                ))?;
                let tenant = tenant
                    .or(claims.sub)
                    .ok_or(ConfigError::MissingVar("HATCHET_CLIENT_TENANT_ID"))?;
                (url, tenant)
            }
        };

        let event_poll_interval_ms = match var("HATCHET_CLIENT_EVENT_POLL_INTERVAL_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    var: "HATCHET_CLIENT_EVENT_POLL_INTERVAL_MS",
                    message: format!("expected a positive integer, got '{}'", raw),
                })?,
            None => DEFAULT_EVENT_POLL_INTERVAL_MS,
        };

        Ok(Self {
            token,
            server_url: server_url.trim_end_matches('/').to_string(),
            tenant_id,
            namespace: var("HATCHET_CLIENT_NAMESPACE"),
            event_poll_interval: Duration::from_millis(event_poll_interval_ms),
        })
    }

    /// Task name as registered on the platform
    pub fn namespaced(&self, task_name: &str) -> String {
        match &self.namespace {
            Some(ns) if !task_name.starts_with(ns.as_str()) => format!("{}{}", ns, task_name),
            _ => task_name.to_string(),
        }
    }

    /// Task name with the namespace prefix removed
    pub fn strip_namespace<'a>(&self, task_name: &'a str) -> &'a str {
        match &self.namespace {
            Some(ns) => task_name.strip_prefix(ns.as_str()).unwrap_or(task_name),
            None => task_name,
        }
    }
}

fn decode_claims(token: &str) -> Result<TokenClaims, ConfigError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| ConfigError::InvalidToken("not a JWT".to_string()))?;

    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ConfigError::InvalidToken(format!("claims are not base64: {}", e)))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| ConfigError::InvalidToken(format!("claims are not JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn token_with(claims: serde_json::Value) -> String {
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        format!(
            "{}.{}.sig",
            engine.encode(r#"{"alg":"ES256"}"#),
            engine.encode(claims.to_string())
        )
    }

    fn lookup(vars: HashMap<&'static str, String>) -> impl Fn(&str) -> Option<String> {
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_missing_token() {
        let err = HatchetConfig::from_vars(lookup(HashMap::new())).unwrap_err();
        assert_eq!(err, ConfigError::MissingVar("HATCHET_CLIENT_TOKEN"));
    }

    #[test]
    fn test_claims_fill_server_and_tenant() {
        let token = token_with(serde_json::json!({
            "sub": "tenant-123",
            "server_url": "https://cloud.onhatchet.run/"
        }));
        let config =
            HatchetConfig::from_vars(lookup(HashMap::from([("HATCHET_CLIENT_TOKEN", token)])))
                .unwrap();

        assert_eq!(config.tenant_id, "tenant-123");
        assert_eq!(config.server_url, "https://cloud.onhatchet.run");
        assert_eq!(config.event_poll_interval, Duration::from_millis(1000));
        assert!(config.namespace.is_none());
    }

    #[test]
    fn test_explicit_vars_override_claims() {
        let vars = HashMap::from([
            ("HATCHET_CLIENT_TOKEN", "opaque-token".to_string()),
            ("HATCHET_CLIENT_SERVER_URL", "http://localhost:8080".to_string()),
            ("HATCHET_CLIENT_TENANT_ID", "t-1".to_string()),
            ("HATCHET_CLIENT_NAMESPACE", "dev_".to_string()),
            ("HATCHET_CLIENT_EVENT_POLL_INTERVAL_MS", "250".to_string()),
        ]);
        let config = HatchetConfig::from_vars(lookup(vars)).unwrap();

        assert_eq!(config.server_url, "http://localhost:8080");
        assert_eq!(config.tenant_id, "t-1");
        assert_eq!(config.event_poll_interval, Duration::from_millis(250));
        assert_eq!(config.namespaced("say_hello"), "dev_say_hello");
        assert_eq!(config.namespaced("dev_say_hello"), "dev_say_hello");
        assert_eq!(config.strip_namespace("dev_say_hello"), "say_hello");
    }

    #[test]
    fn test_garbage_token_without_overrides() {
        let vars = HashMap::from([("HATCHET_CLIENT_TOKEN", "garbage".to_string())]);
        let err = HatchetConfig::from_vars(lookup(vars)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidToken(_)));
    }

    #[test]
    fn test_invalid_poll_interval() {
        let vars = HashMap::from([
            ("HATCHET_CLIENT_TOKEN", "t".to_string()),
            ("HATCHET_CLIENT_SERVER_URL", "http://x".to_string()),
            ("HATCHET_CLIENT_TENANT_ID", "t".to_string()),
            ("HATCHET_CLIENT_EVENT_POLL_INTERVAL_MS", "soon".to_string()),
        ]);
        let err = HatchetConfig::from_vars(lookup(vars)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_debug_redacts_token() {
        let vars = HashMap::from([
            ("HATCHET_CLIENT_TOKEN", "super-secret".to_string()),
            ("HATCHET_CLIENT_SERVER_URL", "http://x".to_string()),
            ("HATCHET_CLIENT_TENANT_ID", "t".to_string()),
        ]);
        let config = HatchetConfig::from_vars(lookup(vars)).unwrap();
        assert!(!format!("{:?}", config).contains("super-secret"));
    }
}
