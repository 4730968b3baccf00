//! Client configuration.

use std::time::Duration;

/// Registry client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Registry base URL (e.g., "http://127.0.0.1:8085")
    pub base_url: String,
    /// Shared secret presented as a bearer credential
    pub shared_secret: String,
    /// Upper bound on every call, connect through body
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8085".to_string(),
            shared_secret: String::new(),
            timeout: Duration::from_secs(5),
        }
    }
}

impl ClientConfig {
    /// Creates config from `REGISTRY_URL`, `REGISTRY_SHARED_SECRET` and
    /// `REGISTRY_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let timeout = std::env::var("REGISTRY_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.timeout);

        Self {
            base_url: std::env::var("REGISTRY_URL").unwrap_or(defaults.base_url),
            shared_secret: std::env::var("REGISTRY_SHARED_SECRET").unwrap_or_default(),
            timeout,
        }
    }
}
