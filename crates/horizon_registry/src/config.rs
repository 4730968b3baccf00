//! Configuration management for the registry process.
//!
//! Settings live in a TOML file with `[server]`, `[registry]` and `[logging]`
//! sections. A default file is written on first start. The shared secret can
//! be supplied through `REGISTRY_SHARED_SECRET` instead of the file.

use registry_core::store::DEFAULT_KEY_PREFIX;
use registry_core::{ReaperConfig, RegistryConfig, DEFAULT_PAGE_SIZE};
use registry_server::config::DEFAULT_SHARED_SECRET;
use registry_server::ServerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub const SHARED_SECRET_ENV: &str = "REGISTRY_SHARED_SECRET";

/// Application configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerSettings,
    #[serde(default)]
    pub registry: RegistrySettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Listener address, "IP:PORT"
    pub bind_address: String,
    /// Credential every caller must present
    pub shared_secret: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8085".to_string(),
            shared_secret: DEFAULT_SHARED_SECRET.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Namespace under which instance documents are keyed
    pub key_prefix: String,
    /// Maximum instances returned by a world lookup
    pub page_size: usize,
    /// Bound on each individual store call
    pub store_timeout_ms: u64,
    /// Idle time after which an instance is reaped
    pub stale_threshold_secs: u64,
    pub reap_interval_secs: u64,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            store_timeout_ms: 2_000,
            stale_threshold_secs: 3_600,
            reap_interval_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from `path`, writing a default file first when
    /// none exists.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The loaded or default configuration, or an error if reading, parsing
    /// or creating the file failed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            Ok(toml::from_str(&content)?)
        } else {
            let default_config = AppConfig::default();
            tokio::fs::write(path, toml::to_string_pretty(&default_config)?).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Applies secrets supplied through the environment.
    pub fn apply_env_overrides(&mut self) {
        self.override_shared_secret(std::env::var(SHARED_SECRET_ENV).ok());
    }

    fn override_shared_secret(&mut self, secret: Option<String>) {
        if let Some(secret) = secret.filter(|s| !s.is_empty()) {
            self.server.shared_secret = secret;
        }
    }

    /// Checks addresses, secrets, limits and the log level.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is usable, or a message describing the
    /// first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self
            .server
            .bind_address
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(format!("Invalid bind address: {}", self.server.bind_address));
        }

        if self.server.shared_secret.is_empty() {
            return Err(format!(
                "Shared secret cannot be empty (set it in [server] or {SHARED_SECRET_ENV})"
            ));
        }

        let registry = &self.registry;
        if registry.key_prefix.is_empty() {
            return Err("Key prefix cannot be empty".to_string());
        }
        if registry.page_size == 0 {
            return Err("Page size must be at least 1".to_string());
        }
        if registry.store_timeout_ms == 0 {
            return Err("Store timeout must be greater than zero".to_string());
        }
        if registry.stale_threshold_secs == 0 || registry.reap_interval_secs == 0 {
            return Err("Reaper threshold and interval must be greater than zero".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                self.logging.level
            ));
        }

        Ok(())
    }

    pub fn to_server_config(&self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        Ok(ServerConfig {
            bind_address: self.server.bind_address.parse()?,
            shared_secret: self.server.shared_secret.clone(),
        })
    }

    pub fn to_registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            page_size: self.registry.page_size,
            store_timeout: Duration::from_millis(self.registry.store_timeout_ms),
        }
    }

    pub fn to_reaper_config(&self) -> ReaperConfig {
        ReaperConfig {
            interval: Duration::from_secs(self.registry.reap_interval_secs),
            stale_threshold: Duration::from_secs(self.registry.stale_threshold_secs),
        }
    }
}
