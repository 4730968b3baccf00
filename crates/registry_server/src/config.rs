//! Network configuration of the registry server.

use std::net::SocketAddr;

/// Placeholder written into freshly generated configuration files.
pub const DEFAULT_SHARED_SECRET: &str = "change-me";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub bind_address: SocketAddr,
    /// Credential every caller must present
    pub shared_secret: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8085)),
            shared_secret: DEFAULT_SHARED_SECRET.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn uses_default_secret(&self) -> bool {
        self.shared_secret == DEFAULT_SHARED_SECRET
    }
}
