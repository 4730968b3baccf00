//! Core registry server implementation.

use super::{routes, AppState};
use crate::config::ServerConfig;
use crate::error::ServerError;
use axum::Router;
use registry_core::InstanceRegistry;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// HTTP front end of an [`InstanceRegistry`].
///
/// The server holds no registry data of its own. Each request is handled on
/// its own task and talks to the shared registry, so any number of requests
/// against the same instance can be in flight at once.
pub struct RegistryServer {
    config: ServerConfig,
    registry: Arc<InstanceRegistry>,
}

impl RegistryServer {
    pub fn new(config: ServerConfig, registry: Arc<InstanceRegistry>) -> Self {
        Self { config, registry }
    }

    pub fn registry(&self) -> &Arc<InstanceRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Builds the route table with the shared-secret layer applied.
    pub fn router(&self) -> Router {
        routes::router(AppState {
            registry: self.registry.clone(),
            shared_secret: Arc::from(self.config.shared_secret.as_str()),
        })
    }

    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        TcpListener::bind(self.config.bind_address)
            .await
            .map_err(|e| ServerError::Network(format!("Bind to {} failed: {e}", self.config.bind_address)))
    }

    /// Serves requests on `listener` until `shutdown` is cancelled, then
    /// drains in-flight requests before returning.
    ///
    /// # Arguments
    ///
    /// * `listener` - An already bound listener (tests bind port 0)
    /// * `shutdown` - Token whose cancellation starts graceful shutdown
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), ServerError> {
        let local = listener
            .local_addr()
            .map_err(|e| ServerError::Network(e.to_string()))?;
        if self.config.uses_default_secret() {
            warn!("⚠️ Registry is using the placeholder shared secret; set REGISTRY_SHARED_SECRET");
        }
        info!("🚀 Instance registry listening on {}", local);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| ServerError::Network(format!("Server error: {e}")))?;

        info!("Instance registry on {} stopped", local);
        Ok(())
    }
}
