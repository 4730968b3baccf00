//! Server implementation module.
//!
//! * `core` - [`RegistryServer`] lifecycle: bind, serve, graceful shutdown
//! * `routes` - Route table and request handlers
//! * `auth` - Shared-secret middleware

mod auth;
mod core;
mod routes;

pub use self::core::RegistryServer;

use registry_core::InstanceRegistry;
use std::sync::Arc;

/// State shared by every handler.
#[derive(Clone)]
pub(crate) struct AppState {
    pub registry: Arc<InstanceRegistry>,
    pub shared_secret: Arc<str>,
}
