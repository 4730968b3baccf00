//! Join request handling for the API service.
//!
//! A join request names a location. The coordinator resolves the world from
//! the catalog (the relational store in production), makes sure the instance
//! is registered, checks capacity and blocks, and finally mints a join token
//! for the session authority to redeem.

use crate::client::RegistryClient;
use crate::error::ClientError;
use async_trait::async_trait;
use registry_core::auth::{AuthError, JoinAuthority, JoinGrant};
use registry_core::{current_timestamp, Instance, Location, LocationError};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// The world facts a join token embeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldRecord {
    pub world_id: String,
    pub author_id: String,
    pub name: String,
    pub tags: Vec<String>,
    pub capacity: u32,
}

#[derive(Debug, Error)]
#[error("world catalog error: {0}")]
pub struct CatalogError(pub String);

/// Read-only view of persisted world definitions.
#[async_trait]
pub trait WorldCatalog: Send + Sync {
    async fn world(&self, world_id: &str) -> Result<Option<WorldRecord>, CatalogError>;
}

#[derive(Debug, Error)]
pub enum JoinError {
    #[error("malformed location: {0}")]
    MalformedLocation(#[from] LocationError),

    #[error("unknown world {0}")]
    UnknownWorld(String),

    #[error("instance {0} is full")]
    InstanceFull(String),

    #[error("user {user_id} is blocked from instance {instance_id}")]
    Blocked { instance_id: String, user_id: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("registry error: {0}")]
    Registry(#[from] ClientError),

    #[error("token error: {0}")]
    Auth(#[from] AuthError),
}

/// A granted join.
#[derive(Debug, Clone)]
pub struct JoinTicket {
    pub token: String,
    pub location: Location,
    pub instance: Instance,
}

pub struct JoinCoordinator {
    client: Arc<RegistryClient>,
    catalog: Arc<dyn WorldCatalog>,
    authority: Arc<JoinAuthority>,
}

impl JoinCoordinator {
    pub fn new(
        client: Arc<RegistryClient>,
        catalog: Arc<dyn WorldCatalog>,
        authority: Arc<JoinAuthority>,
    ) -> Self {
        Self {
            client,
            catalog,
            authority,
        }
    }

    /// Grants `user_id` entry to the instance at `location`, registering it
    /// on first join.
    ///
    /// The location is parsed before anything remote is touched. Capacity is
    /// taken from the world definition and only used when the instance has
    /// to be registered; an existing instance keeps the capacity it was
    /// registered with.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The joining user
    /// * `location` - Full location string, e.g. `wrld_abc:123~friends(usr_1)`
    /// * `requester_ip` - Address the token will be bound to
    pub async fn request_join(
        &self,
        user_id: &str,
        location: &str,
        requester_ip: &str,
    ) -> Result<JoinTicket, JoinError> {
        let location = Location::parse(location)?;
        let world = self
            .catalog
            .world(&location.world_id)
            .await?
            .ok_or_else(|| JoinError::UnknownWorld(location.world_id.clone()))?;

        let id = location.full();
        let instance = self
            .client
            .register_location_if_absent(&location, world.capacity)
            .await?;

        if instance.is_blocked(user_id, current_timestamp()) {
            return Err(JoinError::Blocked {
                instance_id: instance.id,
                user_id: user_id.to_string(),
            });
        }
        if instance.over_capacity && !instance.has_player(user_id) {
            return Err(JoinError::InstanceFull(instance.id));
        }

        let grant = JoinGrant {
            user_id: user_id.to_string(),
            location: id,
            world_id: world.world_id,
            world_author_id: world.author_id,
            world_name: world.name,
            world_tags: world.tags,
            world_capacity: world.capacity,
            instance_owner_id: location.owner_id.clone(),
            requester_ip: requester_ip.to_string(),
        };
        let token = self.authority.issue(&grant, None)?;

        info!("🎟️ Join granted for {} into {}", user_id, instance.id);
        Ok(JoinTicket {
            token,
            location,
            instance,
        })
    }
}
