//! Session-authority callbacks.
//!
//! The game-session process calls these as players enter and leave and as
//! rooms close. Each hook turns a session event into the matching registry
//! call; the registry never calls back into the session authority.

use crate::client::RegistryClient;
use crate::error::ClientError;
use registry_core::auth::{AuthError, JoinAuthority, JoinClaims};
use registry_core::Platform;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum HookError {
    #[error("join token rejected: {0}")]
    Auth(#[from] AuthError),

    #[error("join token was issued to a different address")]
    AddressMismatch,

    #[error("registry error: {0}")]
    Registry(#[from] ClientError),
}

pub struct SessionHooks {
    client: Arc<RegistryClient>,
    authority: Arc<JoinAuthority>,
}

impl SessionHooks {
    pub fn new(client: Arc<RegistryClient>, authority: Arc<JoinAuthority>) -> Self {
        Self { client, authority }
    }

    /// Redeems a join token and records the player in the instance it names.
    ///
    /// The token must be valid and bound to `ip`. The returned claims carry
    /// the instance location and world facts for the session to use.
    pub async fn player_joined(
        &self,
        token: &str,
        ip: &str,
        platform: Option<Platform>,
    ) -> Result<JoinClaims, HookError> {
        let claims = self.authority.validate(token)?;
        if claims.ip != ip {
            warn!(
                "Join token {} for {} presented from {} (issued to {})",
                claims.jti, claims.sub, ip, claims.ip
            );
            return Err(HookError::AddressMismatch);
        }

        self.client
            .add_player(&claims.location, &claims.sub, platform)
            .await?;
        Ok(claims)
    }

    pub async fn player_left(
        &self,
        instance_id: &str,
        user_id: &str,
        platform: Option<Platform>,
    ) -> Result<(), HookError> {
        self.client
            .remove_player(instance_id, user_id, platform)
            .await?;
        Ok(())
    }

    /// Unregisters a closed room. Closing an already absent room succeeds.
    pub async fn room_closed(&self, instance_id: &str) -> Result<(), HookError> {
        if self.client.unregister(instance_id).await? {
            info!("Room {} closed", instance_id);
        }
        Ok(())
    }

    pub async fn keep_alive(&self, instance_id: &str) -> Result<(), HookError> {
        self.client.ping(instance_id).await?;
        Ok(())
    }
}
