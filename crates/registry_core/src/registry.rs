//! Instance registry operations.
//!
//! [`InstanceRegistry`] turns the store primitives into the registry contract:
//! point lookups, registration, keep-alive, membership mutation and the two
//! secondary-index queries. It holds no mutable state of its own; every
//! request can run on its own task against a shared `Arc<InstanceRegistry>`.
//!
//! ## Multi-step mutations
//!
//! `add_player` and `remove_player` are sequences of single-document
//! primitives (array change, counter change, activity touch). The sequence is
//! not atomic. If a step after the first fails, or any step times out, the
//! call returns [`RegistryError::PartialFailure`] and the document must be
//! repaired with [`InstanceRegistry::reconcile`] rather than retried.

use crate::error::{MutationStep, RegistryError, StoreError};
use crate::instance::{BlockedPlayer, Instance, Platform, Registration};
use crate::location::{InstanceType, Location};
use crate::store::{Counter, InstanceStore, Removal, WorldQuery};
use crate::utils::current_timestamp;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

/// Maximum number of instances returned by a world lookup. Paging is not
/// supported.
pub const DEFAULT_PAGE_SIZE: usize = 10;

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub page_size: usize,
    /// Upper bound on every individual store call
    pub store_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

/// One page of a world lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldPage {
    pub instances: Vec<Instance>,
    /// More matches exist than fit in the page
    pub truncated: bool,
}

pub struct InstanceRegistry {
    store: Arc<dyn InstanceStore>,
    config: RegistryConfig,
}

impl InstanceRegistry {
    pub fn new(store: Arc<dyn InstanceStore>, config: RegistryConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    async fn call<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.config.store_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.config.store_timeout)),
        }
    }

    /// First step of a mutation. A timeout leaves the outcome unknown, so it
    /// counts as partial; a definite store error does not.
    async fn first_step<T, F>(&self, id: &str, step: MutationStep, op: F) -> Result<T, RegistryError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        self.call(op).await.map_err(|e| match e {
            StoreError::Timeout(_) => self.partial(id, step, e),
            other => RegistryError::Store(other),
        })
    }

    async fn later_step<T, F>(&self, id: &str, step: MutationStep, op: F) -> Result<T, RegistryError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        self.call(op).await.map_err(|e| self.partial(id, step, e))
    }

    fn partial(&self, id: &str, step: MutationStep, source: StoreError) -> RegistryError {
        error!(
            "Partial failure on instance {} during {}: {} (reconcile required)",
            id, step, source
        );
        RegistryError::PartialFailure {
            instance_id: id.to_string(),
            step,
            source,
        }
    }

    async fn adjust(
        &self,
        id: &str,
        counter: Counter,
        delta: i64,
        step: MutationStep,
    ) -> Result<i64, RegistryError> {
        self.later_step(id, step, self.store.increment(id, counter, delta))
            .await?
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Instance, RegistryError> {
        self.call(self.store.fetch(id))
            .await?
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Creates or overwrites an instance document with an empty membership.
    #[instrument(skip(self), fields(id = %registration.id))]
    pub async fn register(&self, registration: Registration) -> Result<Instance, RegistryError> {
        registration.validate()?;
        let instance = Instance::new(registration, current_timestamp());
        self.call(self.store.put(instance.clone())).await?;

        info!(
            "Registered instance {} ({}, capacity {})",
            instance.id, instance.instance_type, instance.capacity
        );
        Ok(instance)
    }

    pub async fn register_location(
        &self,
        location: &Location,
        capacity: u32,
    ) -> Result<Instance, RegistryError> {
        self.register(Registration::from_location(location, capacity))
            .await
    }

    /// Registers the instance unless it already exists, in which case the
    /// existing document is returned untouched. Concurrent first joins can
    /// all call this without resetting each other's membership.
    #[instrument(skip(self), fields(id = %registration.id))]
    pub async fn register_if_absent(
        &self,
        registration: Registration,
    ) -> Result<Instance, RegistryError> {
        registration.validate()?;
        let instance = Instance::new(registration, current_timestamp());

        match self.call(self.store.put_if_absent(instance.clone())).await? {
            Some(existing) => {
                debug!("Instance {} already registered", existing.id);
                Ok(existing)
            }
            None => {
                info!(
                    "Registered instance {} ({}, capacity {})",
                    instance.id, instance.instance_type, instance.capacity
                );
                Ok(instance)
            }
        }
    }

    pub async fn register_location_if_absent(
        &self,
        location: &Location,
        capacity: u32,
    ) -> Result<Instance, RegistryError> {
        self.register_if_absent(Registration::from_location(location, capacity))
            .await
    }

    #[instrument(skip(self))]
    pub async fn unregister(&self, id: &str) -> Result<(), RegistryError> {
        if self.call(self.store.delete(id)).await? {
            info!("Unregistered instance {}", id);
            Ok(())
        } else {
            Err(RegistryError::NotFound(id.to_string()))
        }
    }

    /// Keep-alive: refreshes `last_activity` and nothing else.
    #[instrument(skip(self))]
    pub async fn ping(&self, id: &str) -> Result<(), RegistryError> {
        if self
            .call(self.store.set_last_activity(id, current_timestamp()))
            .await?
        {
            Ok(())
        } else {
            Err(RegistryError::NotFound(id.to_string()))
        }
    }

    #[instrument(skip(self))]
    pub async fn add_player(
        &self,
        id: &str,
        user_id: &str,
        platform: Option<Platform>,
    ) -> Result<(), RegistryError> {
        self.first_step(id, MutationStep::AppendPlayer, self.store.append_player(id, user_id))
            .await?
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        let total = self.adjust(id, Counter::Total, 1, MutationStep::AdjustTotal).await?;
        if let Some(platform) = platform {
            self.adjust(id, platform.into(), 1, MutationStep::AdjustPlatform)
                .await?;
        }
        self.later_step(
            id,
            MutationStep::Touch,
            self.store.set_last_activity(id, current_timestamp()),
        )
        .await?;

        debug!("Player {} joined {} ({} present)", user_id, id, total);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn remove_player(
        &self,
        id: &str,
        user_id: &str,
        platform: Option<Platform>,
    ) -> Result<(), RegistryError> {
        let removal = self
            .first_step(id, MutationStep::RemovePlayer, self.store.remove_player(id, user_id))
            .await?;
        match removal {
            None => return Err(RegistryError::NotFound(id.to_string())),
            Some(Removal::NotPresent) => {
                return Err(RegistryError::NotAMember {
                    instance_id: id.to_string(),
                    user_id: user_id.to_string(),
                })
            }
            Some(Removal::Removed) => {}
        }

        let total = self.adjust(id, Counter::Total, -1, MutationStep::AdjustTotal).await?;
        if let Some(platform) = platform {
            self.adjust(id, platform.into(), -1, MutationStep::AdjustPlatform)
                .await?;
        }
        self.later_step(
            id,
            MutationStep::Touch,
            self.store.set_last_activity(id, current_timestamp()),
        )
        .await?;

        debug!("Player {} left {} ({} present)", user_id, id, total);
        Ok(())
    }

    /// Bars `user_id` from the instance until `blocked_until` (epoch seconds).
    #[instrument(skip(self))]
    pub async fn block_player(
        &self,
        id: &str,
        user_id: &str,
        blocked_until: i64,
    ) -> Result<(), RegistryError> {
        let entry = BlockedPlayer {
            user_id: user_id.to_string(),
            blocked_until,
        };
        if self.call(self.store.append_blocked(id, entry)).await? {
            Ok(())
        } else {
            Err(RegistryError::NotFound(id.to_string()))
        }
    }

    /// Repairs `player_count.total` after a partial failure.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, id: &str) -> Result<Instance, RegistryError> {
        let instance = self
            .call(self.store.reconcile_total(id))
            .await?
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        info!(
            "Reconciled instance {}: {} player(s)",
            id, instance.player_count.total
        );
        Ok(instance)
    }

    /// World index lookup, capped at the configured page size.
    #[instrument(skip(self))]
    pub async fn find_by_world(
        &self,
        world_id: &str,
        instance_type: InstanceType,
        include_over_capacity: bool,
    ) -> Result<WorldPage, RegistryError> {
        let page_size = self.config.page_size;
        let query = WorldQuery {
            world_id: world_id.to_string(),
            instance_type,
            include_over_capacity,
            limit: page_size + 1,
        };
        let mut instances = self.call(self.store.query_world(&query)).await?;
        let truncated = instances.len() > page_size;
        instances.truncate(page_size);

        Ok(WorldPage {
            instances,
            truncated,
        })
    }

    #[instrument(skip(self))]
    pub async fn find_by_player(&self, user_id: &str) -> Result<Vec<Instance>, RegistryError> {
        Ok(self.call(self.store.query_player(user_id)).await?)
    }

    /// Ids of instances whose last activity is strictly older than `before`.
    pub async fn find_stale(&self, before: i64) -> Result<Vec<String>, RegistryError> {
        Ok(self.call(self.store.query_stale(before)).await?)
    }
}
