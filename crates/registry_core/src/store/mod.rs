//! Store abstraction for instance documents.
//!
//! The registry never performs a client-side read-modify-write on membership.
//! Everything it needs is expressed as a primitive the backing store executes
//! atomically on a single document:
//!
//! * whole-document put / put-if-absent / get / delete
//! * array append and remove-first-match on `players`
//! * numeric increment on the occupancy counters
//! * set of `last_activity`
//!
//! The store also owns the three secondary indices (world + type + capacity
//! flag, occupant, last activity) and keeps them in step with every primitive.
//! No primitive spans more than one document, and multi-step registry
//! operations are deliberately not atomic as a whole.

mod memory;
#[cfg(test)]
pub(crate) mod testing;

pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::instance::{BlockedPlayer, Instance, Platform};
use crate::location::InstanceType;
use async_trait::async_trait;

/// Namespace prefix under which instance documents are keyed.
pub const DEFAULT_KEY_PREFIX: &str = "instance:";

/// Occupancy counter addressed by an increment primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Total,
    Pc,
    Android,
}

impl From<Platform> for Counter {
    fn from(platform: Platform) -> Self {
        match platform {
            Platform::Pc => Counter::Pc,
            Platform::Android => Counter::Android,
        }
    }
}

/// Key of the composite world index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorldIndexKey {
    pub world_id: String,
    pub instance_type: InstanceType,
    pub over_capacity: bool,
}

impl WorldIndexKey {
    pub fn of(instance: &Instance) -> Self {
        Self {
            world_id: instance.world_id.clone(),
            instance_type: instance.instance_type,
            over_capacity: instance.over_capacity,
        }
    }
}

/// Lookup against the world index.
#[derive(Debug, Clone)]
pub struct WorldQuery {
    pub world_id: String,
    pub instance_type: InstanceType,
    pub include_over_capacity: bool,
    pub limit: usize,
}

/// Outcome of removing an occupant from `players`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    NotPresent,
}

/// Primitive operations of the ephemeral instance store.
///
/// Methods returning `Option`/`bool` report a missing document as `None`/`false`
/// rather than as an error.
#[async_trait]
pub trait InstanceStore: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<Option<Instance>, StoreError>;

    /// Writes a whole document, replacing any previous one under the same id.
    async fn put(&self, instance: Instance) -> Result<(), StoreError>;

    /// Writes `instance` only when no document exists under its id. Returns
    /// the existing document, or `None` if `instance` was written.
    async fn put_if_absent(&self, instance: Instance) -> Result<Option<Instance>, StoreError>;

    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    async fn set_last_activity(&self, id: &str, at: i64) -> Result<bool, StoreError>;

    /// Appends to `players`, returning the new list length.
    async fn append_player(&self, id: &str, user_id: &str) -> Result<Option<usize>, StoreError>;

    /// Removes the first occurrence of `user_id` from `players`.
    async fn remove_player(&self, id: &str, user_id: &str) -> Result<Option<Removal>, StoreError>;

    /// Adds `delta` to a counter, returning the new value. Platform counters
    /// never drop below zero.
    async fn increment(
        &self,
        id: &str,
        counter: Counter,
        delta: i64,
    ) -> Result<Option<i64>, StoreError>;

    async fn append_blocked(&self, id: &str, entry: BlockedPlayer) -> Result<bool, StoreError>;

    /// Resets `player_count.total` to the length of `players` in one primitive.
    async fn reconcile_total(&self, id: &str) -> Result<Option<Instance>, StoreError>;

    async fn query_world(&self, query: &WorldQuery) -> Result<Vec<Instance>, StoreError>;

    async fn query_player(&self, user_id: &str) -> Result<Vec<Instance>, StoreError>;

    /// Ids of every document whose `last_activity` is strictly below `before`.
    async fn query_stale(&self, before: i64) -> Result<Vec<String>, StoreError>;
}
