//! In-process implementation of [`InstanceStore`].
//!
//! Documents live in a sharded map keyed by `prefix + id`. Each primitive holds
//! the document's shard lock for its whole duration and updates the secondary
//! indices before releasing it, so a document and its index entries never
//! disagree once a primitive returns. Queries copy keys out of an index first
//! and only then read documents; no index lock is held while a document lock
//! is requested.

use super::{Counter, InstanceStore, Removal, WorldIndexKey, WorldQuery, DEFAULT_KEY_PREFIX};
use crate::error::StoreError;
use crate::instance::{BlockedPlayer, Instance};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

#[derive(Debug)]
pub struct MemoryStore {
    prefix: String,
    documents: DashMap<String, Instance>,
    world_index: DashMap<WorldIndexKey, BTreeSet<String>>,
    /// occupant -> document key -> number of slots held
    player_index: DashMap<String, BTreeMap<String, usize>>,
    activity_index: Mutex<BTreeSet<(i64, String)>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_KEY_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            documents: DashMap::new(),
            world_index: DashMap::new(),
            player_index: DashMap::new(),
            activity_index: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn key_prefix(&self) -> &str {
        &self.prefix
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn key(&self, id: &str) -> String {
        format!("{}{}", self.prefix, id)
    }

    fn index(&self, key: &str, doc: &Instance) {
        self.world_index
            .entry(WorldIndexKey::of(doc))
            .or_default()
            .insert(key.to_string());
        for player in &doc.players {
            self.index_player(key, player);
        }
        self.activity_index
            .lock()
            .insert((doc.last_activity, key.to_string()));
    }

    fn unindex(&self, key: &str, doc: &Instance) {
        self.unindex_world(key, &WorldIndexKey::of(doc));
        for player in &doc.players {
            self.unindex_player(key, player);
        }
        self.activity_index
            .lock()
            .remove(&(doc.last_activity, key.to_string()));
    }

    fn unindex_world(&self, key: &str, world_key: &WorldIndexKey) {
        if let Entry::Occupied(mut entry) = self.world_index.entry(world_key.clone()) {
            entry.get_mut().remove(key);
            if entry.get().is_empty() {
                entry.remove();
            }
        }
    }

    fn reindex_world(&self, key: &str, before: &WorldIndexKey, doc: &Instance) {
        let after = WorldIndexKey::of(doc);
        if &after != before {
            self.unindex_world(key, before);
            self.world_index
                .entry(after)
                .or_default()
                .insert(key.to_string());
        }
    }

    fn index_player(&self, key: &str, player: &str) {
        *self
            .player_index
            .entry(player.to_string())
            .or_default()
            .entry(key.to_string())
            .or_insert(0) += 1;
    }

    fn unindex_player(&self, key: &str, player: &str) {
        if let Entry::Occupied(mut entry) = self.player_index.entry(player.to_string()) {
            let holders = entry.get_mut();
            if let Some(slots) = holders.get_mut(key) {
                *slots -= 1;
                if *slots == 0 {
                    holders.remove(key);
                }
            }
            if holders.is_empty() {
                entry.remove();
            }
        }
    }

    fn move_activity(&self, key: &str, from: i64, to: i64) {
        let mut index = self.activity_index.lock();
        index.remove(&(from, key.to_string()));
        index.insert((to, key.to_string()));
    }

    fn load(&self, keys: impl IntoIterator<Item = String>) -> Vec<Instance> {
        keys.into_iter()
            .filter_map(|key| self.documents.get(&key).map(|doc| doc.value().clone()))
            .collect()
    }

    fn world_keys(&self, world_key: &WorldIndexKey) -> Vec<String> {
        self.world_index
            .get(world_key)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl InstanceStore for MemoryStore {
    async fn fetch(&self, id: &str) -> Result<Option<Instance>, StoreError> {
        Ok(self.documents.get(&self.key(id)).map(|doc| doc.value().clone()))
    }

    async fn put(&self, mut instance: Instance) -> Result<(), StoreError> {
        let key = self.key(&instance.id);
        instance.over_capacity =
            Instance::compute_over_capacity(instance.player_count.total, instance.capacity);

        match self.documents.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                self.unindex(&key, entry.get());
                self.index(&key, &instance);
                entry.insert(instance);
            }
            Entry::Vacant(entry) => {
                self.index(&key, &instance);
                entry.insert(instance);
            }
        }
        trace!("put {}", key);
        Ok(())
    }

    async fn put_if_absent(&self, mut instance: Instance) -> Result<Option<Instance>, StoreError> {
        let key = self.key(&instance.id);
        match self.documents.entry(key.clone()) {
            Entry::Occupied(entry) => Ok(Some(entry.get().clone())),
            Entry::Vacant(entry) => {
                instance.over_capacity =
                    Instance::compute_over_capacity(instance.player_count.total, instance.capacity);
                self.index(&key, &instance);
                entry.insert(instance);
                trace!("put {}", key);
                Ok(None)
            }
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let key = self.key(id);
        match self.documents.entry(key.clone()) {
            Entry::Occupied(entry) => {
                self.unindex(&key, entry.get());
                entry.remove();
                trace!("deleted {}", key);
                Ok(true)
            }
            Entry::Vacant(_) => Ok(false),
        }
    }

    async fn set_last_activity(&self, id: &str, at: i64) -> Result<bool, StoreError> {
        let key = self.key(id);
        let Some(mut doc) = self.documents.get_mut(&key) else {
            return Ok(false);
        };
        let previous = doc.last_activity;
        doc.last_activity = at;
        self.move_activity(&key, previous, at);
        Ok(true)
    }

    async fn append_player(&self, id: &str, user_id: &str) -> Result<Option<usize>, StoreError> {
        let key = self.key(id);
        let Some(mut doc) = self.documents.get_mut(&key) else {
            return Ok(None);
        };
        doc.players.push(user_id.to_string());
        self.index_player(&key, user_id);
        Ok(Some(doc.players.len()))
    }

    async fn remove_player(&self, id: &str, user_id: &str) -> Result<Option<Removal>, StoreError> {
        let key = self.key(id);
        let Some(mut doc) = self.documents.get_mut(&key) else {
            return Ok(None);
        };
        match doc.players.iter().position(|p| p == user_id) {
            Some(slot) => {
                doc.players.remove(slot);
                self.unindex_player(&key, user_id);
                Ok(Some(Removal::Removed))
            }
            None => Ok(Some(Removal::NotPresent)),
        }
    }

    async fn increment(
        &self,
        id: &str,
        counter: Counter,
        delta: i64,
    ) -> Result<Option<i64>, StoreError> {
        let key = self.key(id);
        let Some(mut doc) = self.documents.get_mut(&key) else {
            return Ok(None);
        };
        let before = WorldIndexKey::of(&doc);
        let value = match counter {
            Counter::Total => {
                doc.player_count.total += delta;
                doc.over_capacity =
                    Instance::compute_over_capacity(doc.player_count.total, doc.capacity);
                doc.player_count.total
            }
            Counter::Pc => {
                doc.player_count.pc = (doc.player_count.pc + delta).max(0);
                doc.player_count.pc
            }
            Counter::Android => {
                doc.player_count.android = (doc.player_count.android + delta).max(0);
                doc.player_count.android
            }
        };
        self.reindex_world(&key, &before, &doc);
        Ok(Some(value))
    }

    async fn append_blocked(&self, id: &str, entry: BlockedPlayer) -> Result<bool, StoreError> {
        let Some(mut doc) = self.documents.get_mut(&self.key(id)) else {
            return Ok(false);
        };
        doc.blocked_players.push(entry);
        Ok(true)
    }

    async fn reconcile_total(&self, id: &str) -> Result<Option<Instance>, StoreError> {
        let key = self.key(id);
        let Some(mut doc) = self.documents.get_mut(&key) else {
            return Ok(None);
        };
        let before = WorldIndexKey::of(&doc);
        doc.player_count.total = doc.players.len() as i64;
        doc.over_capacity = Instance::compute_over_capacity(doc.player_count.total, doc.capacity);
        self.reindex_world(&key, &before, &doc);
        Ok(Some(doc.value().clone()))
    }

    async fn query_world(&self, query: &WorldQuery) -> Result<Vec<Instance>, StoreError> {
        let mut world_key = WorldIndexKey {
            world_id: query.world_id.clone(),
            instance_type: query.instance_type,
            over_capacity: false,
        };
        let mut keys = self.world_keys(&world_key);
        if query.include_over_capacity {
            world_key.over_capacity = true;
            keys.extend(self.world_keys(&world_key));
        }

        keys.truncate(query.limit);
        Ok(self.load(keys))
    }

    async fn query_player(&self, user_id: &str) -> Result<Vec<Instance>, StoreError> {
        let keys: Vec<String> = self
            .player_index
            .get(user_id)
            .map(|holders| holders.keys().cloned().collect())
            .unwrap_or_default();
        Ok(self.load(keys))
    }

    async fn query_stale(&self, before: i64) -> Result<Vec<String>, StoreError> {
        let keys: Vec<String> = self
            .activity_index
            .lock()
            .range(..(before, String::new()))
            .map(|(_, key)| key.clone())
            .collect();

        Ok(keys
            .into_iter()
            .filter_map(|key| key.strip_prefix(&self.prefix).map(str::to_string))
            .collect())
    }
}
