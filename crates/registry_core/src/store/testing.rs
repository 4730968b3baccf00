use super::{Counter, InstanceStore, MemoryStore, Removal, WorldQuery};
use crate::error::StoreError;
use crate::instance::{BlockedPlayer, Instance};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Delegates to a [`MemoryStore`] but can be told to fail counters, to stall
/// appends or to refuse deleting particular documents.
#[derive(Default)]
pub(crate) struct FlakyStore {
    inner: MemoryStore,
    fail_increment: AtomicBool,
    stall_append: AtomicBool,
    fail_delete: Mutex<HashSet<String>>,
}

impl FlakyStore {
    pub fn fail_increments(&self, fail: bool) {
        self.fail_increment.store(fail, Ordering::SeqCst);
    }

    pub fn stall_appends(&self, stall: bool) {
        self.stall_append.store(stall, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, id: &str, fail: bool) {
        let mut ids = self.fail_delete.lock();
        if fail {
            ids.insert(id.to_string());
        } else {
            ids.remove(id);
        }
    }
}

#[async_trait]
impl InstanceStore for FlakyStore {
    async fn fetch(&self, id: &str) -> Result<Option<Instance>, StoreError> {
        self.inner.fetch(id).await
    }

    async fn put(&self, instance: Instance) -> Result<(), StoreError> {
        self.inner.put(instance).await
    }

    async fn put_if_absent(&self, instance: Instance) -> Result<Option<Instance>, StoreError> {
        self.inner.put_if_absent(instance).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        if self.fail_delete.lock().contains(id) {
            return Err(StoreError::Unavailable("injected delete failure".into()));
        }
        self.inner.delete(id).await
    }

    async fn set_last_activity(&self, id: &str, at: i64) -> Result<bool, StoreError> {
        self.inner.set_last_activity(id, at).await
    }

    async fn append_player(&self, id: &str, user_id: &str) -> Result<Option<usize>, StoreError> {
        if self.stall_append.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        self.inner.append_player(id, user_id).await
    }

    async fn remove_player(&self, id: &str, user_id: &str) -> Result<Option<Removal>, StoreError> {
        self.inner.remove_player(id, user_id).await
    }

    async fn increment(
        &self,
        id: &str,
        counter: Counter,
        delta: i64,
    ) -> Result<Option<i64>, StoreError> {
        if self.fail_increment.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected counter failure".into()));
        }
        self.inner.increment(id, counter, delta).await
    }

    async fn append_blocked(&self, id: &str, entry: BlockedPlayer) -> Result<bool, StoreError> {
        self.inner.append_blocked(id, entry).await
    }

    async fn reconcile_total(&self, id: &str) -> Result<Option<Instance>, StoreError> {
        self.inner.reconcile_total(id).await
    }

    async fn query_world(&self, query: &WorldQuery) -> Result<Vec<Instance>, StoreError> {
        self.inner.query_world(query).await
    }

    async fn query_player(&self, user_id: &str) -> Result<Vec<Instance>, StoreError> {
        self.inner.query_player(user_id).await
    }

    async fn query_stale(&self, before: i64) -> Result<Vec<String>, StoreError> {
        self.inner.query_stale(before).await
    }
}
