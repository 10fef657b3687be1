//! Queue Engine Adapter Interface
//!
//! This module defines the stable contract a queue engine consumes. Engines
//! should program against `QueueStoreAdapter` rather than `QueueStore`
//! directly, so the backing store can be swapped out.
//!
//! ## Design Principles
//!
//! 1. **Stable Interface**: these signatures are the contract with engines
//! 2. **Thin Wrapper**: each method delegates to the store
//! 3. **Soft misses**: unknown ids and tokens are `None` or empty, never errors

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::document::DocumentStore;
use crate::error::Result;
use crate::store::QueueStore;
use crate::types::{LockToken, LockedTasks, RunningTasks};

#[async_trait]
pub trait QueueStoreAdapter: Send + Sync {
    /* ===================== System ===================== */

    /// Readiness probe; number of available tasks
    async fn connect(&self) -> Result<u64>;

    /// Release the backing store
    async fn close(&self) -> Result<()>;

    /* ===================== Tasks ===================== */

    async fn get_task(&self, task_id: &str) -> Result<Option<JsonValue>>;

    async fn delete_task(&self, task_id: &str) -> Result<()>;

    async fn put_task(&self, task_id: &str, task: JsonValue, priority: i64) -> Result<()>;

    /* ===================== Claims ===================== */

    async fn take_first_n(&self, n: usize) -> Result<Option<LockToken>>;

    async fn take_last_n(&self, n: usize) -> Result<Option<LockToken>>;

    /* ===================== Locks ===================== */

    async fn get_lock(&self, lock_id: &LockToken) -> Result<LockedTasks>;

    async fn get_running_tasks(&self) -> Result<RunningTasks>;

    async fn release_lock(&self, lock_id: &LockToken) -> Result<()>;
}

#[async_trait]
impl<D: DocumentStore> QueueStoreAdapter for QueueStore<D> {
    async fn connect(&self) -> Result<u64> {
        QueueStore::connect(self).await
    }

    async fn close(&self) -> Result<()> {
        QueueStore::close(self).await
    }

    async fn get_task(&self, task_id: &str) -> Result<Option<JsonValue>> {
        QueueStore::get_task(self, task_id).await
    }

    async fn delete_task(&self, task_id: &str) -> Result<()> {
        QueueStore::delete_task(self, task_id).await
    }

    async fn put_task(&self, task_id: &str, task: JsonValue, priority: i64) -> Result<()> {
        QueueStore::put_task(self, task_id, task, priority).await
    }

    async fn take_first_n(&self, n: usize) -> Result<Option<LockToken>> {
        QueueStore::take_first_n(self, n).await
    }

    async fn take_last_n(&self, n: usize) -> Result<Option<LockToken>> {
        QueueStore::take_last_n(self, n).await
    }

    async fn get_lock(&self, lock_id: &LockToken) -> Result<LockedTasks> {
        QueueStore::get_lock(self, lock_id).await
    }

    async fn get_running_tasks(&self) -> Result<RunningTasks> {
        self.running_tasks().await
    }

    async fn release_lock(&self, lock_id: &LockToken) -> Result<()> {
        QueueStore::release_lock(self, lock_id).await
    }
}
