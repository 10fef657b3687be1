use tracing::debug;

use super::QueueStore;
use crate::document::{DocumentStore, Filter};
use crate::error::Result;
use crate::types::{LockToken, LockedTasks, RunningTasks, TakeOrder, TaskRecord};

impl<D: DocumentStore> QueueStore<D> {
    /// Payloads of every task held under `token`, keyed by task id.
    /// Unknown or released tokens give an empty map.
    pub async fn get_lock(&self, token: &LockToken) -> Result<LockedTasks> {
        let records = self.locked_tasks(token).await?;
        Ok(records.into_iter().map(|r| (r.id, r.payload)).collect())
    }

    /// Full records held under `token`, in claim order
    pub async fn locked_tasks(&self, token: &LockToken) -> Result<Vec<TaskRecord>> {
        self.ensure_open()?;
        self.inner
            .documents
            .find(&Filter::held(token), Some(TakeOrder::OldestFirst), None)
            .await
    }

    /// Every locked task grouped by token, for recovering in-flight batches
    pub async fn running_tasks(&self) -> Result<RunningTasks> {
        self.ensure_open()?;
        let records = self
            .inner
            .documents
            .find(&Filter::any_held(), None, None)
            .await?;

        let mut running = RunningTasks::new();
        for record in records {
            if let Some(token) = record.lock.token() {
                running
                    .entry(token.clone())
                    .or_default()
                    .insert(record.id, record.payload);
            }
        }
        Ok(running)
    }

    /// Delete every task held under `token` (the batch is done).
    /// Releasing an unknown or already released token is a no-op.
    pub async fn release_lock(&self, token: &LockToken) -> Result<()> {
        self.ensure_open()?;
        let removed = self.inner.documents.remove(&Filter::held(token)).await?;
        debug!(token = %token, removed, "Lock released");
        Ok(())
    }
}
