use serde_json::Value as JsonValue;
use tracing::debug;

use super::QueueStore;
use crate::document::{DocumentStore, Filter, Patch};
use crate::error::Result;
use crate::types::{LockState, TaskRecord};

impl<D: DocumentStore> QueueStore<D> {
    /// Enqueue or re-enqueue a task.
    ///
    /// A new id gets the next sequence and starts available. An existing id
    /// gets the new payload and priority, loses any lock, and takes a fresh
    /// sequence so it queues behind tasks of equal priority. The document
    /// store raises the sequence past anything already stored, which keeps it
    /// unique when other processes write to the same queue.
    pub async fn put_task(&self, id: &str, payload: JsonValue, priority: i64) -> Result<()> {
        self.ensure_open()?;
        let documents = &self.inner.documents;
        let sequence = self.inner.sequencer.next();

        let patch = Patch {
            payload: Some(payload.clone()),
            priority: Some(priority),
            sequence: Some(sequence),
            lock: Some(LockState::Available),
        };

        if documents.update(&Filter::id(id), &patch).await? > 0 {
            debug!(task_id = id, priority, "Task re-enqueued");
            return Ok(());
        }

        let record = TaskRecord::new(id, payload, priority, sequence);
        if documents.insert(&record).await? {
            debug!(task_id = id, priority, "Task enqueued");
            return Ok(());
        }

        // A concurrent put inserted the id between our update and insert
        documents.update(&Filter::id(id), &patch).await?;
        debug!(task_id = id, priority, "Task re-enqueued after racing insert");
        Ok(())
    }

    /// Payload of an available task. Missing and locked tasks both read as `None`.
    pub async fn get_task(&self, id: &str) -> Result<Option<JsonValue>> {
        self.ensure_open()?;
        let filter = Filter::available().with_id(id);
        let record = self.inner.documents.find_one(&filter).await?;
        Ok(record.map(|r| r.payload))
    }

    /// Remove a task whether or not it is locked. Unknown ids are fine.
    pub async fn delete_task(&self, id: &str) -> Result<()> {
        self.ensure_open()?;
        let removed = self.inner.documents.remove(&Filter::id(id)).await?;
        debug!(task_id = id, removed, "Task deleted");
        Ok(())
    }

    /// Liveness probe: number of available tasks
    pub async fn connect(&self) -> Result<u64> {
        self.ensure_open()?;
        self.inner.documents.count(&Filter::available()).await
    }
}
