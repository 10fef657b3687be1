use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{sort_records, DocumentStore, Filter, Patch};
use crate::error::{Result, StoreError};
use crate::types::{TakeOrder, TaskRecord};

/// Non-durable document store backed by a map.
///
/// Every write takes the write lock for its whole duration, which gives the
/// same per-document atomicity the SQLite store gets from single statements.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<String, TaskRecord>>,
    closed: AtomicBool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

fn next_sequence(documents: &HashMap<String, TaskRecord>) -> i64 {
    documents.values().map(|r| r.sequence).max().unwrap_or(0) + 1
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find_one(&self, filter: &Filter) -> Result<Option<TaskRecord>> {
        self.ensure_open()?;
        let documents = self.documents.read().await;

        if let Some(id) = &filter.id {
            return Ok(documents.get(id).filter(|r| filter.matches(r)).cloned());
        }
        Ok(documents.values().find(|r| filter.matches(r)).cloned())
    }

    async fn find(
        &self,
        filter: &Filter,
        order: Option<TakeOrder>,
        limit: Option<usize>,
    ) -> Result<Vec<TaskRecord>> {
        self.ensure_open()?;
        let documents = self.documents.read().await;

        let mut records: Vec<TaskRecord> = documents
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        sort_records(&mut records, order);
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    async fn count(&self, filter: &Filter) -> Result<u64> {
        self.ensure_open()?;
        let documents = self.documents.read().await;
        Ok(documents.values().filter(|r| filter.matches(r)).count() as u64)
    }

    async fn insert(&self, record: &TaskRecord) -> Result<bool> {
        self.ensure_open()?;
        let mut documents = self.documents.write().await;

        if documents.contains_key(&record.id) {
            return Ok(false);
        }
        let mut record = record.clone();
        record.sequence = record.sequence.max(next_sequence(&documents));
        documents.insert(record.id.clone(), record);
        Ok(true)
    }

    async fn update(&self, filter: &Filter, patch: &Patch) -> Result<u64> {
        self.ensure_open()?;
        let mut documents = self.documents.write().await;

        let mut patch = patch.clone();
        if let Some(sequence) = patch.sequence.as_mut() {
            *sequence = (*sequence).max(next_sequence(&documents));
        }

        let mut matched = 0;
        for record in documents.values_mut().filter(|r| filter.matches(r)) {
            patch.apply(record);
            matched += 1;
        }
        Ok(matched)
    }

    async fn remove(&self, filter: &Filter) -> Result<u64> {
        self.ensure_open()?;
        let mut documents = self.documents.write().await;

        let before = documents.len();
        documents.retain(|_, r| !filter.matches(r));
        Ok((before - documents.len()) as u64)
    }

    async fn max_sequence(&self) -> Result<i64> {
        self.ensure_open()?;
        let documents = self.documents.read().await;
        Ok(documents.values().map(|r| r.sequence).max().unwrap_or(0))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::LockFilter;
    use crate::types::{LockState, LockToken};
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_refuses_existing_id() {
        let store = MemoryDocumentStore::new();
        let record = TaskRecord::new("a", json!(1), 0, 1);

        assert!(store.insert(&record).await.unwrap());
        assert!(!store.insert(&TaskRecord::new("a", json!(2), 0, 2)).await.unwrap());

        let found = store.find_one(&Filter::id("a")).await.unwrap().unwrap();
        assert_eq!(found.payload, json!(1));
    }

    #[tokio::test]
    async fn test_conditional_update_only_hits_available() {
        let store = MemoryDocumentStore::new();
        store.insert(&TaskRecord::new("a", json!(1), 0, 1)).await.unwrap();

        let cas = Filter::id("a").with_lock(LockFilter::Available);
        let first = Patch::lock(LockState::Held(LockToken::from("t1")));
        let second = Patch::lock(LockState::Held(LockToken::from("t2")));

        assert_eq!(store.update(&cas, &first).await.unwrap(), 1);
        assert_eq!(store.update(&cas, &second).await.unwrap(), 0);

        let found = store.find_one(&Filter::id("a")).await.unwrap().unwrap();
        assert_eq!(found.lock.as_stored(), "t1");
    }

    #[tokio::test]
    async fn test_find_sorts_and_limits() {
        let store = MemoryDocumentStore::new();
        for (id, priority, seq) in [("a", 1, 1), ("b", 5, 2), ("c", 1, 3), ("d", 0, 4)] {
            store
                .insert(&TaskRecord::new(id, json!(id), priority, seq))
                .await
                .unwrap();
        }

        let found = store
            .find(&Filter::available(), Some(TakeOrder::OldestFirst), Some(3))
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(store.max_sequence().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_stale_sequence_is_raised_past_stored_maximum() {
        let store = MemoryDocumentStore::new();
        store.insert(&TaskRecord::new("a", json!(1), 0, 5)).await.unwrap();
        store.insert(&TaskRecord::new("b", json!(2), 0, 3)).await.unwrap();

        let repost = Patch {
            sequence: Some(1),
            ..Patch::default()
        };
        store.update(&Filter::id("a"), &repost).await.unwrap();

        let found = store.find(&Filter::all(), None, None).await.unwrap();
        let sequences: Vec<_> = found.iter().map(|r| (r.id.as_str(), r.sequence)).collect();
        assert_eq!(sequences, vec![("b", 6), ("a", 7)]);
    }

    #[tokio::test]
    async fn test_remove_counts_and_close_rejects() {
        let store = MemoryDocumentStore::new();
        store.insert(&TaskRecord::new("a", json!(1), 0, 1)).await.unwrap();

        assert_eq!(store.remove(&Filter::id("a")).await.unwrap(), 1);
        assert_eq!(store.remove(&Filter::id("a")).await.unwrap(), 0);

        store.close().await.unwrap();
        assert!(matches!(
            store.count(&Filter::all()).await,
            Err(StoreError::Closed)
        ));
    }
}
