//! Document store port
//!
//! The queue store only needs a handful of per-document primitives: point
//! lookup, filtered scans with the claim ordering, single-document conditional
//! updates and removal. Nothing here spans more than one document atomically.
//!
//! Two implementations ship with the crate:
//! - `SqliteDocumentStore`: one SQLite file per queue (durable)
//! - `MemoryDocumentStore`: a map behind a lock (tests, ephemeral queues)

mod memory;
mod sqlite;

pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;

use std::cmp::Reverse;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::types::{LockState, LockToken, TakeOrder, TaskRecord};

/// Predicate on the lock column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockFilter {
    /// Lock equals the available sentinel
    Available,
    /// Lock equals this token
    Held(LockToken),
    /// Lock is anything but the sentinel
    AnyHeld,
}

/// Conjunction of equality/existence conditions. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub id: Option<String>,
    pub lock: Option<LockFilter>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            lock: None,
        }
    }

    pub fn available() -> Self {
        Self::all().with_lock(LockFilter::Available)
    }

    pub fn held(token: &LockToken) -> Self {
        Self::all().with_lock(LockFilter::Held(token.clone()))
    }

    pub fn any_held() -> Self {
        Self::all().with_lock(LockFilter::AnyHeld)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_lock(mut self, lock: LockFilter) -> Self {
        self.lock = Some(lock);
        self
    }

    pub fn matches(&self, record: &TaskRecord) -> bool {
        if let Some(id) = &self.id {
            if &record.id != id {
                return false;
            }
        }
        match &self.lock {
            None => true,
            Some(LockFilter::Available) => record.lock.is_available(),
            Some(LockFilter::Held(token)) => record.lock.token() == Some(token),
            Some(LockFilter::AnyHeld) => !record.lock.is_available(),
        }
    }
}

/// Fields to overwrite on matching documents. `updated_at` is always refreshed.
///
/// `sequence` is a lower bound: the stored value is raised past every sequence
/// already in the store, so it is only meaningful for single-document filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    pub payload: Option<JsonValue>,
    pub priority: Option<i64>,
    pub sequence: Option<i64>,
    pub lock: Option<LockState>,
}

impl Patch {
    pub fn lock(lock: LockState) -> Self {
        Self {
            lock: Some(lock),
            ..Self::default()
        }
    }

    /// Apply to an in-memory record
    pub fn apply(&self, record: &mut TaskRecord) {
        if let Some(payload) = &self.payload {
            record.payload = payload.clone();
        }
        if let Some(priority) = self.priority {
            record.priority = priority;
        }
        if let Some(sequence) = self.sequence {
            record.sequence = sequence;
        }
        if let Some(lock) = &self.lock {
            record.lock = lock.clone();
        }
        record.updated_at = chrono::Utc::now();
    }
}

/// Claim ordering: priority descending, then sequence per `order`.
/// Without an order, plain ascending sequence.
pub fn sort_records(records: &mut [TaskRecord], order: Option<TakeOrder>) {
    match order {
        Some(TakeOrder::OldestFirst) => records.sort_by_key(|r| (Reverse(r.priority), r.sequence)),
        Some(TakeOrder::NewestFirst) => {
            records.sort_by_key(|r| (Reverse(r.priority), Reverse(r.sequence)))
        }
        None => records.sort_by_key(|r| r.sequence),
    }
}

/// Persistent mapping from task id to task document
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// First document matching `filter`
    async fn find_one(&self, filter: &Filter) -> Result<Option<TaskRecord>>;

    /// Matching documents, sorted (see `sort_records`) and limited
    async fn find(
        &self,
        filter: &Filter,
        order: Option<TakeOrder>,
        limit: Option<usize>,
    ) -> Result<Vec<TaskRecord>>;

    async fn count(&self, filter: &Filter) -> Result<u64>;

    /// Insert a new document. Returns false, writing nothing, if the id exists.
    ///
    /// `record.sequence` is a lower bound, as for `Patch::sequence`; the stored
    /// sequence is also above every sequence already stored.
    async fn insert(&self, record: &TaskRecord) -> Result<bool>;

    /// Patch every matching document; returns how many matched.
    ///
    /// Each document is checked and written atomically, so a filter on the
    /// lock column acts as a compare-and-swap.
    async fn update(&self, filter: &Filter, patch: &Patch) -> Result<u64>;

    /// Remove every matching document; returns how many were removed
    async fn remove(&self, filter: &Filter) -> Result<u64>;

    /// Highest stored sequence, 0 when empty
    async fn max_sequence(&self) -> Result<i64>;

    /// Release the underlying handle
    async fn close(&self) -> Result<()>;
}
