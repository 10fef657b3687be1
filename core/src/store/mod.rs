// Queue store
//
// This module owns the claim/lock protocol over a document store:
// - Enqueueing, reading and deleting tasks by id
// - Claiming batches of available tasks under a fresh lock token
// - Reading, enumerating and releasing locked batches

mod claim;
mod locks;
mod tasks;


use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::document::DocumentStore;
use crate::error::{Result, StoreError};
use crate::sequencer::Sequencer;

/// Durable task queue store.
///
/// Cloning is cheap; clones share the document store handle and the
/// sequencer. Nothing is held between calls, so any number of callers may
/// use the store concurrently.
pub struct QueueStore<D: DocumentStore> {
    inner: Arc<Inner<D>>,
}

struct Inner<D> {
    documents: D,
    sequencer: Sequencer,
    closed: AtomicBool,
}

impl<D: DocumentStore> Clone for QueueStore<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: DocumentStore> QueueStore<D> {
    /// Wrap an opened document store, recovering the sequencer from it
    pub async fn open(documents: D) -> Result<Self> {
        let sequencer = Sequencer::recover(&documents).await?;
        info!(last_sequence = sequencer.last(), "Queue store ready");

        Ok(Self {
            inner: Arc::new(Inner {
                documents,
                sequencer,
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// The underlying document store
    pub fn documents(&self) -> &D {
        &self.inner.documents
    }

    /// Last sequence handed out
    pub fn last_sequence(&self) -> i64 {
        self.inner.sequencer.last()
    }

    /// Release the document store handle. Later calls fail with `Closed`;
    /// closing twice is a no-op.
    pub async fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.inner.documents.close().await?;
        info!("Queue store closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}
