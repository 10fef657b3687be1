use std::sync::atomic::{AtomicI64, Ordering};

use crate::document::DocumentStore;
use crate::error::Result;

/// Issues the insertion ranks used to break priority ties.
///
/// Values are strictly increasing and never handed out twice within a
/// process. On startup the counter resumes after the highest sequence already
/// stored, so numbering carries across restarts. Other processes may write to
/// the same store, so a value is a proposal: the document store raises it past
/// the stored maximum when it writes.
#[derive(Debug)]
pub struct Sequencer {
    last: AtomicI64,
}

impl Sequencer {
    /// Counter whose next value is `last + 1`
    pub fn starting_after(last: i64) -> Self {
        Self {
            last: AtomicI64::new(last),
        }
    }

    /// Resume from the highest sequence present in `documents`
    pub async fn recover<D: DocumentStore>(documents: &D) -> Result<Self> {
        let last = documents.max_sequence().await?;
        Ok(Self::starting_after(last))
    }

    pub fn next(&self) -> i64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Most recently issued value
    pub fn last(&self) -> i64 {
        self.last.load(Ordering::SeqCst)
    }
}
