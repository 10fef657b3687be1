use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::QueueStore;
use crate::document::{DocumentStore, Filter, LockFilter, Patch};
use crate::error::{Result, StoreError};
use crate::types::{LockState, LockToken, TakeOrder};

impl<D: DocumentStore> QueueStore<D> {
    /// Claim up to `n` tasks, oldest first among equal priority
    pub async fn take_first_n(&self, n: usize) -> Result<Option<LockToken>> {
        self.take_n(n, TakeOrder::OldestFirst).await
    }

    /// Claim up to `n` tasks, newest first among equal priority
    pub async fn take_last_n(&self, n: usize) -> Result<Option<LockToken>> {
        self.take_n(n, TakeOrder::NewestFirst).await
    }

    /// Claim up to `n` available tasks under a fresh lock token.
    ///
    /// Selection is one scan ordered by priority descending, then sequence per
    /// `order`. Each selected task is then stamped with a conditional update
    /// that only applies while the task is still available, so a task can
    /// never end up in two batches. Tasks taken by a concurrent claim between
    /// the scan and the stamp are dropped from this batch, which may therefore
    /// hold fewer than `n` tasks.
    ///
    /// Returns `None` when nothing was stamped. If a stamp fails, the error is
    /// returned after every stamp has resolved; tasks already stamped stay
    /// locked and show up in `running_tasks`.
    pub async fn take_n(&self, n: usize, order: TakeOrder) -> Result<Option<LockToken>> {
        self.ensure_open()?;
        if n == 0 {
            return Ok(None);
        }

        let candidates = self
            .inner
            .documents
            .find(&Filter::available(), Some(order), Some(n))
            .await?;
        if candidates.is_empty() {
            debug!(requested = n, "No available tasks to claim");
            return Ok(None);
        }

        let token = LockToken::generate();
        let selected = candidates.len();

        let mut stamps = JoinSet::new();
        for record in candidates {
            let inner = Arc::clone(&self.inner);
            let filter = Filter::id(record.id.clone()).with_lock(LockFilter::Available);
            let patch = Patch::lock(LockState::Held(token.clone()));
            stamps.spawn(async move {
                let affected = inner.documents.update(&filter, &patch).await?;
                Ok::<_, StoreError>((record.id, affected > 0))
            });
        }

        let mut stamped = 0;
        let mut failure = None;
        while let Some(joined) = stamps.join_next().await {
            match joined {
                Ok(Ok((_, true))) => stamped += 1,
                Ok(Ok((task_id, false))) => {
                    debug!(task_id = %task_id, "Task taken by a concurrent claim, skipped");
                }
                Ok(Err(e)) => {
                    failure.get_or_insert(e);
                }
                Err(e) => {
                    failure.get_or_insert(StoreError::from(e));
                }
            }
        }

        if let Some(e) = failure {
            warn!(
                token = %token,
                stamped,
                error = %e,
                "Claim failed part-way; stamped tasks remain locked"
            );
            return Err(e);
        }

        if stamped == 0 {
            debug!(selected, "Every selected task was claimed concurrently");
            return Ok(None);
        }

        debug!(token = %token, selected, stamped, ?order, "Claimed batch");
        Ok(Some(token))
    }
}
