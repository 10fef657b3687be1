use thiserror::Error;

/// Result alias used throughout the store
pub type Result<T> = std::result::Result<T, StoreError>;

/// Failures surfaced by the queue store.
///
/// Missing ids and unknown tokens are not errors; those come back as `None`
/// or an empty map. A claim that loses a race for a record drops the record
/// silently. Everything here means the operation had no effect, except for a
/// failed claim, where records already stamped stay locked under the token.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The document store rejected or failed the operation
    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),

    /// A stored payload could not be encoded or decoded
    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A concurrent stamping task panicked or was cancelled
    #[error("claim stamping task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The store has been closed
    #[error("store is closed")]
    Closed,

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl StoreError {
    /// True for failures of the underlying document store
    pub fn is_storage(&self) -> bool {
        matches!(self, StoreError::Storage(_) | StoreError::Serialization(_))
    }
}
