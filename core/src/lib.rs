//! Cadence - durable backing store for task queues
//!
//! Persists queued tasks in a document store and coordinates which worker
//! batch holds which task, surviving restarts. Scheduling policy (retries,
//! concurrency, lease expiry) belongs to the queue engine using the store.

pub mod adapter;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod init;
pub mod sequencer;
pub mod store;
pub mod types;

#[cfg(test)]
pub mod test_helpers;

// Re-export main types
pub use adapter::QueueStoreAdapter;
pub use error::{Result, StoreError};
pub use store::QueueStore;
pub use types::*;

// Re-export init API for convenience
pub use init::{initialize, InitBuilder, InitOptions};
