//! Test helpers for store tests

use std::path::PathBuf;

use crate::config::Config;
use crate::document::{MemoryDocumentStore, SqliteDocumentStore};
use crate::store::QueueStore;

/// Uniquely named SQLite file in the temp directory, removed on drop
pub struct TestDb {
    path: PathBuf,
}

impl TestDb {
    pub fn new() -> Self {
        let path = std::env::temp_dir().join(format!("cadence-test-{}.db", uuid::Uuid::new_v4()));
        Self { path }
    }

    pub fn path(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    pub fn config(&self) -> Config {
        Config {
            database_path: self.path(),
            ..Config::default()
        }
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

/// File-backed store; keep the guard alive for the duration of the test
pub async fn with_test_store() -> (QueueStore<SqliteDocumentStore>, TestDb) {
    let db = TestDb::new();
    let documents = SqliteDocumentStore::open(&db.config())
        .await
        .expect("Failed to open test database");
    let store = QueueStore::open(documents)
        .await
        .expect("Failed to open test store");
    (store, db)
}

/// Store over the in-memory document store
pub async fn memory_store() -> QueueStore<MemoryDocumentStore> {
    QueueStore::open(MemoryDocumentStore::new())
        .await
        .expect("Failed to open memory store")
}
