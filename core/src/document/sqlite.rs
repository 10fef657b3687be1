use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, info};

use super::{DocumentStore, Filter, LockFilter, Patch};
use crate::config::Config;
use crate::error::Result;
use crate::types::{LockState, TakeOrder, TaskRecord};

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS tasks (
        id          TEXT PRIMARY KEY NOT NULL,
        payload     TEXT NOT NULL,
        priority    INTEGER NOT NULL DEFAULT 0,
        sequence    INTEGER NOT NULL UNIQUE,
        lock        TEXT NOT NULL DEFAULT '',
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL
    )
"#;

const CREATE_CLAIM_INDEX: &str = r#"
    CREATE INDEX IF NOT EXISTS tasks_claim_order
    ON tasks (lock, priority DESC, sequence)
"#;

const SELECT_COLUMNS: &str =
    "SELECT id, payload, priority, sequence, lock, created_at, updated_at FROM tasks";

/// Durable document store: one SQLite file per queue.
///
/// Every operation is a single SQL statement, so each document is read and
/// written atomically; nothing here opens a multi-statement transaction.
/// Sequences are settled inside the writing statement against the file's
/// current maximum, so several processes can share one queue file.
#[derive(Debug, Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    /// Open (creating if needed) the database named by `config.database_path`.
    ///
    /// `:memory:` opens a private in-memory database held by a single
    /// connection, which lives as long as the store.
    pub async fn open(config: &Config) -> Result<Self> {
        config.validate()?;

        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        let pool = if config.is_in_memory() {
            let options = SqliteConnectOptions::from_str("sqlite::memory:")?.busy_timeout(busy_timeout);
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            let options = SqliteConnectOptions::new()
                .filename(&config.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(busy_timeout);
            SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .connect_with(options)
                .await?
        };

        let store = Self { pool };
        store.ensure_schema().await?;

        info!(
            database = %config.database_path,
            max_connections = config.max_connections,
            "Opened task document store"
        );
        Ok(store)
    }

    /// Private in-memory store with default settings
    pub async fn in_memory() -> Result<Self> {
        Self::open(&Config::in_memory()).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_CLAIM_INDEX).execute(&self.pool).await?;
        Ok(())
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &Filter) {
    builder.push(" WHERE 1 = 1");
    if let Some(id) = &filter.id {
        builder.push(" AND id = ").push_bind(id.clone());
    }
    match &filter.lock {
        None => {}
        Some(LockFilter::Available) => {
            builder.push(" AND lock = ''");
        }
        Some(LockFilter::Held(token)) => {
            builder.push(" AND lock = ").push_bind(token.as_str().to_string());
        }
        Some(LockFilter::AnyHeld) => {
            builder.push(" AND lock <> ''");
        }
    }
}

fn record_from_row(row: &SqliteRow) -> Result<TaskRecord> {
    let payload: String = row.try_get("payload")?;
    let lock: String = row.try_get("lock")?;

    Ok(TaskRecord {
        id: row.try_get("id")?,
        payload: serde_json::from_str(&payload)?,
        priority: row.try_get("priority")?,
        sequence: row.try_get("sequence")?,
        lock: LockState::from(lock),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn find_one(&self, filter: &Filter) -> Result<Option<TaskRecord>> {
        let mut records = self.find(filter, None, Some(1)).await?;
        Ok(records.pop())
    }

    async fn find(
        &self,
        filter: &Filter,
        order: Option<TakeOrder>,
        limit: Option<usize>,
    ) -> Result<Vec<TaskRecord>> {
        let mut builder = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        push_filter(&mut builder, filter);
        builder.push(match order {
            Some(TakeOrder::OldestFirst) => " ORDER BY priority DESC, sequence ASC",
            Some(TakeOrder::NewestFirst) => " ORDER BY priority DESC, sequence DESC",
            None => " ORDER BY sequence ASC",
        });
        if let Some(limit) = limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn count(&self, filter: &Filter) -> Result<u64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM tasks");
        push_filter(&mut builder, filter);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn insert(&self, record: &TaskRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO tasks (id, payload, priority, sequence, lock, created_at, updated_at)
            VALUES (?, ?, ?, MAX(?, (SELECT COALESCE(MAX(sequence), 0) + 1 FROM tasks)), ?, ?, ?)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&record.id)
        .bind(serde_json::to_string(&record.payload)?)
        .bind(record.priority)
        .bind(record.sequence)
        .bind(record.lock.as_stored())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update(&self, filter: &Filter, patch: &Patch) -> Result<u64> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE tasks SET updated_at = ");
        builder.push_bind(Utc::now());
        if let Some(payload) = &patch.payload {
            builder
                .push(", payload = ")
                .push_bind(serde_json::to_string(payload)?);
        }
        if let Some(priority) = patch.priority {
            builder.push(", priority = ").push_bind(priority);
        }
        if let Some(sequence) = patch.sequence {
            builder
                .push(", sequence = MAX(")
                .push_bind(sequence)
                .push(", (SELECT COALESCE(MAX(sequence), 0) + 1 FROM tasks))");
        }
        if let Some(lock) = &patch.lock {
            builder
                .push(", lock = ")
                .push_bind(lock.as_stored().to_string());
        }
        push_filter(&mut builder, filter);

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn remove(&self, filter: &Filter) -> Result<u64> {
        let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM tasks");
        push_filter(&mut builder, filter);

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn max_sequence(&self) -> Result<i64> {
        let max: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(sequence), 0) FROM tasks")
            .fetch_one(&self.pool)
            .await?;
        Ok(max)
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        debug!("Closed task document store");
        Ok(())
    }
}
