//! Opening a store
//!
//! Loads configuration, opens the SQLite document store and recovers the
//! queue store on top of it. Nothing is kept in global state; the caller owns
//! the returned store and shares it by cloning.
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_core::init::InitBuilder;
//!
//! # async fn run() -> anyhow::Result<()> {
//! // Configuration from cadence.toml / CADENCE_* env vars
//! let store = InitBuilder::new().init().await?;
//!
//! // Explicit database file
//! let store = InitBuilder::new()
//!     .database_path("queues/mail.db")
//!     .init()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::document::SqliteDocumentStore;
use crate::store::QueueStore;

/// Options for opening a store
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Database path (overrides config file and env vars)
    pub database_path: Option<String>,

    /// Config file path (overrides default search)
    pub config_path: Option<String>,
}

/// Builder for constructing InitOptions
#[derive(Debug, Default)]
pub struct InitBuilder {
    options: InitOptions,
}

impl InitBuilder {
    /// Create a new builder with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the database path
    pub fn database_path(mut self, path: impl Into<String>) -> Self {
        self.options.database_path = Some(path.into());
        self
    }

    /// Set the config file path
    pub fn config_path(mut self, path: impl Into<String>) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    /// Resolve the configuration without opening anything
    pub fn config(&self) -> Result<Config> {
        resolve_config(&self.options)
    }

    /// Open the store with the configured options
    pub async fn init(self) -> Result<QueueStore<SqliteDocumentStore>> {
        initialize(self.options).await
    }
}

fn resolve_config(options: &InitOptions) -> Result<Config> {
    let config_path = options
        .config_path
        .clone()
        .or_else(|| std::env::var("CADENCE_CONFIG_PATH").ok());

    let mut config =
        Config::load_from(config_path.as_deref()).context("Failed to load configuration")?;
    if let Some(path) = &options.database_path {
        config.database_path = path.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Open a store with the given options
pub async fn initialize(options: InitOptions) -> Result<QueueStore<SqliteDocumentStore>> {
    let config = resolve_config(&options)?;

    let documents = SqliteDocumentStore::open(&config)
        .await
        .with_context(|| format!("Failed to open database '{}'", config.database_path))?;
    let store = QueueStore::open(documents)
        .await
        .context("Failed to recover queue store")?;

    info!(database = %config.database_path, "Store initialized");
    Ok(store)
}
