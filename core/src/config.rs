//! Store configuration
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. A TOML file: `CADENCE_CONFIG_PATH`, or `cadence.toml` in the working directory if present
//! 3. `CADENCE_*` environment variables (a `.env` file is loaded first)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

const IN_MEMORY_PATH: &str = ":memory:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// SQLite file holding the queue, or `:memory:`
    pub database_path: String,

    /// Connection pool size for file-backed stores
    pub max_connections: u32,

    /// How long a writer waits on a locked database before failing
    pub busy_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "cadence.db".to_string(),
            max_connections: 5,
            busy_timeout_ms: 5_000,
        }
    }
}

impl Config {
    /// Load using `CADENCE_CONFIG_PATH` when set
    pub fn load() -> Result<Self> {
        let path = std::env::var("CADENCE_CONFIG_PATH").ok();
        Self::load_from(path.as_deref())
    }

    /// Load with an explicit config file. A missing explicit file is an error.
    pub fn load_from(path: Option<&str>) -> Result<Self> {
        env_file_loaded(dotenvy::dotenv())?;

        let defaults = Config::default();
        let file = match path {
            Some(path) => ::config::File::with_name(path).required(true),
            None => ::config::File::with_name("cadence").required(false),
        };

        let config: Config = ::config::Config::builder()
            .set_default("database_path", defaults.database_path)?
            .set_default("max_connections", i64::from(defaults.max_connections))?
            .set_default("busy_timeout_ms", defaults.busy_timeout_ms as i64)?
            .add_source(file)
            .add_source(::config::Environment::with_prefix("CADENCE").try_parsing(true))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Private in-memory database with default pool settings
    pub fn in_memory() -> Self {
        Self {
            database_path: IN_MEMORY_PATH.to_string(),
            ..Self::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == IN_MEMORY_PATH || self.database_path == "sqlite::memory:"
    }

    pub fn validate(&self) -> std::result::Result<(), StoreError> {
        if self.database_path.trim().is_empty() {
            return Err(StoreError::Config("database_path must not be empty".into()));
        }
        if self.max_connections == 0 {
            return Err(StoreError::Config(
                "max_connections must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// A missing `.env` is fine; an unreadable or malformed one is not
fn env_file_loaded<T>(result: std::result::Result<T, dotenvy::Error>) -> Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e).context("Failed to load .env file"),
    }
}
