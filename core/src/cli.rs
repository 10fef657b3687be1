use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value as JsonValue;

use crate::document::SqliteDocumentStore;
use crate::init::InitBuilder;
use crate::store::QueueStore;
use crate::types::{LockToken, TakeOrder};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Cadence - durable task queue store administration", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Database file (overrides config file and env vars)
    #[arg(long, global = true)]
    pub database: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Count available tasks
    Count,

    /// Enqueue a task (replaces and unlocks an existing one)
    Put {
        /// Task ID
        task_id: String,

        /// Task payload (JSON string)
        payload: String,

        /// Priority (higher is claimed first)
        #[arg(short = 'p', long = "priority", default_value = "0")]
        priority: i64,
    },

    /// Show the payload of an available task
    Get {
        /// Task ID
        task_id: String,
    },

    /// Delete a task, locked or not
    Delete {
        /// Task ID
        task_id: String,
    },

    /// Claim a batch of tasks and print its lock token
    Take {
        /// Maximum number of tasks to claim
        n: usize,

        /// Take newest tasks first among equal priority
        #[arg(long)]
        newest: bool,
    },

    /// Show the tasks held under a lock token
    Lock {
        /// Lock token
        token: String,
    },

    /// List every locked batch
    Running,

    /// Delete every task held under a lock token
    Release {
        /// Lock token
        token: String,
    },

    /// Print the effective configuration
    Config,
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = InitBuilder::new();
    if let Some(path) = &cli.config {
        builder = builder.config_path(path);
    }
    if let Some(path) = &cli.database {
        builder = builder.database_path(path);
    }

    if let Commands::Config = cli.command {
        let config = builder.config()?;
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let store = builder.init().await?;
    let result = run_command(&store, cli.command).await;
    store.close().await?;
    result
}

async fn run_command(store: &QueueStore<SqliteDocumentStore>, command: Commands) -> Result<()> {
    match command {
        Commands::Count => {
            println!("{}", store.connect().await?);
        }

        Commands::Put {
            task_id,
            payload,
            priority,
        } => {
            let payload: JsonValue =
                serde_json::from_str(&payload).context("Payload must be valid JSON")?;
            store.put_task(&task_id, payload, priority).await?;
            println!("Enqueued {}", task_id);
        }

        Commands::Get { task_id } => match store.get_task(&task_id).await? {
            Some(payload) => println!("{}", serde_json::to_string_pretty(&payload)?),
            None => println!("Task {} not found or locked", task_id),
        },

        Commands::Delete { task_id } => {
            store.delete_task(&task_id).await?;
            println!("Deleted {}", task_id);
        }

        Commands::Take { n, newest } => {
            let order = if newest {
                TakeOrder::NewestFirst
            } else {
                TakeOrder::OldestFirst
            };
            match store.take_n(n, order).await? {
                Some(token) => println!("{}", token),
                None => println!("No tasks available"),
            }
        }

        Commands::Lock { token } => {
            let records = store.locked_tasks(&LockToken::from(token)).await?;
            if records.is_empty() {
                println!("No tasks held under this token");
            }
            for record in records {
                println!(
                    "{:<36}  priority={:<4} seq={:<8} locked_at={}  {}",
                    record.id,
                    record.priority,
                    record.sequence,
                    record.updated_at.format("%Y-%m-%d %H:%M:%S"),
                    record.payload
                );
            }
        }

        Commands::Running => {
            let running = store.running_tasks().await?;
            println!("{}", serde_json::to_string_pretty(&running)?);
        }

        Commands::Release { token } => {
            store.release_lock(&LockToken::from(token)).await?;
            println!("Released");
        }

        // Printed before the store is opened
        Commands::Config => {}
    }

    Ok(())
}
