/// Cadence CLI
///
/// Administrative commands over a queue store file: inspect, enqueue, claim
/// and release tasks without running a queue engine. Useful for operators and
/// for recovering batches left locked by a crashed worker.
use cadence_core::cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run_cli().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
