use clap::Parser;
use log_analyzer::config::WorkerConfig;
use log_analyzer::parser::line::ResponseTimeParser;
use log_analyzer::registry::types::WorkerId;
use log_analyzer::telemetry::init_tracing;
use log_analyzer::worker::client::CoordinatorClient;
use log_analyzer::worker::worker::Worker;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "worker", about = "Pulls log chunks from a coordinator and reports their metrics")]
struct Args {
    /// Informational only; workers never accept inbound connections.
    #[arg(long, env = "LOG_ANALYZER_WORKER_PORT", default_value_t = 9000)]
    port: u16,

    #[arg(long, env = "LOG_ANALYZER_WORKER_ID")]
    id: String,

    /// Base URL of the coordinator, e.g. `http://127.0.0.1:8000`.
    #[arg(long, env = "LOG_ANALYZER_COORDINATOR")]
    coordinator: String,

    #[command(flatten)]
    worker: WorkerConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    tracing::info!(
        "Worker {} (port {}) using coordinator {}",
        args.id,
        args.port,
        args.coordinator
    );

    let client = Arc::new(CoordinatorClient::new(args.coordinator, args.worker.clone())?);
    let worker = Worker::new(
        WorkerId::from(args.id.as_str()),
        client,
        Arc::new(ResponseTimeParser),
        args.worker,
    );

    let summary = worker.run().await?;
    tracing::info!(
        "Worker finished: {} chunks processed, {} stale, {} abandoned, {} re-registrations",
        summary.chunks_processed,
        summary.stale_submissions,
        summary.abandoned_submissions,
        summary.reregistrations
    );

    Ok(())
}
