use clap::Parser;
use log_analyzer::config::CoordinationConfig;
use log_analyzer::coordinator::coordinator::Coordinator;
use log_analyzer::coordinator::detector::spawn_failure_detector;
use log_analyzer::coordinator::handlers::router;
use log_analyzer::telemetry::init_tracing;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "coordinator", about = "Splits a log file into chunks and schedules them across workers")]
struct Args {
    #[arg(long, env = "LOG_ANALYZER_PORT", default_value_t = 8000)]
    port: u16,

    #[arg(long, env = "LOG_ANALYZER_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Log file to analyze once the registration window has passed.
    #[arg(long)]
    file: Option<PathBuf>,

    /// How long to wait for workers to register before partitioning `--file`.
    #[arg(long, env = "LOG_ANALYZER_REGISTRATION_WINDOW_MS", default_value_t = 3_000)]
    registration_window_ms: u64,

    /// Keep serving after the report has been printed.
    #[arg(long, default_value_t = false)]
    keep_running: bool,

    #[command(flatten)]
    coordination: CoordinationConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    // 1. Coordinator state and failure detector:
    let coordinator = Coordinator::new(args.coordination.clone())?;
    let _detector = spawn_failure_detector(coordinator.clone());

    // 2. HTTP server:
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Coordinator listening on {}", listener.local_addr()?);

    let app = router(coordinator.clone());
    let mut server = tokio::spawn(async move { axum::serve(listener, app).await });

    // 3. Optional job from the command line:
    let Some(file) = args.file else {
        tracing::info!("No --file given; waiting for POST /job. Press Ctrl+C to shutdown");
        tokio::select! {
            result = &mut server => result??,
            _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
        }
        return Ok(());
    };

    tracing::info!(
        "Waiting {}ms for workers to register before starting {:?}",
        args.registration_window_ms,
        file
    );
    tokio::time::sleep(Duration::from_millis(args.registration_window_ms)).await;

    let mut completion = coordinator.subscribe_completion();
    let started = coordinator.start_job(file, None).await?;
    tracing::info!("Job started: {} chunks over {} bytes", started.chunks, started.file_size);

    let report = tokio::select! {
        report = completion.wait_for(|report| report.is_some()) => report?.clone(),
        result = &mut server => {
            result??;
            anyhow::bail!("HTTP server stopped before the job completed");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted before the job completed");
            return Ok(());
        }
    };

    if let Some(report) = report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if args.keep_running {
        tracing::info!("Report printed; still serving. Press Ctrl+C to shutdown");
        tokio::select! {
            result = &mut server => result??,
            _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
        }
    }

    Ok(())
}
