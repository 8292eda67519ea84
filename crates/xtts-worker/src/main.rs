//! XTTS v2 serverless worker.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};

use xtts_core::WorkerConfig;
use xtts_worker::http::{self, AppState};
use xtts_worker::logging::{self, LogFormat};
use xtts_worker::queue::{self, QueueClient};
use xtts_worker::{load_model, JobHandler, WorkerMetrics};

/// Job file used when no queue credentials are configured.
const DEFAULT_TEST_INPUT: &str = "test_input.json";
/// How long to wait for the status listener to drain on shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// XTTS v2 serverless worker
#[derive(Debug, Parser)]
#[command(name = "xtts-worker")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (RUST_LOG takes precedence)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Log format: json or text (LOG_FORMAT takes precedence)
    #[arg(long, default_value = "json")]
    log_format: String,

    /// Run one job from this file and exit, even with queue credentials
    #[arg(long)]
    test_input: Option<PathBuf>,

    /// Status listener port (overrides XTTS_HTTP_PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let format: LogFormat = std::env::var("LOG_FORMAT")
        .ok()
        .unwrap_or_else(|| args.log_format.clone())
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    logging::init_logging(&args.log_level, format);

    let mut config = WorkerConfig::from_env().context("invalid configuration")?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    let local_override = args.test_input;
    let queue_mode = config.queue_mode() && local_override.is_none();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = %config.backend,
        device = %config.device,
        queue_mode,
        "starting xtts worker"
    );

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("cannot create output dir {}", config.output_dir.display())
    })?;

    let metrics = Arc::new(WorkerMetrics::init().context("metrics init failed")?);
    let model = Arc::new(
        load_model(&config)
            .await
            .context("model initialization failed")?,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    let listener = http::bind(config.http_port)
        .await
        .context("status listener bind failed")?;
    let state = AppState {
        model: Arc::clone(&model),
        metrics: Arc::clone(&metrics),
        queue_mode,
        start_time: Instant::now(),
    };
    let server = tokio::spawn(http::serve(listener, state, shutdown_rx.clone()));

    let handler = JobHandler::new(Arc::clone(&model), Arc::clone(&metrics), config.clone());

    if let Some(path) = local_override {
        run_local_and_print(&handler, &path).await?;
    } else if let Some(queue_config) = config.queue.clone() {
        // A signal flips the shutdown flag; the poll loop finishes its
        // in-flight job before it exits.
        let signal_tx = Arc::clone(&shutdown_tx);
        tokio::spawn(async move {
            http::shutdown_signal().await;
            info!("shutdown signal received, finishing current job");
            let _ = signal_tx.send(true);
        });

        let client = QueueClient::new(queue_config)?;
        client.poll_loop(&handler, shutdown_rx.clone()).await?;
    } else {
        run_local_and_print(&handler, Path::new(DEFAULT_TEST_INPUT)).await?;
    }

    let _ = shutdown_tx.send(true);
    tokio::select! {
        _ = tokio::time::sleep(SHUTDOWN_TIMEOUT) => {
            warn!("shutdown timeout, forcing exit");
        }
        result = server => {
            if let Ok(Err(e)) = result {
                warn!(error = %e, "status listener error");
            }
        }
    }

    info!("worker stopped");
    Ok(())
}

async fn run_local_and_print(handler: &JobHandler, path: &Path) -> Result<()> {
    let outcome = queue::run_local(handler, path).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
