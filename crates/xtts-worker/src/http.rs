//! Status listener.
//!
//! A small axum app on the worker's own port: liveness, readiness, model
//! info, and Prometheus metrics. Jobs never flow through this server; they
//! arrive from the queue.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::info;
use xtts_core::{Lang, XttsError, XttsResult};
use xtts_engine::ModelHandle;

use crate::metrics::WorkerMetrics;

/// Shared state for the status routes.
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<ModelHandle>,
    pub metrics: Arc<WorkerMetrics>,
    pub queue_mode: bool,
    pub start_time: Instant,
}

/// Body for the liveness routes.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: u64,
}

/// Body for `/info`.
#[derive(Serialize)]
struct InfoResponse {
    name: &'static str,
    version: &'static str,
    backend: String,
    device: String,
    sample_rate_hz: u32,
    languages: Vec<&'static str>,
    queue_mode: bool,
}

/// Build the status router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/info", get(info_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Bind the status listener.
pub async fn bind(port: u16) -> XttsResult<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    TcpListener::bind(addr)
        .await
        .map_err(|e| XttsError::config(format!("cannot bind status listener on {addr}: {e}")))
}

/// Serve the status routes until shutdown is signalled.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    mut shutdown: watch::Receiver<bool>,
) -> XttsResult<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "status listener started");
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown.changed().await.ok();
        })
        .await
        .map_err(XttsError::Io)?;

    Ok(())
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

// The model loads before the listener starts, so reachable means ready.
async fn ready_handler() -> impl IntoResponse {
    StatusCode::OK
}

async fn info_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        name: "xtts-worker",
        version: env!("CARGO_PKG_VERSION"),
        backend: state.model.model().name().to_string(),
        device: state.model.device().to_string(),
        sample_rate_hz: state.model.sample_rate(),
        languages: Lang::ALL.iter().map(|l| l.code()).collect(),
        queue_mode: state.queue_mode,
    })
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        state.metrics.render(),
    )
}

/// Resolves when the process receives SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
