//! Job metrics with Prometheus export.
//!
//! The recorder is installed once at startup; the rendered snapshot is served
//! by the status listener's `/metrics` route rather than a separate exporter
//! port.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use xtts_core::{XttsError, XttsResult};

/// Metrics recorder for job processing.
#[derive(Clone)]
pub struct WorkerMetrics {
    handle: Option<PrometheusHandle>,
}

impl WorkerMetrics {
    /// Install the global Prometheus recorder. Call once per process.
    pub fn init() -> XttsResult<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| XttsError::internal(format!("metrics init failed: {e}")))?;

        Self::register_metrics();

        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Metrics object without a recorder (for testing).
    pub fn init_noop() -> Self {
        Self { handle: None }
    }

    /// Render the current metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle
            .as_ref()
            .map(PrometheusHandle::render)
            .unwrap_or_default()
    }

    fn register_metrics() {
        describe_counter!("xtts_jobs_total", "Total number of jobs taken");
        describe_counter!(
            "xtts_jobs_succeeded",
            "Total number of jobs completed successfully"
        );
        describe_counter!("xtts_jobs_failed", "Total number of jobs that failed");
        describe_counter!(
            "xtts_jobs_timeout",
            "Total number of jobs that exceeded the synthesis timeout"
        );

        describe_histogram!(
            "xtts_job_duration_ms",
            "End-to-end job handling time in milliseconds"
        );
        describe_histogram!(
            "xtts_synthesis_duration_ms",
            "Model synthesis time in milliseconds"
        );
        describe_histogram!(
            "xtts_audio_duration_ms",
            "Duration of generated audio in milliseconds"
        );
    }

    /// Record a job taken from the queue.
    pub fn job_received(&self) {
        counter!("xtts_jobs_total").increment(1);
    }

    /// Record a job completed successfully.
    pub fn job_succeeded(&self) {
        counter!("xtts_jobs_succeeded").increment(1);
    }

    /// Record a job that failed.
    pub fn job_failed(&self) {
        counter!("xtts_jobs_failed").increment(1);
    }

    /// Record a job that timed out.
    pub fn job_timeout(&self) {
        counter!("xtts_jobs_timeout").increment(1);
    }

    /// Record end-to-end job handling time.
    pub fn record_job_duration(&self, ms: f64) {
        histogram!("xtts_job_duration_ms").record(ms);
    }

    /// Record model synthesis time.
    pub fn record_synthesis_duration(&self, ms: f64) {
        histogram!("xtts_synthesis_duration_ms").record(ms);
    }

    /// Record generated audio duration.
    pub fn record_audio_duration(&self, ms: f64) {
        histogram!("xtts_audio_duration_ms").record(ms);
    }
}

impl std::fmt::Debug for WorkerMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerMetrics")
            .field("recorder", &self.handle.is_some())
            .finish()
    }
}
