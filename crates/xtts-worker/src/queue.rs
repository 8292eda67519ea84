//! Job queue client.
//!
//! Polls the platform's job-take endpoint, hands each job to the handler, and
//! posts the outcome back. Jobs are processed strictly one at a time; the
//! worker never holds more than one job. Without queue credentials the worker
//! instead runs a single job from a local test file.

use std::path::Path;
use std::time::Duration;

use reqwest::StatusCode;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use xtts_core::{JobOutcome, JobRequest, QueueConfig, XttsError, XttsResult};

use crate::handler::JobHandler;

/// Delay between polls when the queue is empty.
const POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Upper bound for the error backoff.
const MAX_BACKOFF: Duration = Duration::from_secs(30);
/// Timeout for a single queue HTTP call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the serverless job queue.
pub struct QueueClient {
    client: reqwest::Client,
    queue: QueueConfig,
}

impl QueueClient {
    pub fn new(queue: QueueConfig) -> XttsResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| XttsError::internal(format!("http client: {e}")))?;
        Ok(Self { client, queue })
    }

    /// Ask the queue for one job. `None` means the queue is empty.
    pub async fn take_job(&self) -> XttsResult<Option<JobRequest>> {
        let response = self
            .client
            .get(&self.queue.take_url)
            .bearer_auth(&self.queue.api_key)
            .send()
            .await
            .map_err(|e| XttsError::queue(format!("job take request failed: {e}")))?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(None),
            status if status.is_success() => {
                let job = response
                    .json::<JobRequest>()
                    .await
                    .map_err(|e| XttsError::queue(format!("malformed job payload: {e}")))?;
                debug!(job_id = %job.id, "job taken");
                Ok(Some(job))
            }
            status => Err(XttsError::queue(format!("job take returned {status}"))),
        }
    }

    /// Post a finished job's outcome back to the queue.
    pub async fn submit_result(&self, job_id: &str, outcome: &JobOutcome) -> XttsResult<()> {
        let url = self.queue.done_url(job_id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.queue.api_key)
            .json(outcome)
            .send()
            .await
            .map_err(|e| XttsError::queue(format!("job submit request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(XttsError::queue(format!("job submit returned {status}")));
        }
        debug!(job_id, "result submitted");
        Ok(())
    }

    /// Poll for jobs until shutdown is signalled.
    ///
    /// An in-flight job always runs to completion and its result is
    /// submitted; the shutdown flag is only consulted between jobs. Poll
    /// errors back off exponentially up to [`MAX_BACKOFF`].
    pub async fn poll_loop(
        &self,
        handler: &JobHandler,
        mut shutdown: watch::Receiver<bool>,
    ) -> XttsResult<()> {
        info!(worker_id = %self.queue.worker_id, "polling for jobs");
        let mut backoff = POLL_INTERVAL;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let wait = match self.take_job().await {
                Ok(Some(job)) => {
                    backoff = POLL_INTERVAL;
                    let job_id = job.id.clone();
                    let outcome = handler.handle(job).await;
                    if let Err(e) = self.submit_result(&job_id, &outcome).await {
                        error!(job_id = %job_id, error = %e, "failed to submit job result");
                    }
                    // Go straight back for the next job.
                    continue;
                }
                Ok(None) => {
                    backoff = POLL_INTERVAL;
                    POLL_INTERVAL
                }
                Err(e) => {
                    warn!(error = %e, backoff_secs = backoff.as_secs(), "queue poll failed");
                    let wait = backoff;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    wait
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!("queue polling stopped");
        Ok(())
    }
}

/// Run a single job from a local test file.
///
/// The file holds one job payload; a missing id gets a generated local one.
pub async fn run_local(handler: &JobHandler, path: &Path) -> XttsResult<JobOutcome> {
    info!(path = %path.display(), "running local test job");

    let raw = std::fs::read_to_string(path)
        .map_err(|e| XttsError::config(format!("cannot read test input {}: {e}", path.display())))?;
    let mut job: JobRequest = serde_json::from_str(&raw)
        .map_err(|e| XttsError::Serialization(format!("invalid test input: {e}")))?;
    if job.id.is_empty() {
        job.id = format!("local-{}", Uuid::new_v4());
    }

    Ok(handler.handle(job).await)
}
