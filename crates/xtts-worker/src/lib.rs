//! # xtts-worker
//!
//! Serverless job-queue worker for XTTS v2 speech synthesis.
//!
//! The worker loads one model at startup, then either polls the platform's
//! job queue (when credentials are configured) or runs a single job from a
//! local test file. A small status listener serves health, info, and metrics
//! on the worker's own port.

pub mod handler;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod queue;

pub use handler::{load_model, JobHandler};
pub use metrics::WorkerMetrics;
pub use queue::QueueClient;
