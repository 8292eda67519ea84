//! # xtts-core
//!
//! Core types, traits, and error definitions for the XTTS serverless worker.
//!
//! This crate provides the foundational abstractions used across the other
//! crates in the workspace, including:
//!
//! - The job wire types (`JobRequest`, `JobOutput`, `JobOutcome`)
//! - The `SpeechModel` backend trait
//! - Unified error handling via `XttsError` and its job-status mapping
//! - The environment-driven `WorkerConfig`

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{BackendKind, DevicePreference, QueueConfig, WorkerConfig};
pub use error::{XttsError, XttsResult};
pub use traits::SpeechModel;
pub use types::{
    AudioClip, JobError, JobInput, JobOutcome, JobOutput, JobRequest, JobStatus, Lang,
    SynthesisRequest, SAMPLE_RATE_HZ,
};
