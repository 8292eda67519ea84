//! # xtts-engine
//!
//! Model lifecycle and synthesis backends for the XTTS serverless worker.
//!
//! The engine loads one backend per process (`ModelHandle::initialize`),
//! resolves reference speaker audio, and converts between PCM clips and WAV
//! bytes. Two backends exist: a deterministic in-process mock and a client
//! for a colocated XTTS v2 inference server.

pub mod api;
pub mod artifacts;
pub mod handle;
pub mod mock;
pub mod speaker;
pub mod wav;

pub use api::XttsApiClient;
pub use artifacts::{ModelArtifacts, MODEL_DIR_NAME, REQUIRED_FILES};
pub use handle::ModelHandle;
pub use mock::MockModel;
pub use speaker::{ResolvedSpeaker, SpeakerSource};
