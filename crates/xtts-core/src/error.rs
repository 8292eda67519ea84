//! Unified error types for the synthesis worker.

use std::path::PathBuf;

use crate::types::JobStatus;

/// Main error type for worker operations.
#[derive(Debug, thiserror::Error)]
pub enum XttsError {
    /// Invalid job input (missing or malformed fields).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Requested language is not supported by the model.
    #[error("unsupported language: {lang}. supported: {supported}")]
    UnsupportedLanguage { lang: String, supported: String },

    /// Speaker reference audio could not be decoded or read.
    #[error("invalid speaker audio: {0}")]
    SpeakerAudio(String),

    /// Model artifacts missing or unreadable at startup.
    #[error("model load failed for {path}: {source}")]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Inference backend is not reachable.
    #[error("inference backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend failed to synthesize.
    #[error("inference error: {0}")]
    Inference(String),

    /// WAV data could not be decoded.
    #[error("audio decode error: {0}")]
    AudioDecode(String),

    /// Invalid worker configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Timeout during synthesis.
    #[error("synthesis timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Resource exhausted (e.g., device out of memory).
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode or decode failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Job queue communication error.
    #[error("queue error: {0}")]
    Queue(String),

    /// Unexpected failure inside the worker itself.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for Results with XttsError.
pub type XttsResult<T> = Result<T, XttsError>;

impl XttsError {
    /// Create an invalid input error with message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a speaker audio error with message.
    pub fn speaker_audio(msg: impl Into<String>) -> Self {
        Self::SpeakerAudio(msg.into())
    }

    /// Create a backend unavailable error with message.
    pub fn backend_unavailable(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable(msg.into())
    }

    /// Create an inference error with message.
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create an audio decode error with message.
    pub fn audio_decode(msg: impl Into<String>) -> Self {
        Self::AudioDecode(msg.into())
    }

    /// Create a config error with message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a resource exhausted error with message.
    pub fn resource_exhausted(msg: impl Into<String>) -> Self {
        Self::ResourceExhausted(msg.into())
    }

    /// Create a queue error with message.
    pub fn queue(msg: impl Into<String>) -> Self {
        Self::Queue(msg.into())
    }

    /// Create an internal error with message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The wire status a job fails with when this error reaches the caller.
    pub fn job_status(&self) -> JobStatus {
        match self {
            Self::InvalidInput(_) | Self::UnsupportedLanguage { .. } => JobStatus::InvalidInput,
            Self::SpeakerAudio(_) => JobStatus::InvalidSpeakerAudio,
            Self::ModelLoad { .. }
            | Self::BackendUnavailable(_)
            | Self::Inference(_)
            | Self::AudioDecode(_)
            | Self::ResourceExhausted(_) => JobStatus::GenerationFailed,
            Self::Timeout { .. } => JobStatus::Timeout,
            Self::Io(_) => JobStatus::ReadFailed,
            Self::Config(_) | Self::Serialization(_) | Self::Queue(_) | Self::Internal(_) => {
                JobStatus::HandlerError
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = XttsError::invalid_input("text is required");
        assert_eq!(err.to_string(), "invalid input: text is required");

        let err = XttsError::Timeout { secs: 600 };
        assert_eq!(err.to_string(), "synthesis timed out after 600s");
    }

    #[test]
    fn test_error_constructors() {
        let err = XttsError::speaker_audio("bad base64");
        assert!(matches!(err, XttsError::SpeakerAudio(_)));

        let err = XttsError::inference("model failed");
        assert!(matches!(err, XttsError::Inference(_)));
    }

    #[test]
    fn test_job_status_mapping() {
        assert_eq!(
            XttsError::invalid_input("x").job_status(),
            JobStatus::InvalidInput
        );
        assert_eq!(
            XttsError::UnsupportedLanguage {
                lang: "xx".into(),
                supported: "en".into(),
            }
            .job_status(),
            JobStatus::InvalidInput
        );
        assert_eq!(
            XttsError::speaker_audio("x").job_status(),
            JobStatus::InvalidSpeakerAudio
        );
        assert_eq!(
            XttsError::inference("x").job_status(),
            JobStatus::GenerationFailed
        );
        assert_eq!(
            XttsError::resource_exhausted("oom").job_status(),
            JobStatus::GenerationFailed
        );
        assert_eq!(
            XttsError::Timeout { secs: 1 }.job_status(),
            JobStatus::Timeout
        );
        assert_eq!(
            XttsError::Io(std::io::Error::other("x")).job_status(),
            JobStatus::ReadFailed
        );
        assert_eq!(
            XttsError::internal("x").job_status(),
            JobStatus::HandlerError
        );
    }
}
