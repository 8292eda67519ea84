//! Core data types for the synthesis worker.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Output sample rate of the XTTS v2 model in Hz.
pub const SAMPLE_RATE_HZ: u32 = 24_000;

/// Languages supported by the XTTS v2 model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    /// English.
    #[default]
    En,
    /// Spanish.
    Es,
    /// French.
    Fr,
    /// German.
    De,
    /// Italian.
    It,
    /// Portuguese.
    Pt,
    /// Polish.
    Pl,
    /// Turkish.
    Tr,
    /// Russian.
    Ru,
    /// Dutch.
    Nl,
    /// Czech.
    Cs,
    /// Arabic.
    Ar,
    /// Chinese (simplified).
    #[serde(rename = "zh-cn")]
    ZhCn,
    /// Japanese.
    Ja,
    /// Korean.
    Ko,
    /// Hindi.
    Hi,
}

impl Lang {
    /// All supported languages, in the order the model documents them.
    pub const ALL: [Lang; 16] = [
        Lang::En,
        Lang::Es,
        Lang::Fr,
        Lang::De,
        Lang::It,
        Lang::Pt,
        Lang::Pl,
        Lang::Tr,
        Lang::Ru,
        Lang::Nl,
        Lang::Cs,
        Lang::Ar,
        Lang::ZhCn,
        Lang::Ja,
        Lang::Ko,
        Lang::Hi,
    ];

    /// Parse a language code (e.g. "en", "zh-cn"). Case-insensitive.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim().to_lowercase();
        Self::ALL.iter().copied().find(|l| l.code() == code)
    }

    /// The wire code for this language.
    pub fn code(&self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Es => "es",
            Lang::Fr => "fr",
            Lang::De => "de",
            Lang::It => "it",
            Lang::Pt => "pt",
            Lang::Pl => "pl",
            Lang::Tr => "tr",
            Lang::Ru => "ru",
            Lang::Nl => "nl",
            Lang::Cs => "cs",
            Lang::Ar => "ar",
            Lang::ZhCn => "zh-cn",
            Lang::Ja => "ja",
            Lang::Ko => "ko",
            Lang::Hi => "hi",
        }
    }

    /// Comma-separated list of all supported codes, for error messages.
    pub fn supported_codes() -> String {
        Self::ALL
            .iter()
            .map(|l| l.code())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// One job pulled from the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    /// Platform-assigned job identifier. Local test files may omit it.
    #[serde(default)]
    pub id: String,
    /// Caller-supplied synthesis input.
    #[serde(default)]
    pub input: JobInput,
}

/// The caller-supplied payload of a synthesis job.
///
/// All fields default so that malformed payloads parse and are rejected
/// with a structured validation error instead of a transport error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobInput {
    /// Text to synthesize. Required, must be non-empty after trimming.
    #[serde(default)]
    pub text: String,
    /// Language code. Defaults to "en" when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Base64-encoded reference audio for voice cloning.
    /// A `data:...;base64,` prefix is accepted and stripped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_wav: Option<String>,
    /// Name of a reference WAV under the worker's speakers directory.
    /// Ignored when `speaker_wav` is present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_file: Option<String>,
}

/// Wire status of a finished job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Synthesis completed and audio was returned.
    Success,
    /// Payload validation failed.
    InvalidInput,
    /// Speaker reference audio was missing or undecodable.
    InvalidSpeakerAudio,
    /// Model inference failed.
    GenerationFailed,
    /// Generated audio could not be read back.
    ReadFailed,
    /// Synthesis exceeded the per-job timeout.
    Timeout,
    /// Unexpected handler failure.
    HandlerError,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Success => "success",
            JobStatus::InvalidInput => "invalid_input",
            JobStatus::InvalidSpeakerAudio => "invalid_speaker_audio",
            JobStatus::GenerationFailed => "generation_failed",
            JobStatus::ReadFailed => "read_failed",
            JobStatus::Timeout => "timeout",
            JobStatus::HandlerError => "handler_error",
        };
        f.write_str(s)
    }
}

/// Successful job response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutput {
    /// Base64-encoded WAV audio.
    pub audio: String,
    /// Always "audio/wav".
    pub content_type: String,
    /// Decoded size of the audio in bytes.
    pub size_bytes: u64,
    /// Length of the synthesized (trimmed) text in characters.
    pub text_length: usize,
    /// Language the audio was synthesized in.
    pub language: Lang,
    /// Whether a speaker reference conditioned the voice.
    pub voice_cloned: bool,
    /// Always `success`.
    pub status: JobStatus,
}

/// Failed job response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobError {
    /// Human-readable failure description.
    pub error: String,
    /// Failure classification.
    pub status: JobStatus,
}

/// The single result of one job: audio or a structured error, never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobOutcome {
    /// Synthesis succeeded.
    Success(JobOutput),
    /// Synthesis failed; the error is returned to the caller, the worker
    /// keeps serving.
    Error(JobError),
}

impl JobOutcome {
    /// Whether this outcome carries audio.
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success(_))
    }

    /// The wire status of this outcome.
    pub fn status(&self) -> JobStatus {
        match self {
            JobOutcome::Success(out) => out.status,
            JobOutcome::Error(err) => err.status,
        }
    }
}

/// A clip of synthesized audio.
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// PCM samples (f32, mono).
    pub pcm: Arc<[f32]>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl AudioClip {
    /// Create a new audio clip.
    pub fn new(pcm: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            pcm: pcm.into(),
            sample_rate,
        }
    }

    /// Number of samples in this clip.
    pub fn num_samples(&self) -> usize {
        self.pcm.len()
    }

    /// Duration of this clip in milliseconds.
    pub fn duration_ms(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.pcm.len() as f32 * 1000.0 / self.sample_rate as f32
    }
}

/// A validated synthesis request handed to the model.
///
/// Produced from a [`JobInput`] after validation; the speaker reference,
/// if any, has been resolved to a readable file on disk.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// Trimmed text to synthesize.
    pub text: String,
    /// Target language.
    pub language: Lang,
    /// Resolved speaker reference audio, if a voice is being cloned.
    pub speaker_wav: Option<PathBuf>,
}

impl SynthesisRequest {
    /// Create a request with the default voice.
    pub fn new(text: impl Into<String>, language: Lang) -> Self {
        Self {
            text: text.into(),
            language,
            speaker_wav: None,
        }
    }

    /// Set the speaker reference audio path.
    pub fn with_speaker_wav(mut self, path: impl Into<PathBuf>) -> Self {
        self.speaker_wav = Some(path.into());
        self
    }
}
