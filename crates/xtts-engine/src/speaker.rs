//! Reference speaker audio resolution.
//!
//! Voice cloning accepts either base64-encoded audio inline in the job or the
//! name of a WAV shipped in the image's speakers directory. Inline audio is
//! decoded to a temporary file that lives as long as the resolved speaker.

use std::io::Write;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tempfile::NamedTempFile;
use xtts_core::{JobInput, XttsError, XttsResult};

/// Smallest byte count a usable WAV can have (RIFF header alone is 44).
const MIN_SPEAKER_BYTES: usize = 44;

/// Where the reference audio for a job comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerSource<'a> {
    /// Base64-encoded WAV carried in the job payload.
    Inline(&'a str),
    /// Bare file name under the speakers directory.
    File(&'a str),
}

/// A speaker reference ready to hand to the model.
#[derive(Debug)]
pub struct ResolvedSpeaker {
    path: PathBuf,
    // Present for inline audio; dropping it removes the decoded file.
    _temp: Option<NamedTempFile>,
}

impl ResolvedSpeaker {
    /// Path to the reference WAV on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<'a> SpeakerSource<'a> {
    /// Pick the speaker source from a job's input, if any.
    ///
    /// Inline audio takes precedence when both fields are present. Empty or
    /// whitespace-only fields count as absent.
    pub fn from_input(input: &'a JobInput) -> Option<Self> {
        if let Some(b64) = present(input.speaker_wav.as_deref()) {
            return Some(Self::Inline(b64));
        }
        present(input.speaker_file.as_deref()).map(Self::File)
    }

    /// Materialize the reference audio as a file path.
    pub fn resolve(&self, speakers_dir: &Path) -> XttsResult<ResolvedSpeaker> {
        match self {
            Self::Inline(b64) => resolve_inline(b64),
            Self::File(name) => resolve_file(name, speakers_dir),
        }
    }
}

fn present(field: Option<&str>) -> Option<&str> {
    field.map(str::trim).filter(|s| !s.is_empty())
}

fn resolve_inline(b64: &str) -> XttsResult<ResolvedSpeaker> {
    let payload = strip_data_url(b64);
    // Tolerate line-wrapped base64.
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| XttsError::speaker_audio(format!("invalid base64 speaker audio: {e}")))?;
    if bytes.len() < MIN_SPEAKER_BYTES {
        return Err(XttsError::speaker_audio(format!(
            "speaker audio too short ({} bytes)",
            bytes.len()
        )));
    }

    let mut temp = tempfile::Builder::new()
        .prefix("speaker-")
        .suffix(".wav")
        .tempfile()
        .map_err(|e| XttsError::speaker_audio(format!("failed to stage speaker audio: {e}")))?;
    temp.write_all(&bytes)
        .and_then(|_| temp.flush())
        .map_err(|e| XttsError::speaker_audio(format!("failed to stage speaker audio: {e}")))?;

    Ok(ResolvedSpeaker {
        path: temp.path().to_path_buf(),
        _temp: Some(temp),
    })
}

fn resolve_file(name: &str, speakers_dir: &Path) -> XttsResult<ResolvedSpeaker> {
    // Only bare names are accepted; the speakers directory is not a browseable tree.
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(XttsError::speaker_audio(format!(
            "speaker file must be a bare file name, got {name:?}"
        )));
    }

    let path = speakers_dir.join(name);
    if !path.is_file() {
        return Err(XttsError::speaker_audio(format!(
            "speaker file not found: {name}"
        )));
    }

    Ok(ResolvedSpeaker { path, _temp: None })
}

fn strip_data_url(s: &str) -> &str {
    match s.strip_prefix("data:") {
        Some(rest) => match rest.split_once(',') {
            Some((_, payload)) => payload,
            None => rest,
        },
        None => s,
    }
}
