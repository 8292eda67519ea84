//! Job handling.
//!
//! One `JobHandler` serves every job the worker takes, strictly one at a
//! time. It validates the payload, resolves the speaker reference, runs the
//! model under the job timeout, and shapes the outcome the queue expects.
//! Errors never escape as panics; every failure becomes a structured outcome.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use xtts_core::{
    AudioClip, JobError, JobOutcome, JobOutput, JobRequest, JobStatus, Lang, SynthesisRequest,
    WorkerConfig, XttsError, XttsResult,
};
use xtts_engine::{wav, ModelHandle, SpeakerSource};

use crate::metrics::WorkerMetrics;

/// Processes jobs against the loaded model.
pub struct JobHandler {
    model: Arc<ModelHandle>,
    metrics: Arc<WorkerMetrics>,
    config: WorkerConfig,
}

impl JobHandler {
    pub fn new(model: Arc<ModelHandle>, metrics: Arc<WorkerMetrics>, config: WorkerConfig) -> Self {
        Self {
            model,
            metrics,
            config,
        }
    }

    /// The configuration this handler runs with.
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Handle one job to completion.
    ///
    /// Always returns an outcome; errors are mapped to their wire status.
    #[instrument(name = "job", skip_all, fields(job_id = %request.id))]
    pub async fn handle(&self, request: JobRequest) -> JobOutcome {
        self.metrics.job_received();
        let start = Instant::now();

        let outcome = match self.process(&request).await {
            Ok(output) => JobOutcome::Success(output),
            Err(e) => {
                warn!(error = %e, status = %e.job_status(), "job failed");
                JobOutcome::Error(JobError {
                    error: e.to_string(),
                    status: e.job_status(),
                })
            }
        };

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.metrics.record_job_duration(elapsed_ms);
        match outcome.status() {
            JobStatus::Success => self.metrics.job_succeeded(),
            JobStatus::Timeout => self.metrics.job_timeout(),
            _ => self.metrics.job_failed(),
        }

        info!(
            status = %outcome.status(),
            elapsed_ms = elapsed_ms as u64,
            "job finished"
        );
        outcome
    }

    async fn process(&self, request: &JobRequest) -> XttsResult<JobOutput> {
        let input = &request.input;

        let text = input.text.trim();
        if text.is_empty() {
            return Err(XttsError::invalid_input(
                "text is required and must be a non-empty string",
            ));
        }
        let text_length = text.chars().count();
        if text_length > self.config.max_text_len {
            return Err(XttsError::invalid_input(format!(
                "text too long: {text_length} characters (max {})",
                self.config.max_text_len
            )));
        }

        let language = match input
            .language
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            None => Lang::default(),
            Some(code) => Lang::from_code(code).ok_or_else(|| XttsError::UnsupportedLanguage {
                lang: code.to_string(),
                supported: Lang::supported_codes(),
            })?,
        };

        let source = SpeakerSource::from_input(input);
        let voice_cloned = source.is_some();
        let speaker = match source {
            Some(source) => Some(source.resolve(&self.config.speakers_dir)?),
            None => None,
        };

        let mut synthesis = SynthesisRequest::new(text, language);
        if let Some(resolved) = &speaker {
            synthesis = synthesis.with_speaker_wav(resolved.path());
        }

        info!(text_length, language = %language, voice_cloned, "synthesizing");

        let synth_start = Instant::now();
        let clip = self.run_with_timeout(synthesis).await?;
        self.metrics
            .record_synthesis_duration(synth_start.elapsed().as_secs_f64() * 1000.0);
        self.metrics.record_audio_duration(clip.duration_ms() as f64);

        // The decoded speaker file must outlive synthesis; it can go now.
        drop(speaker);

        let wav_path = self.output_path(&request.id);
        std::fs::create_dir_all(&self.config.output_dir)
            .map_err(|e| XttsError::inference(format!("failed to create output dir: {e}")))?;
        wav::write_wav(&wav_path, &clip)
            .map_err(|e| XttsError::inference(format!("failed to write output audio: {e}")))?;

        // Read back what was written; this is the payload the caller gets.
        let wav_bytes = std::fs::read(&wav_path)?;
        let audio = STANDARD.encode(&wav_bytes);

        if !self.config.keep_outputs {
            if let Err(e) = std::fs::remove_file(&wav_path) {
                warn!(path = %wav_path.display(), error = %e, "failed to remove output file");
            }
        }

        Ok(JobOutput {
            audio,
            content_type: "audio/wav".to_string(),
            size_bytes: wav_bytes.len() as u64,
            text_length,
            language,
            voice_cloned,
            status: JobStatus::Success,
        })
    }

    /// Run a synthesis on a blocking thread, bounded by the job timeout.
    async fn run_with_timeout(&self, request: SynthesisRequest) -> XttsResult<AudioClip> {
        let model = Arc::clone(&self.model);
        let timeout = self.config.job_timeout();
        let task = tokio::task::spawn_blocking(move || model.model().synthesize(&request));

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(XttsError::internal(format!(
                "synthesis task failed: {join_err}"
            ))),
            // The blocking synthesis keeps running; its result is discarded.
            Err(_) => Err(XttsError::Timeout {
                secs: timeout.as_secs(),
            }),
        }
    }

    fn output_path(&self, job_id: &str) -> PathBuf {
        self.config.output_dir.join(format!("{}.wav", file_stem(job_id)))
    }
}

/// Load the configured backend and run the optional warmup.
///
/// Backend loading blocks on disk and network, and for the xtts backend it
/// builds a blocking HTTP client, which must not happen on a runtime thread.
/// The whole sequence runs on the blocking pool.
pub async fn load_model(config: &WorkerConfig) -> XttsResult<ModelHandle> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || -> XttsResult<ModelHandle> {
        let model = ModelHandle::initialize(&config)?;
        if config.warmup {
            model.warm_up();
        }
        Ok(model)
    })
    .await
    .map_err(|e| XttsError::internal(format!("model load task failed: {e}")))?
}

/// Job ids become file names; anything outside a conservative character set
/// is replaced.
fn file_stem(job_id: &str) -> String {
    if job_id.is_empty() {
        return format!("job-{}", Uuid::new_v4());
    }
    job_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem_passes_safe_ids() {
        assert_eq!(file_stem("abc-123_x.y"), "abc-123_x.y");
    }

    #[test]
    fn test_file_stem_replaces_separators() {
        assert_eq!(file_stem("a/b\\c d"), "a_b_c_d");
    }

    #[test]
    fn test_file_stem_generates_for_empty_id() {
        let stem = file_stem("");
        assert!(stem.starts_with("job-"));
        assert!(stem.len() > 10);
    }
}
