//! Worker configuration.
//!
//! Every environment variable the worker recognizes is enumerated here and
//! read exactly once, at startup, into a validated [`WorkerConfig`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{XttsError, XttsResult};

/// Synthesis backend selection.
pub const ENV_BACKEND: &str = "XTTS_BACKEND";
/// Compute device preference, forwarded to the inference backend.
pub const ENV_DEVICE: &str = "XTTS_DEVICE";
/// Model cache directory (worker-specific override).
pub const ENV_MODELS_DIR: &str = "XTTS_MODELS_DIR";
/// Model cache directory (the TTS library's own variable).
pub const ENV_TTS_CACHE: &str = "TTS_CACHE";
/// Directory holding reference speaker WAVs.
pub const ENV_SPEAKERS_DIR: &str = "XTTS_SPEAKERS_DIR";
/// Directory generated audio is written under.
pub const ENV_OUTPUT_DIR: &str = "XTTS_OUTPUT_DIR";
/// Base URL of the local XTTS inference server (xtts backend only).
pub const ENV_API_URL: &str = "XTTS_API_URL";
/// Port for the worker's own health/info/metrics listener.
pub const ENV_HTTP_PORT: &str = "XTTS_HTTP_PORT";
/// Per-job synthesis timeout in seconds.
pub const ENV_JOB_TIMEOUT_SECS: &str = "XTTS_JOB_TIMEOUT_SECS";
/// Maximum accepted text length in characters.
pub const ENV_MAX_TEXT_LEN: &str = "XTTS_MAX_TEXT_LEN";
/// Keep generated WAVs under the output directory after responding.
pub const ENV_KEEP_OUTPUTS: &str = "XTTS_KEEP_OUTPUTS";
/// Run a warmup synthesis after the model loads.
pub const ENV_WARMUP: &str = "XTTS_WARMUP";
/// Coqui model license acceptance; must be "1" for the xtts backend.
pub const ENV_TOS_AGREED: &str = "COQUI_TOS_AGREED";

/// Queue API key; absence selects local test mode.
pub const ENV_RUNPOD_API_KEY: &str = "RUNPOD_AI_API_KEY";
/// This worker's identifier on the queue platform.
pub const ENV_RUNPOD_POD_ID: &str = "RUNPOD_POD_ID";
/// Job-take URL template ($ID is replaced with the worker id).
pub const ENV_RUNPOD_GET_JOB: &str = "RUNPOD_WEBHOOK_GET_JOB";
/// Job-done URL template ($RUNPOD_POD_ID → worker id, $ID → job id).
pub const ENV_RUNPOD_POST_OUTPUT: &str = "RUNPOD_WEBHOOK_POST_OUTPUT";

/// Synthesis backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Deterministic in-process backend; no model weights needed.
    #[default]
    Mock,
    /// Local XTTS v2 inference server.
    Xtts,
}

impl BackendKind {
    /// Parse a backend name from configuration.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mock" => Some(Self::Mock),
            "xtts" | "coqui" => Some(Self::Xtts),
            _ => None,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Mock => f.write_str("mock"),
            BackendKind::Xtts => f.write_str("xtts"),
        }
    }
}

/// Compute device preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// Use CUDA when available, otherwise CPU.
    #[default]
    Auto,
    /// Force CPU inference.
    Cpu,
    /// Require a CUDA device.
    Cuda,
}

impl DevicePreference {
    /// Parse a device name from configuration.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "cpu" => Some(Self::Cpu),
            "cuda" | "gpu" | "nvidia" => Some(Self::Cuda),
            _ => None,
        }
    }
}

impl std::fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DevicePreference::Auto => f.write_str("auto"),
            DevicePreference::Cpu => f.write_str("cpu"),
            DevicePreference::Cuda => f.write_str("cuda"),
        }
    }
}

/// Queue connection settings. Present only when an API key is configured;
/// without one the worker runs a single local test job instead of polling.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Bearer token for queue requests.
    pub api_key: String,
    /// This worker's identifier.
    pub worker_id: String,
    /// Fully resolved job-take URL.
    pub take_url: String,
    /// Job-done URL template; `$ID` is replaced with the job id per submit.
    pub done_url_template: String,
}

impl QueueConfig {
    /// Resolve the job-done URL for a specific job.
    pub fn done_url(&self, job_id: &str) -> String {
        self.done_url_template.replace("$ID", job_id)
    }
}

/// The worker's complete, validated configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Which synthesis backend serves jobs.
    pub backend: BackendKind,
    /// Device preference forwarded to the backend.
    pub device: DevicePreference,
    /// Pre-fetched model weight cache.
    pub models_dir: PathBuf,
    /// Read-only reference speaker audio.
    pub speakers_dir: PathBuf,
    /// Generated audio directory (handler-owned).
    pub output_dir: PathBuf,
    /// Base URL of the XTTS inference server (xtts backend only).
    pub api_url: Option<String>,
    /// Port for the status listener.
    pub http_port: u16,
    /// Per-job synthesis timeout in seconds.
    pub job_timeout_secs: u64,
    /// Maximum accepted text length in characters.
    pub max_text_len: usize,
    /// Keep generated WAVs after responding.
    pub keep_outputs: bool,
    /// Run a warmup synthesis after load.
    pub warmup: bool,
    /// Queue connection; `None` selects local test mode.
    pub queue: Option<QueueConfig>,
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("/app/models")
}

fn default_speakers_dir() -> PathBuf {
    PathBuf::from("/app/speakers")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("/app/output")
}

fn default_http_port() -> u16 {
    8020
}

fn default_job_timeout_secs() -> u64 {
    600
}

fn default_max_text_len() -> usize {
    10_000
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            device: DevicePreference::default(),
            models_dir: default_models_dir(),
            speakers_dir: default_speakers_dir(),
            output_dir: default_output_dir(),
            api_url: None,
            http_port: default_http_port(),
            job_timeout_secs: default_job_timeout_secs(),
            max_text_len: default_max_text_len(),
            keep_outputs: false,
            warmup: true,
            queue: None,
        }
    }
}

impl WorkerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> XttsResult<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_env_map(&vars)
    }

    /// Build configuration from an explicit variable map.
    ///
    /// Unrecognized values in recognized variables are startup errors that
    /// name the offending variable.
    pub fn from_env_map(vars: &HashMap<String, String>) -> XttsResult<Self> {
        let mut config = Self::default();

        if let Some(raw) = nonempty(vars, ENV_BACKEND) {
            config.backend = BackendKind::parse(raw).ok_or_else(|| {
                XttsError::config(format!(
                    "{ENV_BACKEND}: unknown backend {raw:?} (expected mock or xtts)"
                ))
            })?;
        }
        if let Some(raw) = nonempty(vars, ENV_DEVICE) {
            config.device = DevicePreference::parse(raw).ok_or_else(|| {
                XttsError::config(format!(
                    "{ENV_DEVICE}: unknown device {raw:?} (expected auto, cpu, or cuda)"
                ))
            })?;
        }

        // The worker-specific override wins over the TTS library's own cache var.
        if let Some(dir) = nonempty(vars, ENV_MODELS_DIR) {
            config.models_dir = PathBuf::from(dir);
        } else if let Some(dir) = nonempty(vars, ENV_TTS_CACHE) {
            config.models_dir = PathBuf::from(dir);
        }
        if let Some(dir) = nonempty(vars, ENV_SPEAKERS_DIR) {
            config.speakers_dir = PathBuf::from(dir);
        }
        if let Some(dir) = nonempty(vars, ENV_OUTPUT_DIR) {
            config.output_dir = PathBuf::from(dir);
        }

        config.api_url = nonempty(vars, ENV_API_URL).map(|s| s.trim_end_matches('/').to_string());

        if let Some(raw) = nonempty(vars, ENV_HTTP_PORT) {
            config.http_port = parse_num(ENV_HTTP_PORT, raw)?;
        }
        if let Some(raw) = nonempty(vars, ENV_JOB_TIMEOUT_SECS) {
            config.job_timeout_secs = parse_num(ENV_JOB_TIMEOUT_SECS, raw)?;
        }
        if let Some(raw) = nonempty(vars, ENV_MAX_TEXT_LEN) {
            config.max_text_len = parse_num(ENV_MAX_TEXT_LEN, raw)?;
        }
        if let Some(raw) = nonempty(vars, ENV_KEEP_OUTPUTS) {
            config.keep_outputs = parse_bool(ENV_KEEP_OUTPUTS, raw)?;
        }
        if let Some(raw) = nonempty(vars, ENV_WARMUP) {
            config.warmup = parse_bool(ENV_WARMUP, raw)?;
        }

        config.queue = Self::queue_from_env(vars)?;

        config.validate(vars)?;
        Ok(config)
    }

    /// Per-job timeout as a [`Duration`].
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    /// Whether the worker polls a queue (as opposed to local test mode).
    pub fn queue_mode(&self) -> bool {
        self.queue.is_some()
    }

    fn queue_from_env(vars: &HashMap<String, String>) -> XttsResult<Option<QueueConfig>> {
        let Some(api_key) = nonempty(vars, ENV_RUNPOD_API_KEY) else {
            return Ok(None);
        };

        let worker_id = nonempty(vars, ENV_RUNPOD_POD_ID)
            .ok_or_else(|| {
                XttsError::config(format!(
                    "{ENV_RUNPOD_POD_ID} is required when {ENV_RUNPOD_API_KEY} is set"
                ))
            })?
            .to_string();
        let take_template = nonempty(vars, ENV_RUNPOD_GET_JOB).ok_or_else(|| {
            XttsError::config(format!(
                "{ENV_RUNPOD_GET_JOB} is required when {ENV_RUNPOD_API_KEY} is set"
            ))
        })?;
        let done_template = nonempty(vars, ENV_RUNPOD_POST_OUTPUT).ok_or_else(|| {
            XttsError::config(format!(
                "{ENV_RUNPOD_POST_OUTPUT} is required when {ENV_RUNPOD_API_KEY} is set"
            ))
        })?;

        Ok(Some(QueueConfig {
            api_key: api_key.to_string(),
            take_url: take_template.replace("$ID", &worker_id),
            done_url_template: done_template.replace("$RUNPOD_POD_ID", &worker_id),
            worker_id,
        }))
    }

    fn validate(&self, vars: &HashMap<String, String>) -> XttsResult<()> {
        if self.max_text_len == 0 {
            return Err(XttsError::config(format!("{ENV_MAX_TEXT_LEN} must be > 0")));
        }
        if self.job_timeout_secs == 0 {
            return Err(XttsError::config(format!(
                "{ENV_JOB_TIMEOUT_SECS} must be > 0"
            )));
        }
        if self.backend == BackendKind::Xtts {
            if self.api_url.is_none() {
                return Err(XttsError::config(format!(
                    "{ENV_API_URL} is required for the xtts backend"
                )));
            }
            // License gate for the underlying model.
            if nonempty(vars, ENV_TOS_AGREED) != Some("1") {
                return Err(XttsError::config(format!(
                    "{ENV_TOS_AGREED}=1 is required for the xtts backend"
                )));
            }
        }
        Ok(())
    }
}

fn nonempty<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key).map(|s| s.as_str()).filter(|s| !s.is_empty())
}

fn parse_num<T: std::str::FromStr>(var: &str, raw: &str) -> XttsResult<T> {
    raw.parse()
        .map_err(|_| XttsError::config(format!("{var}: invalid number {raw:?}")))
}

fn parse_bool(var: &str, raw: &str) -> XttsResult<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(XttsError::config(format!(
            "{var}: invalid boolean {raw:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::from_env_map(&env(&[])).unwrap();
        assert_eq!(config.backend, BackendKind::Mock);
        assert_eq!(config.device, DevicePreference::Auto);
        assert_eq!(config.models_dir, PathBuf::from("/app/models"));
        assert_eq!(config.speakers_dir, PathBuf::from("/app/speakers"));
        assert_eq!(config.output_dir, PathBuf::from("/app/output"));
        assert_eq!(config.http_port, 8020);
        assert_eq!(config.job_timeout_secs, 600);
        assert_eq!(config.max_text_len, 10_000);
        assert!(!config.keep_outputs);
        assert!(config.warmup);
        assert!(!config.queue_mode());
    }

    #[test]
    fn test_explicit_values() {
        let config = WorkerConfig::from_env_map(&env(&[
            (ENV_DEVICE, "cuda"),
            (ENV_TTS_CACHE, "/data/models"),
            (ENV_HTTP_PORT, "9000"),
            (ENV_JOB_TIMEOUT_SECS, "120"),
            (ENV_KEEP_OUTPUTS, "true"),
            (ENV_WARMUP, "0"),
        ]))
        .unwrap();
        assert_eq!(config.device, DevicePreference::Cuda);
        assert_eq!(config.models_dir, PathBuf::from("/data/models"));
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.job_timeout_secs, 120);
        assert!(config.keep_outputs);
        assert!(!config.warmup);
    }

    #[test]
    fn test_models_dir_override_wins() {
        let config = WorkerConfig::from_env_map(&env(&[
            (ENV_TTS_CACHE, "/cache"),
            (ENV_MODELS_DIR, "/override"),
        ]))
        .unwrap();
        assert_eq!(config.models_dir, PathBuf::from("/override"));
    }

    #[test]
    fn test_bad_values_name_the_variable() {
        let err = WorkerConfig::from_env_map(&env(&[(ENV_BACKEND, "onnx")])).unwrap_err();
        assert!(err.to_string().contains(ENV_BACKEND), "{err}");

        let err = WorkerConfig::from_env_map(&env(&[(ENV_HTTP_PORT, "not-a-port")])).unwrap_err();
        assert!(err.to_string().contains(ENV_HTTP_PORT), "{err}");

        let err = WorkerConfig::from_env_map(&env(&[(ENV_KEEP_OUTPUTS, "maybe")])).unwrap_err();
        assert!(err.to_string().contains(ENV_KEEP_OUTPUTS), "{err}");
    }

    #[test]
    fn test_xtts_backend_requirements() {
        // Missing endpoint.
        let err = WorkerConfig::from_env_map(&env(&[
            (ENV_BACKEND, "xtts"),
            (ENV_TOS_AGREED, "1"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(ENV_API_URL), "{err}");

        // Missing license acceptance.
        let err = WorkerConfig::from_env_map(&env(&[
            (ENV_BACKEND, "xtts"),
            (ENV_API_URL, "http://127.0.0.1:8021"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(ENV_TOS_AGREED), "{err}");

        // Complete.
        let config = WorkerConfig::from_env_map(&env(&[
            (ENV_BACKEND, "xtts"),
            (ENV_API_URL, "http://127.0.0.1:8021/"),
            (ENV_TOS_AGREED, "1"),
        ]))
        .unwrap();
        assert_eq!(config.backend, BackendKind::Xtts);
        assert_eq!(config.api_url.as_deref(), Some("http://127.0.0.1:8021"));
    }

    #[test]
    fn test_queue_config() {
        let config = WorkerConfig::from_env_map(&env(&[
            (ENV_RUNPOD_API_KEY, "secret"),
            (ENV_RUNPOD_POD_ID, "worker-7"),
            (ENV_RUNPOD_GET_JOB, "https://api.example.com/job-take/$ID"),
            (
                ENV_RUNPOD_POST_OUTPUT,
                "https://api.example.com/$RUNPOD_POD_ID/job-done/$ID",
            ),
        ]))
        .unwrap();

        let queue = config.queue.expect("queue config");
        assert_eq!(queue.take_url, "https://api.example.com/job-take/worker-7");
        assert_eq!(
            queue.done_url("job-42"),
            "https://api.example.com/worker-7/job-done/job-42"
        );
    }

    #[test]
    fn test_queue_config_incomplete() {
        let err = WorkerConfig::from_env_map(&env(&[(ENV_RUNPOD_API_KEY, "secret")])).unwrap_err();
        assert!(err.to_string().contains(ENV_RUNPOD_POD_ID), "{err}");
    }
}
