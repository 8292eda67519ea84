//! Model lifecycle.
//!
//! `ModelHandle` owns the loaded backend for the life of the process. It is
//! created once at startup, before any job is taken, and shared by reference
//! afterwards; per-job code never loads or reloads anything.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use tracing::{info, warn};
use xtts_core::{
    BackendKind, DevicePreference, Lang, SpeechModel, SynthesisRequest, WorkerConfig, XttsError,
    XttsResult,
};

use crate::api::XttsApiClient;
use crate::artifacts::ModelArtifacts;
use crate::mock::MockModel;

static MODELS_LOADED: AtomicUsize = AtomicUsize::new(0);

/// A loaded synthesis backend plus the settings it was loaded with.
pub struct ModelHandle {
    model: Box<dyn SpeechModel>,
    backend: BackendKind,
    device: DevicePreference,
}

impl ModelHandle {
    /// Load the configured backend.
    ///
    /// For the xtts backend this verifies the model artifact set on disk and
    /// probes the inference server; either failing is fatal. Counts toward
    /// [`ModelHandle::load_count`].
    pub fn initialize(config: &WorkerConfig) -> XttsResult<Self> {
        let start = Instant::now();
        let model: Box<dyn SpeechModel> = match config.backend {
            BackendKind::Mock => Box::new(MockModel::new()),
            BackendKind::Xtts => {
                let artifacts = ModelArtifacts::locate(&config.models_dir)?;
                info!(root = %artifacts.root.display(), "model artifacts located");

                let api_url = config.api_url.as_deref().ok_or_else(|| {
                    XttsError::config("xtts backend requires an inference server url")
                })?;
                let client = XttsApiClient::new(api_url, config.job_timeout())?;
                client.probe()?;
                Box::new(client)
            }
        };
        MODELS_LOADED.fetch_add(1, Ordering::SeqCst);

        info!(
            backend = %config.backend,
            device = %config.device,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "model ready"
        );

        Ok(Self {
            model,
            backend: config.backend,
            device: config.device,
        })
    }

    /// Wrap an already-built model, bypassing backend loading.
    ///
    /// Does not count toward [`ModelHandle::load_count`].
    pub fn with_model(model: Box<dyn SpeechModel>) -> Self {
        Self {
            model,
            backend: BackendKind::Mock,
            device: DevicePreference::Auto,
        }
    }

    /// The loaded model.
    pub fn model(&self) -> &dyn SpeechModel {
        self.model.as_ref()
    }

    /// Which backend this handle carries.
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Device preference the backend was loaded with.
    pub fn device(&self) -> DevicePreference {
        self.device
    }

    /// Output sample rate of the loaded model.
    pub fn sample_rate(&self) -> u32 {
        self.model.sample_rate()
    }

    /// Run one short synthesis to page in weights and caches.
    ///
    /// A failed warmup is logged and swallowed; real jobs will surface the
    /// error properly.
    pub fn warm_up(&self) {
        let request = SynthesisRequest::new("Warm up.", Lang::En);
        let start = Instant::now();
        match self.model.synthesize(&request) {
            Ok(clip) => info!(
                samples = clip.num_samples(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "warmup synthesis complete"
            ),
            Err(e) => warn!(error = %e, "warmup synthesis failed"),
        }
    }

    /// How many backends this process has loaded.
    pub fn load_count() -> usize {
        MODELS_LOADED.load(Ordering::SeqCst)
    }
}
