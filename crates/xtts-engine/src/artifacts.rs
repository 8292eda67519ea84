//! Model artifact discovery.
//!
//! Weights are baked into the image at build time; the worker never downloads
//! them. Startup fails fast when the cache is incomplete.

use std::io;
use std::path::{Path, PathBuf};

use xtts_core::{XttsError, XttsResult};

/// Cache subdirectory the TTS library stores this model under.
pub const MODEL_DIR_NAME: &str = "tts_models--multilingual--multi-dataset--xtts_v2";

/// Model configuration file.
pub const CONFIG_FILE: &str = "config.json";
/// Model weights checkpoint.
pub const WEIGHTS_FILE: &str = "model.pth";
/// Tokenizer vocabulary.
pub const VOCAB_FILE: &str = "vocab.json";
/// Built-in speaker embeddings.
pub const SPEAKERS_FILE: &str = "speakers_xtts.pth";

/// Every file the model needs to load.
pub const REQUIRED_FILES: [&str; 4] = [CONFIG_FILE, WEIGHTS_FILE, VOCAB_FILE, SPEAKERS_FILE];

/// Resolved paths to a complete XTTS v2 artifact set.
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    /// Directory the artifacts live in.
    pub root: PathBuf,
    /// Path to `config.json`.
    pub config: PathBuf,
    /// Path to `model.pth`.
    pub weights: PathBuf,
    /// Path to `vocab.json`.
    pub vocab: PathBuf,
    /// Path to `speakers_xtts.pth`.
    pub speakers: PathBuf,
}

impl ModelArtifacts {
    /// Locate the artifact set under a model cache directory.
    ///
    /// Accepts either the cache root (containing the model's own
    /// subdirectory) or the model directory itself. Any missing file is a
    /// load error naming the path that was expected.
    pub fn locate(models_dir: impl AsRef<Path>) -> XttsResult<Self> {
        let models_dir = models_dir.as_ref();
        let nested = models_dir.join(MODEL_DIR_NAME);
        let root = if nested.is_dir() {
            nested
        } else {
            models_dir.to_path_buf()
        };

        for file in REQUIRED_FILES {
            let path = root.join(file);
            if !path.is_file() {
                return Err(XttsError::ModelLoad {
                    path,
                    source: io::Error::new(io::ErrorKind::NotFound, "model artifact not found"),
                });
            }
        }

        Ok(Self {
            config: root.join(CONFIG_FILE),
            weights: root.join(WEIGHTS_FILE),
            vocab: root.join(VOCAB_FILE),
            speakers: root.join(SPEAKERS_FILE),
            root,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch_all(dir: &Path) {
        for file in REQUIRED_FILES {
            fs::write(dir.join(file), b"x").unwrap();
        }
    }

    #[test]
    fn test_locate_in_cache_root() {
        let cache = tempfile::tempdir().unwrap();
        let model_dir = cache.path().join(MODEL_DIR_NAME);
        fs::create_dir_all(&model_dir).unwrap();
        touch_all(&model_dir);

        let artifacts = ModelArtifacts::locate(cache.path()).unwrap();
        assert_eq!(artifacts.root, model_dir);
        assert!(artifacts.weights.ends_with(WEIGHTS_FILE));
    }

    #[test]
    fn test_locate_in_model_dir_directly() {
        let dir = tempfile::tempdir().unwrap();
        touch_all(dir.path());

        let artifacts = ModelArtifacts::locate(dir.path()).unwrap();
        assert_eq!(artifacts.root, dir.path());
    }

    #[test]
    fn test_missing_weights_is_an_error() {
        let cache = tempfile::tempdir().unwrap();
        let model_dir = cache.path().join(MODEL_DIR_NAME);
        fs::create_dir_all(&model_dir).unwrap();
        touch_all(&model_dir);
        fs::remove_file(model_dir.join(WEIGHTS_FILE)).unwrap();

        let err = ModelArtifacts::locate(cache.path()).unwrap_err();
        match err {
            XttsError::ModelLoad { path, .. } => assert!(path.ends_with(WEIGHTS_FILE)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_cache_is_an_error() {
        let cache = tempfile::tempdir().unwrap();
        assert!(ModelArtifacts::locate(cache.path()).is_err());
    }
}
