//! Deterministic mock backend.
//!
//! Generates a tone whose duration tracks the input text length and whose
//! pitch depends on the language and the speaker reference, so distinct
//! requests produce distinct audio without any model weights.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use xtts_core::{
    AudioClip, Lang, SpeechModel, SynthesisRequest, XttsError, XttsResult, SAMPLE_RATE_HZ,
};

/// Milliseconds of audio per character of input text.
const MS_PER_CHAR: usize = 14;
/// Base duration added to every clip.
const BASE_MS: usize = 120;
/// Upper bound on generated audio length.
const MAX_MS: usize = 8_000;

/// In-process synthesis stand-in.
#[derive(Debug, Default)]
pub struct MockModel {
    synth_calls: AtomicUsize,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of synthesize calls served so far.
    pub fn synth_calls(&self) -> usize {
        self.synth_calls.load(Ordering::Relaxed)
    }

    /// Fold a speaker recording into a stable voice seed.
    fn voice_seed(path: &Path) -> XttsResult<u32> {
        let bytes = std::fs::read(path).map_err(|e| {
            XttsError::speaker_audio(format!(
                "cannot read speaker reference {}: {e}",
                path.display()
            ))
        })?;
        Ok(bytes
            .iter()
            .fold(0u32, |acc, &b| acc.wrapping_add(u32::from(b))))
    }

    fn pitch_hz(language: Lang, voice: Option<u32>) -> f32 {
        let index = Lang::ALL
            .iter()
            .position(|l| *l == language)
            .unwrap_or_default();
        let base = 220.0 + 12.0 * index as f32;
        match voice {
            // A reference speaker shifts the voice down; the same recording
            // always lands on the same pitch.
            Some(seed) => base * (0.7 + 0.3 * (seed % 64) as f32 / 64.0),
            None => base,
        }
    }
}

impl SpeechModel for MockModel {
    fn synthesize(&self, request: &SynthesisRequest) -> XttsResult<AudioClip> {
        self.synth_calls.fetch_add(1, Ordering::Relaxed);

        let voice = match &request.speaker_wav {
            Some(path) => Some(Self::voice_seed(path)?),
            None => None,
        };

        let chars = request.text.chars().count();
        let duration_ms = (BASE_MS + MS_PER_CHAR * chars).min(MAX_MS);
        let num_samples = SAMPLE_RATE_HZ as usize * duration_ms / 1000;

        let freq = Self::pitch_hz(request.language, voice);
        let fade_samples = (num_samples / 20).max(1);

        let mut pcm = Vec::with_capacity(num_samples);
        for i in 0..num_samples {
            let t = i as f32 / SAMPLE_RATE_HZ as f32;
            let mut sample = 0.3 * (2.0 * std::f32::consts::PI * freq * t).sin();

            // Short fades keep the clip click-free at both ends.
            if i < fade_samples {
                sample *= i as f32 / fade_samples as f32;
            }
            let from_end = num_samples - i;
            if from_end < fade_samples {
                sample *= from_end as f32 / fade_samples as f32;
            }
            pcm.push(sample);
        }

        Ok(AudioClip::new(pcm, SAMPLE_RATE_HZ))
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE_HZ
    }

    fn name(&self) -> &str {
        "mock"
    }
}
