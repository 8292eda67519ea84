//! The backend seam.

use crate::error::XttsResult;
use crate::types::{AudioClip, SynthesisRequest};

/// A loaded text-to-speech model.
///
/// Implementations are synchronous and may block for the full duration of a
/// synthesis; callers that need a timeout run them on a blocking thread.
/// A model is shared across jobs once loaded, so implementations must be
/// `Send + Sync` and keep per-call state on the stack.
pub trait SpeechModel: Send + Sync {
    /// Synthesize speech for one request.
    fn synthesize(&self, request: &SynthesisRequest) -> XttsResult<AudioClip>;

    /// Output sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Short backend name for logs and the info endpoint.
    fn name(&self) -> &str;
}
