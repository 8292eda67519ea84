//! XTTS inference server backend.
//!
//! Synthesis runs in a colocated XTTS v2 API server (same container, shared
//! filesystem); this client POSTs one `tts_to_audio` request per job and
//! decodes the WAV it gets back. Speaker references are passed as file paths,
//! which the server reads directly.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;
use xtts_core::{AudioClip, SpeechModel, SynthesisRequest, XttsError, XttsResult, SAMPLE_RATE_HZ};

use crate::wav;

/// Timeout for the startup reachability probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// How much of an error body to carry into the error message.
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Serialize)]
struct TtsToAudioRequest<'a> {
    text: &'a str,
    language: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    speaker_wav: Option<&'a str>,
}

/// Client for a local XTTS API server.
#[derive(Debug)]
pub struct XttsApiClient {
    client: reqwest::blocking::Client,
    base_url: String,
    endpoint: String,
    timeout: Duration,
}

impl XttsApiClient {
    /// Build a client for the server at `base_url`.
    ///
    /// `timeout` bounds each synthesis request end to end.
    pub fn new(base_url: &str, timeout: Duration) -> XttsResult<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let endpoint = format!("{base_url}/tts_to_audio/");
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| XttsError::internal(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            endpoint,
            timeout,
        })
    }

    /// Base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the server is reachable.
    ///
    /// Any HTTP response counts as reachable; only transport failures are
    /// errors, so a server that 404s its root still passes.
    pub fn probe(&self) -> XttsResult<()> {
        match self
            .client
            .get(&self.base_url)
            .timeout(PROBE_TIMEOUT)
            .send()
        {
            Ok(response) => {
                debug!(status = %response.status(), url = %self.base_url, "xtts server reachable");
                Ok(())
            }
            Err(e) => Err(XttsError::backend_unavailable(format!(
                "xtts server unreachable at {}: {e}",
                self.base_url
            ))),
        }
    }
}

impl SpeechModel for XttsApiClient {
    fn synthesize(&self, request: &SynthesisRequest) -> XttsResult<AudioClip> {
        let speaker = request
            .speaker_wav
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());
        let body = TtsToAudioRequest {
            text: &request.text,
            language: request.language.code(),
            speaker_wav: speaker.as_deref(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    XttsError::Timeout {
                        secs: self.timeout.as_secs(),
                    }
                } else if e.is_connect() {
                    XttsError::backend_unavailable(format!("xtts server unreachable: {e}"))
                } else {
                    XttsError::inference(format!("xtts request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail: String = response
                .text()
                .unwrap_or_default()
                .chars()
                .take(ERROR_BODY_LIMIT)
                .collect();
            return Err(XttsError::inference(format!(
                "xtts server returned {status}: {detail}"
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|e| XttsError::inference(format!("xtts response read failed: {e}")))?;
        wav::decode_wav(&bytes)
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE_HZ
    }

    fn name(&self) -> &str {
        "xtts"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use xtts_core::Lang;

    #[test]
    fn test_endpoint_normalization() {
        let client = XttsApiClient::new("http://127.0.0.1:8021/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:8021");
        assert_eq!(client.endpoint, "http://127.0.0.1:8021/tts_to_audio/");
    }

    #[test]
    fn test_request_body_shape() {
        let body = TtsToAudioRequest {
            text: "Bonjour",
            language: Lang::Fr.code(),
            speaker_wav: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["text"], "Bonjour");
        assert_eq!(value["language"], "fr");
        assert!(value.get("speaker_wav").is_none());

        let path = PathBuf::from("/app/speakers/alice.wav");
        let speaker = path.to_string_lossy().into_owned();
        let body = TtsToAudioRequest {
            text: "Hi",
            language: Lang::En.code(),
            speaker_wav: Some(&speaker),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["speaker_wav"], "/app/speakers/alice.wav");
    }

    #[test]
    fn test_probe_unreachable_server() {
        // Grab a port the OS considers free, then release it so the connect
        // is refused immediately.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client =
            XttsApiClient::new(&format!("http://127.0.0.1:{port}"), Duration::from_secs(1))
                .unwrap();
        let err = client.probe().unwrap_err();
        assert!(matches!(err, XttsError::BackendUnavailable(_)));
    }
}
