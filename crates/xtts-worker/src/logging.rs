//! Logging setup.
//!
//! Everything goes to stdout, one line per event, where the container runtime
//! picks it up. JSON is the default so aggregators can index the fields; text
//! is for running the worker in a terminal.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

/// Output format for worker logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines for terminals.
    Text,
    /// One JSON object per line.
    #[default]
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format {other:?} (expected json or text)")),
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides `level` when set. Spans log on close, which is where
/// the per-job timing lines come from. Calling this again once a subscriber
/// is installed has no effect, so tests can initialize freely.
pub fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let events = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE);
    let events = match format {
        LogFormat::Text => events.boxed(),
        LogFormat::Json => events.json().flatten_event(true).boxed(),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(events)
        .try_init();
}
