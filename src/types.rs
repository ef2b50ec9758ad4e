use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Which transport feeds raw events into the reconciliation loop.
///
/// - `Stream`: a persistent server-sent event connection to `GET /stream`
///   (default behaviour).
/// - `Poll`: re-fetch the cumulative `GET /status` blob on a fixed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Stream,
    Poll,
}

impl TransportMode {
    /// Whether the adapter reports an explicit "connected" event.
    ///
    /// The loop waits in `Starting` for it; transports without one go
    /// straight to `Active`.
    pub fn has_connect_signal(self) -> bool {
        matches!(self, TransportMode::Stream)
    }
}

impl Default for TransportMode {
    fn default() -> Self {
        TransportMode::Stream
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Stream => write!(f, "stream"),
            TransportMode::Poll => write!(f, "poll"),
        }
    }
}

impl FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stream" => Ok(TransportMode::Stream),
            "poll" => Ok(TransportMode::Poll),
            other => Err(format!(
                "invalid transport: {other} (expected \"stream\" or \"poll\")"
            )),
        }
    }
}
