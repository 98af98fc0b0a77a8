use serde::{Deserialize, Serialize};

/// How a relayed stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamOutcome {
    /// Upstream finished and every fragment was handed to the transport.
    Completed,
    /// The transport dropped the body before the upstream finished.
    ClientAbort,
    /// The upstream failed after at least one fragment was produced.
    UpstreamError,
}

impl StreamOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::ClientAbort => "client_abort",
            Self::UpstreamError => "upstream_error",
        }
    }
}

impl std::fmt::Display for StreamOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
