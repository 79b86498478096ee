//! Degradation kinds for reconciliation passes.
//!
//! None of these are surfaced to observers as errors. A pass that does not
//! commit a new snapshot reports which kind applied so callers (and logs)
//! can tell a stale answer from an unavailable source.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ways a reconciliation pass can degrade instead of committing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationKind {
    /// Provider answer arrived after the stale-response window.
    StaleResponse,
    /// Reported duration was at or below the validity floor.
    InvalidDuration,
    /// Backing app not running, or no information past the grace period.
    SourceUnavailable,
    /// Provider rejected a command. Only visible through logs.
    CommandFailed,
    /// Provider answered with something that could not be interpreted.
    MalformedResponse,
}

impl DegradationKind {
    /// Stable identifier used in log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StaleResponse => "stale_response",
            Self::InvalidDuration => "invalid_duration",
            Self::SourceUnavailable => "source_unavailable",
            Self::CommandFailed => "command_failed",
            Self::MalformedResponse => "malformed_response",
        }
    }
}

impl fmt::Display for DegradationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
