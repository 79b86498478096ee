//! Error types for the notch core.
//!
//! The core has no fatal error class: provider failures degrade to
//! "no information" and command failures are logged. The types here exist
//! for the seams where a `Result` is still the honest signature.
//!
//! | Error            | Raised by                  | Handling                       |
//! |------------------|----------------------------|--------------------------------|
//! | `ProviderError`  | `MediaProvider` impls      | mapped to "no information"     |
//! | `ConfigError`    | `TimingConfig::load`       | `load_or_default` falls back   |
//! | `RuntimeError`   | `NotchHandle` methods      | event loop already shut down   |

mod kinds;

pub use kinds::DegradationKind;

use std::path::PathBuf;
use thiserror::Error;

/// Errors a media provider may report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// The provider could not be reached at all.
    #[error("media provider unavailable")]
    Unavailable,
    /// The provider answered but the payload made no sense.
    #[error("malformed now-playing payload: {0}")]
    Malformed(String),
    /// A playback command was refused.
    #[error("provider command '{command}' failed: {reason}")]
    CommandFailed {
        command: &'static str,
        reason: String,
    },
    /// The provider did not answer in time.
    #[error("media provider timed out")]
    Timeout,
}

impl ProviderError {
    /// Degradation kind this error maps to when it ends a pass.
    pub fn degradation(&self) -> DegradationKind {
        match self {
            Self::Malformed(_) => DegradationKind::MalformedResponse,
            Self::CommandFailed { .. } => DegradationKind::CommandFailed,
            Self::Unavailable | Self::Timeout => DegradationKind::SourceUnavailable,
        }
    }
}

/// Errors loading timing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors returned by the runtime handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("notch runtime has stopped")]
    Stopped,
}
