//! Canonical playback snapshot and provider payload parsing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::errors::ProviderError;

/// Opaque artwork handle. Cheap to clone; compared by content.
#[derive(Clone, PartialEq, Eq)]
pub struct ArtworkRef(Arc<[u8]>);

impl ArtworkRef {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ArtworkRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArtworkRef({} bytes)", self.0.len())
    }
}

/// Now-playing facts, replaced wholesale on every successful reconciliation.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Track length in seconds.
    pub duration: f64,
    /// Position in seconds, `0 <= elapsed_time <= duration` once committed.
    pub elapsed_time: f64,
    pub is_playing: bool,
    #[serde(skip)]
    pub artwork: Option<ArtworkRef>,
    pub source_app_name: String,
}

impl PlaybackSnapshot {
    /// Whether the provider actually said something.
    pub fn has_information(&self) -> bool {
        !self.title.trim().is_empty()
    }

    /// Reject numbers no reconciliation could make sense of.
    pub fn validate(&self) -> Result<(), ProviderError> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(ProviderError::Malformed(format!(
                "duration {}",
                self.duration
            )));
        }
        if !self.elapsed_time.is_finite() || self.elapsed_time < 0.0 {
            return Err(ProviderError::Malformed(format!(
                "elapsed time {}",
                self.elapsed_time
            )));
        }
        Ok(())
    }
}

/// Wire shape emitted by out-of-process now-playing bridges.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct NowPlayingPayload {
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    duration: Option<f64>,
    elapsed_time: Option<f64>,
    is_playing: Option<bool>,
    source_app_name: Option<String>,
}

/// Parse a JSON now-playing payload.
///
/// `Ok(None)` means "no information" (empty body, `null`, or empty title).
pub fn parse_now_playing(raw: &str) -> Result<Option<PlaybackSnapshot>, ProviderError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let payload: Option<NowPlayingPayload> =
        serde_json::from_str(raw).map_err(|e| ProviderError::Malformed(e.to_string()))?;
    let Some(payload) = payload else {
        return Ok(None);
    };

    let snapshot = PlaybackSnapshot {
        title: payload.title.unwrap_or_default(),
        artist: payload.artist.unwrap_or_default(),
        album: payload.album.unwrap_or_default(),
        duration: payload.duration.unwrap_or(0.0),
        elapsed_time: payload.elapsed_time.unwrap_or(0.0),
        is_playing: payload.is_playing.unwrap_or(false),
        artwork: None,
        source_app_name: payload.source_app_name.unwrap_or_default(),
    };

    if !snapshot.has_information() {
        return Ok(None);
    }
    snapshot.validate()?;
    Ok(Some(snapshot))
}
