//! Media provider contract.
//!
//! The provider is the OS-specific bridge that answers "what is playing" and
//! accepts playback commands. Only its contract lives here.

use std::future::Future;

use crate::errors::ProviderError;
use crate::playback::snapshot::PlaybackSnapshot;

/// Commands the reconciler sends to the provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProviderCommand {
    PlayPause,
    NextTrack,
    PreviousTrack,
    SeekTo(f64),
}

impl ProviderCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlayPause => "play_pause",
            Self::NextTrack => "next_track",
            Self::PreviousTrack => "previous_track",
            Self::SeekTo(_) => "seek_to",
        }
    }
}

/// Source of now-playing facts and sink for playback commands.
///
/// Every call is best-effort. Commands are fire-and-forget: an `Err` is
/// logged by the caller and otherwise ignored.
pub trait MediaProvider: Send + Sync {
    /// Whether the backing media application is running.
    fn is_app_running(&self) -> bool;

    /// Display name of the player currently driving playback.
    fn active_player_name(&self) -> String;

    /// Query now-playing info. May be slow; `Ok(None)` means no information.
    fn now_playing(
        &self,
    ) -> impl Future<Output = Result<Option<PlaybackSnapshot>, ProviderError>> + Send;

    fn play_pause(&self) -> Result<(), ProviderError>;

    fn next_track(&self) -> Result<(), ProviderError>;

    fn previous_track(&self) -> Result<(), ProviderError>;

    fn seek_to(&self, time: f64) -> Result<(), ProviderError>;

    /// Dispatch a [`ProviderCommand`] to the matching method.
    fn send(&self, command: ProviderCommand) -> Result<(), ProviderError> {
        match command {
            ProviderCommand::PlayPause => self.play_pause(),
            ProviderCommand::NextTrack => self.next_track(),
            ProviderCommand::PreviousTrack => self.previous_track(),
            ProviderCommand::SeekTo(time) => self.seek_to(time),
        }
    }
}
