//! Playback reconciliation: snapshot model, provider contract, reconciler.

pub mod provider;
pub mod reconciler;
pub mod snapshot;

pub use provider::{MediaProvider, ProviderCommand};
pub use reconciler::{PassOutcome, PassResult, PlaybackEffect, PlaybackReconciler};
pub use snapshot::{parse_now_playing, ArtworkRef, PlaybackSnapshot};
