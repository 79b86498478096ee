//! Optimistic play/pause intent.

use std::time::{Duration, Instant};

/// A user-requested playback state that overrides fetched state for a TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimisticIntent {
    pub desired_is_playing: bool,
    pub issued_at: Instant,
}

impl OptimisticIntent {
    pub fn new(desired_is_playing: bool, issued_at: Instant) -> Self {
        Self {
            desired_is_playing,
            issued_at,
        }
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.issued_at)
    }

    /// Whether the intent still overrides fetched state at `now`.
    pub fn in_force(&self, now: Instant, ttl: Duration) -> bool {
        self.age(now) < ttl
    }
}
