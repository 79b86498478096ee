//! Timing configuration.
//!
//! Every interval, TTL and window used by the reconciler and the coordinator
//! is injected from here rather than hard-coded at the use site. Values are
//! stored as integer milliseconds in JSON and exposed as `Duration`s.
//!
//! Loading is forgiving: a missing or corrupt file yields defaults, and
//! out-of-range values are clamped with a log line rather than rejected.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use crate::errors::ConfigError;

/// Current schema version.
const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Smallest interval accepted for any timer.
const MIN_INTERVAL_MS: u64 = 10;

/// Upper bound for the calendar settle factor.
const MAX_SETTLE_FACTOR: f64 = 10.0;

/// Root timing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Schema version for migrations.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Playback reconciler timings.
    #[serde(default)]
    pub playback: PlaybackTiming,

    /// Notch coordinator timings.
    #[serde(default)]
    pub notch: NotchTiming,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            playback: PlaybackTiming::default(),
            notch: NotchTiming::default(),
        }
    }
}

/// Timings owned by the playback reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackTiming {
    /// Recurring reconciliation poll.
    pub poll_interval_ms: u64,
    /// Progress clock tick; also the per-tick increment of `currentTime`.
    pub progress_tick_ms: u64,
    /// How long an optimistic play/pause intent overrides fetched state.
    pub optimistic_intent_ttl_ms: u64,
    /// Provider answers older than this are discarded.
    pub stale_response_window_ms: u64,
    /// Delay before re-polling after an invalid duration.
    pub duration_retry_delay_ms: u64,
    /// Gap tolerated after the last good update before clearing state.
    pub no_info_grace_period_ms: u64,
    /// Consecutive duration retries allowed before deferring to the poll.
    pub max_duration_retries: u32,
    /// Durations at or below this many seconds are invalid.
    pub min_valid_duration_secs: f64,
}

impl Default for PlaybackTiming {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            progress_tick_ms: 100,
            optimistic_intent_ttl_ms: 1_500,
            stale_response_window_ms: 1_000,
            duration_retry_delay_ms: 500,
            no_info_grace_period_ms: 3_000,
            max_duration_retries: 2,
            min_valid_duration_secs: 1.0,
        }
    }
}

impl PlaybackTiming {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn progress_tick(&self) -> Duration {
        Duration::from_millis(self.progress_tick_ms)
    }

    pub fn optimistic_intent_ttl(&self) -> Duration {
        Duration::from_millis(self.optimistic_intent_ttl_ms)
    }

    pub fn stale_response_window(&self) -> Duration {
        Duration::from_millis(self.stale_response_window_ms)
    }

    pub fn duration_retry_delay(&self) -> Duration {
        Duration::from_millis(self.duration_retry_delay_ms)
    }

    pub fn no_info_grace_period(&self) -> Duration {
        Duration::from_millis(self.no_info_grace_period_ms)
    }
}

/// Timings owned by the notch coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotchTiming {
    /// Quiet window a hover value must survive before it is forwarded.
    pub hover_debounce_ms: u64,
    /// Base open/close animation duration of the rendering layer.
    pub animation_duration_ms: u64,
    /// Multiplier applied to the animation duration for the calendar settle delay.
    pub calendar_settle_factor: f64,
    /// Number of transitions kept for diagnostics.
    pub history_capacity: usize,
}

impl Default for NotchTiming {
    fn default() -> Self {
        Self {
            hover_debounce_ms: 100,
            animation_duration_ms: 400,
            calendar_settle_factor: 2.5,
            history_capacity: 64,
        }
    }
}

impl NotchTiming {
    pub fn hover_debounce(&self) -> Duration {
        Duration::from_millis(self.hover_debounce_ms)
    }

    pub fn animation_duration(&self) -> Duration {
        Duration::from_millis(self.animation_duration_ms)
    }

    /// Delay between the forced calendar transition and its settle pass.
    pub fn calendar_settle_delay(&self) -> Duration {
        calendar_settle_delay(self.animation_duration(), self.calendar_settle_factor)
    }
}

/// Settle delay as a function of the animation timing.
pub fn calendar_settle_delay(animation: Duration, factor: f64) -> Duration {
    let factor = if factor.is_finite() {
        factor.clamp(0.0, MAX_SETTLE_FACTOR)
    } else {
        1.0
    };
    animation.mul_f64(factor)
}

impl TimingConfig {
    /// Parse a configuration document and clamp it.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let mut config: TimingConfig = serde_json::from_str(raw)?;
        config.validate_and_clamp();
        Ok(config)
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Load configuration, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                log::info!("No timing config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                log::warn!("Timing config unusable, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Clamp values into ranges the timers can work with.
    pub fn validate_and_clamp(&mut self) {
        if self.schema_version != CURRENT_SCHEMA_VERSION {
            log::info!(
                "Timing config schema {} treated as {}",
                self.schema_version,
                CURRENT_SCHEMA_VERSION
            );
            self.schema_version = CURRENT_SCHEMA_VERSION;
        }

        let playback = &mut self.playback;
        for (name, value) in [
            ("poll_interval_ms", &mut playback.poll_interval_ms),
            ("progress_tick_ms", &mut playback.progress_tick_ms),
            ("duration_retry_delay_ms", &mut playback.duration_retry_delay_ms),
        ] {
            if *value < MIN_INTERVAL_MS {
                log::info!("Clamping {} from {} to {}", name, value, MIN_INTERVAL_MS);
                *value = MIN_INTERVAL_MS;
            }
        }

        if !playback.min_valid_duration_secs.is_finite() || playback.min_valid_duration_secs < 0.0
        {
            log::info!(
                "Invalid min_valid_duration_secs {}, resetting",
                playback.min_valid_duration_secs
            );
            playback.min_valid_duration_secs = PlaybackTiming::default().min_valid_duration_secs;
        }

        let notch = &mut self.notch;
        if !notch.calendar_settle_factor.is_finite() {
            notch.calendar_settle_factor = NotchTiming::default().calendar_settle_factor;
        }
        notch.calendar_settle_factor = notch.calendar_settle_factor.clamp(0.0, MAX_SETTLE_FACTOR);
        notch.history_capacity = notch.history_capacity.max(1);
    }
}

fn default_schema_version() -> u32 {
    CURRENT_SCHEMA_VERSION
}
