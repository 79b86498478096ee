//! Playback reconciler.
//!
//! Turns a slow, lossy, polled provider into one canonical playback
//! snapshot. The reconciler performs no I/O itself: every operation takes
//! the current `Instant` and returns [`PlaybackEffect`]s for the runtime to
//! carry out (query the provider, send a command, arm a timer). Provider
//! answers come back through [`PlaybackReconciler::finish_pass`] tagged with
//! the instant their pass started.
//!
//! # One pass
//!
//! ```text
//! begin_pass ──app not running──► clear
//!     │
//!     ▼ Query { requested_at }
//! finish_pass ──older than stale window──► discard
//!     ├─ issued before the last applied pass ──► discard
//!     │
//!     ├─ no information ──► hold (within grace) / clear
//!     ├─ duration invalid ──► cached duration (same title) / one retry
//!     ▼
//! commit: cache duration, resolve isPlaying (intent wins while in force),
//!         publish snapshot, currentTime (unless scrubbing), progress clock
//! ```

use std::time::{Duration, Instant};

use crate::config::PlaybackTiming;
use crate::errors::{DegradationKind, ProviderError};
use crate::intent::OptimisticIntent;
use crate::observable::Observable;
use crate::playback::provider::ProviderCommand;
use crate::playback::snapshot::PlaybackSnapshot;

/// Work the runtime must perform on behalf of the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEffect {
    /// Ask the provider for now-playing info, tagging the answer with `requested_at`.
    Query { requested_at: Instant },
    /// Fire-and-forget provider command.
    Send(ProviderCommand),
    /// Run another reconciliation pass now.
    Reconcile,
    /// Deliver [`PlaybackReconciler::on_retry`] with `generation` after `delay`.
    ScheduleRetry { generation: u64, delay: Duration },
    /// (Re)start the repeating progress clock.
    StartProgressClock,
    /// Stop the progress clock; ticks already queued are dropped.
    StopProgressClock,
}

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// A new canonical snapshot was committed.
    Committed { substituted_duration: bool },
    /// No information, but the last good update is recent enough to keep.
    GraceHold,
    /// Canonical state was cleared.
    Cleared(DegradationKind),
    /// Duration was invalid; a retry was scheduled and nothing else changed.
    RetryScheduled { generation: u64 },
    /// The answer was dropped without any state change.
    Discarded(DegradationKind),
}

/// Outcome plus the effects it requires.
#[derive(Debug, Clone, PartialEq)]
pub struct PassResult {
    pub outcome: PassOutcome,
    pub effects: Vec<PlaybackEffect>,
}

impl PassResult {
    fn new(outcome: PassOutcome, effects: Vec<PlaybackEffect>) -> Self {
        Self { outcome, effects }
    }
}

/// Last valid duration seen for a title.
#[derive(Debug, Clone, PartialEq)]
struct CachedDuration {
    title: String,
    seconds: f64,
}

/// Owner of canonical playback state.
#[derive(Debug)]
pub struct PlaybackReconciler {
    timing: PlaybackTiming,
    snapshot: Observable<Option<PlaybackSnapshot>>,
    is_playing: Observable<bool>,
    current_time: Observable<f64>,
    active_player_name: Observable<String>,
    is_scrubbing: Observable<bool>,
    intent: Option<OptimisticIntent>,
    cached_duration: Option<CachedDuration>,
    last_update: Option<Instant>,
    /// Request instant of the newest pass that committed or cleared.
    applied_request: Option<Instant>,
    /// Player name reported when the latest pass began.
    reported_player_name: String,
    retry_generation: u64,
    pending_retry: Option<u64>,
    consecutive_retries: u32,
    progress_running: bool,
}

impl PlaybackReconciler {
    pub fn new(timing: PlaybackTiming) -> Self {
        Self {
            timing,
            snapshot: Observable::new(None),
            is_playing: Observable::new(false),
            current_time: Observable::new(0.0),
            active_player_name: Observable::new(String::new()),
            is_scrubbing: Observable::new(false),
            intent: None,
            cached_duration: None,
            last_update: None,
            applied_request: None,
            reported_player_name: String::new(),
            retry_generation: 0,
            pending_retry: None,
            consecutive_retries: 0,
            progress_running: false,
        }
    }

    pub fn timing(&self) -> &PlaybackTiming {
        &self.timing
    }

    pub fn snapshot(&self) -> Option<PlaybackSnapshot> {
        self.snapshot.get()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing.get()
    }

    pub fn current_time(&self) -> f64 {
        self.current_time.get()
    }

    pub fn active_player_name(&self) -> String {
        self.active_player_name.get()
    }

    pub fn is_scrubbing(&self) -> bool {
        self.is_scrubbing.get()
    }

    pub fn intent(&self) -> Option<OptimisticIntent> {
        self.intent
    }

    /// Last valid duration cached for the current title.
    pub fn cached_duration(&self) -> Option<f64> {
        self.cached_duration.as_ref().map(|cache| cache.seconds)
    }

    pub fn progress_clock_running(&self) -> bool {
        self.progress_running
    }

    pub fn subscribe_snapshot(&self) -> tokio::sync::watch::Receiver<Option<PlaybackSnapshot>> {
        self.snapshot.subscribe()
    }

    pub fn subscribe_is_playing(&self) -> tokio::sync::watch::Receiver<bool> {
        self.is_playing.subscribe()
    }

    pub fn subscribe_current_time(&self) -> tokio::sync::watch::Receiver<f64> {
        self.current_time.subscribe()
    }

    pub fn subscribe_active_player_name(&self) -> tokio::sync::watch::Receiver<String> {
        self.active_player_name.subscribe()
    }

    pub fn subscribe_is_scrubbing(&self) -> tokio::sync::watch::Receiver<bool> {
        self.is_scrubbing.subscribe()
    }

    /// Start a reconciliation pass.
    ///
    /// The running check is unconditional: a stopped app clears everything
    /// no matter what else is pending.
    pub fn begin_pass(
        &mut self,
        now: Instant,
        app_running: bool,
        player_name: String,
    ) -> Vec<PlaybackEffect> {
        if !app_running {
            if self.snapshot.get().is_some() || self.is_playing.get() {
                log::info!("Media app not running, clearing playback state");
            }
            return self.clear(now);
        }

        self.reported_player_name = player_name;
        vec![PlaybackEffect::Query { requested_at: now }]
    }

    /// Finish a pass with the provider's answer.
    pub fn finish_pass(
        &mut self,
        now: Instant,
        requested_at: Instant,
        answer: Result<Option<PlaybackSnapshot>, ProviderError>,
    ) -> PassResult {
        let age = now.saturating_duration_since(requested_at);
        if age > self.timing.stale_response_window() {
            log::debug!("Discarding provider answer {:?} old", age);
            return PassResult::new(
                PassOutcome::Discarded(DegradationKind::StaleResponse),
                Vec::new(),
            );
        }
        if self.applied_request.is_some_and(|applied| requested_at < applied) {
            log::debug!("Discarding provider answer overtaken by a newer pass");
            return PassResult::new(
                PassOutcome::Discarded(DegradationKind::StaleResponse),
                Vec::new(),
            );
        }

        let fetched = match answer {
            Ok(Some(snapshot)) if snapshot.has_information() => match snapshot.validate() {
                Ok(()) => snapshot,
                Err(e) => {
                    log::warn!("Ignoring provider snapshot: {}", e);
                    return self.no_information(now, requested_at, e.degradation());
                }
            },
            Ok(_) => {
                return self.no_information(now, requested_at, DegradationKind::SourceUnavailable);
            }
            Err(e) => {
                log::debug!("Provider query failed: {}", e);
                return self.no_information(now, requested_at, e.degradation());
            }
        };

        let mut substituted_duration = false;
        let duration = if fetched.duration > self.timing.min_valid_duration_secs {
            fetched.duration
        } else if let Some(cached) = self.cached_duration_for(&fetched.title) {
            log::debug!(
                "Substituting cached duration {:.1}s for '{}'",
                cached,
                fetched.title
            );
            substituted_duration = true;
            cached
        } else {
            return self.schedule_retry(&fetched.title);
        };

        if !substituted_duration {
            self.cached_duration = Some(CachedDuration {
                title: fetched.title.clone(),
                seconds: duration,
            });
        }
        self.consecutive_retries = 0;
        self.pending_retry = None;
        self.last_update = Some(now);
        self.applied_request = Some(requested_at);
        self.active_player_name.set(self.reported_player_name.clone());

        let ttl = self.timing.optimistic_intent_ttl();
        let is_playing = match self.intent.filter(|intent| intent.in_force(now, ttl)) {
            Some(intent) => intent.desired_is_playing,
            None => {
                self.intent = None;
                fetched.is_playing
            }
        };
        self.is_playing.set(is_playing);

        let elapsed_time = fetched.elapsed_time.clamp(0.0, duration);
        let snapshot = PlaybackSnapshot {
            duration,
            elapsed_time,
            is_playing,
            ..fetched
        };
        self.snapshot.set(Some(snapshot));

        if !self.is_scrubbing.get() {
            self.current_time.set(elapsed_time);
        }

        let mut effects = Vec::new();
        if is_playing {
            self.progress_running = true;
            effects.push(PlaybackEffect::StartProgressClock);
        } else {
            self.stop_progress(&mut effects);
        }

        PassResult::new(
            PassOutcome::Committed {
                substituted_duration,
            },
            effects,
        )
    }

    /// Deliver a scheduled duration retry.
    ///
    /// Returns whether a reconciliation pass should run.
    pub fn on_retry(&mut self, generation: u64) -> bool {
        if self.pending_retry == Some(generation) {
            self.pending_retry = None;
            true
        } else {
            log::debug!("Dropping superseded duration retry {}", generation);
            false
        }
    }

    /// Flip play/pause optimistically and ask the provider to follow.
    pub fn toggle_play_pause(&mut self, now: Instant) -> Vec<PlaybackEffect> {
        let desired = !self.is_playing.get();
        self.intent = Some(OptimisticIntent::new(desired, now));
        self.is_playing.set(desired);

        let mut effects = vec![PlaybackEffect::Send(ProviderCommand::PlayPause)];
        if let Some(mut snapshot) = self.snapshot.get() {
            snapshot.is_playing = desired;
            self.snapshot.set(Some(snapshot));
            if desired {
                self.progress_running = true;
                effects.push(PlaybackEffect::StartProgressClock);
            }
        }
        if !desired {
            self.stop_progress(&mut effects);
        }
        effects.push(PlaybackEffect::Reconcile);
        effects
    }

    pub fn next_track(&mut self) -> Vec<PlaybackEffect> {
        vec![
            PlaybackEffect::Send(ProviderCommand::NextTrack),
            PlaybackEffect::Reconcile,
        ]
    }

    pub fn previous_track(&mut self) -> Vec<PlaybackEffect> {
        vec![
            PlaybackEffect::Send(ProviderCommand::PreviousTrack),
            PlaybackEffect::Reconcile,
        ]
    }

    /// Jump to `time`. The caller clamps to `[0, duration]`.
    pub fn seek_to(&mut self, time: f64) -> Vec<PlaybackEffect> {
        if let Some(mut snapshot) = self.snapshot.get() {
            snapshot.elapsed_time = time;
            self.snapshot.set(Some(snapshot));
        }
        self.current_time.set(time);
        vec![
            PlaybackEffect::Send(ProviderCommand::SeekTo(time)),
            PlaybackEffect::Reconcile,
        ]
    }

    /// While scrubbing the consumer owns `currentTime`.
    pub fn set_scrubbing(&mut self, scrubbing: bool) {
        self.is_scrubbing.set(scrubbing);
    }

    /// Advance the interpolated progress by one tick.
    ///
    /// Returns whether `currentTime` changed.
    pub fn progress_tick(&mut self) -> bool {
        if self.is_scrubbing.get() || !self.is_playing.get() {
            return false;
        }
        let Some(duration) = self.snapshot.get().map(|snapshot| snapshot.duration) else {
            return false;
        };
        let step = self.timing.progress_tick().as_secs_f64();
        let next = (self.current_time.get() + step).min(duration);
        self.current_time.set(next)
    }

    fn cached_duration_for(&self, title: &str) -> Option<f64> {
        let canonical_title = self.snapshot.get().map(|snapshot| snapshot.title)?;
        if canonical_title != title {
            return None;
        }
        self.cached_duration
            .as_ref()
            .filter(|cache| cache.title == title)
            .map(|cache| cache.seconds)
            .filter(|seconds| *seconds > self.timing.min_valid_duration_secs)
    }

    fn schedule_retry(&mut self, title: &str) -> PassResult {
        if self.consecutive_retries >= self.timing.max_duration_retries {
            log::debug!(
                "Invalid duration for '{}' after {} retries, deferring to poll",
                title,
                self.consecutive_retries
            );
            return PassResult::new(
                PassOutcome::Discarded(DegradationKind::InvalidDuration),
                Vec::new(),
            );
        }

        self.consecutive_retries += 1;
        self.retry_generation = self.retry_generation.wrapping_add(1);
        let generation = self.retry_generation;
        self.pending_retry = Some(generation);
        log::debug!(
            "Invalid duration for '{}', retry {} scheduled",
            title,
            self.consecutive_retries
        );

        PassResult::new(
            PassOutcome::RetryScheduled { generation },
            vec![PlaybackEffect::ScheduleRetry {
                generation,
                delay: self.timing.duration_retry_delay(),
            }],
        )
    }

    fn no_information(
        &mut self,
        now: Instant,
        requested_at: Instant,
        kind: DegradationKind,
    ) -> PassResult {
        if let Some(last) = self.last_update {
            if now.saturating_duration_since(last) < self.timing.no_info_grace_period() {
                log::debug!("No playback information ({}), within grace period", kind);
                return PassResult::new(PassOutcome::GraceHold, Vec::new());
            }
        }

        if self.snapshot.get().is_some() {
            log::info!("No playback information ({}), clearing state", kind);
        }
        let effects = self.clear(requested_at);
        PassResult::new(PassOutcome::Cleared(kind), effects)
    }

    /// Reset canonical state as of the pass requested at `requested_at`.
    fn clear(&mut self, requested_at: Instant) -> Vec<PlaybackEffect> {
        self.applied_request = Some(requested_at);
        self.snapshot.set(None);
        self.is_playing.set(false);
        self.current_time.set(0.0);
        self.intent = None;
        self.pending_retry = None;
        self.consecutive_retries = 0;
        self.last_update = None;

        let mut effects = Vec::new();
        self.stop_progress(&mut effects);
        effects
    }

    fn stop_progress(&mut self, effects: &mut Vec<PlaybackEffect>) {
        if self.progress_running {
            self.progress_running = false;
            effects.push(PlaybackEffect::StopProgressClock);
        }
    }
}
