//! Single-threaded event loop tying the reconciler and coordinator together.
//!
//! All inputs (user commands, hover and calendar signals, provider answers,
//! timer callbacks) are posted onto one channel and handled to completion,
//! one at a time, by a single task. Nothing outside that task touches the
//! reconciler or the coordinator, so neither needs a lock.
//!
//! Consumers hold a cloneable [`NotchHandle`] to send inputs and a set of
//! `watch` receivers ([`NotchOutputs`]) to observe published state.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, watch};

use crate::calendar::{CalendarReading, CalendarSignal};
use crate::config::TimingConfig;
use crate::errors::{ProviderError, RuntimeError};
use crate::notch::coordinator::{CoordinatorEffect, NotchCoordinator};
use crate::notch::history::{NotchTransition, TransitionHistory};
use crate::notch::state::NotchState;
use crate::observable::Observable;
use crate::playback::provider::{MediaProvider, ProviderCommand};
use crate::playback::reconciler::{PlaybackEffect, PlaybackReconciler};
use crate::playback::snapshot::PlaybackSnapshot;
use crate::timer::{schedule_once, RepeatingTimer};

/// Messages processed by the event loop.
#[derive(Debug)]
enum Input {
    UpdateMediaState,
    TogglePlayPause,
    NextTrack,
    PreviousTrack,
    SeekTo(f64),
    SetScrubbing(bool),
    Hover(bool),
    Calendar {
        alert_due: bool,
        has_upcoming_event: Option<bool>,
    },
    Shutdown,
    PollTick,
    ProgressTick(u64),
    DurationRetry(u64),
    NowPlaying {
        requested_at: Instant,
        answer: Result<Option<PlaybackSnapshot>, ProviderError>,
    },
    HoverSettle(u64),
    CalendarSettle(u64),
}

/// Published outputs for the rendering layer.
#[derive(Debug, Clone)]
pub struct NotchOutputs {
    pub snapshot: watch::Receiver<Option<PlaybackSnapshot>>,
    pub is_playing: watch::Receiver<bool>,
    pub current_time: watch::Receiver<f64>,
    pub active_player_name: watch::Receiver<String>,
    pub is_scrubbing: watch::Receiver<bool>,
    pub notch_state: watch::Receiver<NotchState>,
    pub show_media_after_calendar: watch::Receiver<bool>,
    pub has_upcoming_event: watch::Receiver<bool>,
}

/// Cloneable handle to a running event loop.
#[derive(Debug, Clone)]
pub struct NotchHandle {
    tx: mpsc::UnboundedSender<Input>,
    outputs: NotchOutputs,
    history: Arc<TransitionHistory>,
}

impl NotchHandle {
    /// Fresh receivers for every published output.
    pub fn outputs(&self) -> NotchOutputs {
        self.outputs.clone()
    }

    /// Recent notch transitions, newest first.
    pub fn history(&self) -> Vec<NotchTransition> {
        self.history.recent()
    }

    pub fn update_media_state(&self) -> Result<(), RuntimeError> {
        self.send(Input::UpdateMediaState)
    }

    pub fn toggle_play_pause(&self) -> Result<(), RuntimeError> {
        self.send(Input::TogglePlayPause)
    }

    pub fn next_track(&self) -> Result<(), RuntimeError> {
        self.send(Input::NextTrack)
    }

    pub fn previous_track(&self) -> Result<(), RuntimeError> {
        self.send(Input::PreviousTrack)
    }

    /// Seek to `time` seconds. Clamp to `[0, duration]` before calling.
    pub fn seek_to(&self, time: f64) -> Result<(), RuntimeError> {
        self.send(Input::SeekTo(time))
    }

    pub fn set_scrubbing(&self, scrubbing: bool) -> Result<(), RuntimeError> {
        self.send(Input::SetScrubbing(scrubbing))
    }

    /// Raw pointer-presence change from the presentation layer.
    pub fn hover_changed(&self, hovering: bool) -> Result<(), RuntimeError> {
        self.send(Input::Hover(hovering))
    }

    /// The "alert due" calendar signal changed.
    pub fn calendar_changed(&self, alert_due: bool) -> Result<(), RuntimeError> {
        self.send(Input::Calendar {
            alert_due,
            has_upcoming_event: None,
        })
    }

    /// Push a full calendar reading from an external monitor.
    pub fn set_calendar_reading(&self, reading: CalendarReading) -> Result<(), RuntimeError> {
        self.send(Input::Calendar {
            alert_due: reading.alert_due,
            has_upcoming_event: Some(reading.has_upcoming_event),
        })
    }

    /// Stop timers and end the loop. Later calls return `Stopped`.
    pub fn shutdown(&self) -> Result<(), RuntimeError> {
        self.send(Input::Shutdown)
    }

    fn send(&self, input: Input) -> Result<(), RuntimeError> {
        self.tx.send(input).map_err(|_| RuntimeError::Stopped)
    }
}

/// Start the event loop on the current tokio runtime.
///
/// `config` is clamped first, so values built in code get the same bounds
/// as a loaded file.
pub fn spawn<P: MediaProvider + 'static>(
    provider: Arc<P>,
    mut config: TimingConfig,
) -> NotchHandle {
    config.validate_and_clamp();
    let (tx, rx) = mpsc::unbounded_channel();
    let history = Arc::new(TransitionHistory::with_capacity(
        config.notch.history_capacity,
    ));
    let runtime = NotchRuntime::new(provider, &config, Arc::clone(&history), tx.clone());
    let outputs = runtime.outputs();

    tokio::spawn(runtime.run(rx));

    NotchHandle {
        tx,
        outputs,
        history,
    }
}

fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

struct NotchRuntime<P> {
    provider: Arc<P>,
    reconciler: PlaybackReconciler,
    coordinator: NotchCoordinator,
    calendar: CalendarSignal,
    has_upcoming_event: Observable<bool>,
    tx: mpsc::UnboundedSender<Input>,
    poll_timer: RepeatingTimer,
    progress_clock: RepeatingTimer,
}

impl<P: MediaProvider + 'static> NotchRuntime<P> {
    fn new(
        provider: Arc<P>,
        config: &TimingConfig,
        history: Arc<TransitionHistory>,
        tx: mpsc::UnboundedSender<Input>,
    ) -> Self {
        let playback = config.playback.clone();
        Self {
            provider,
            poll_timer: RepeatingTimer::new("poll", playback.poll_interval()),
            progress_clock: RepeatingTimer::new("progress", playback.progress_tick()),
            reconciler: PlaybackReconciler::new(playback),
            coordinator: NotchCoordinator::new(&config.notch, history),
            calendar: CalendarSignal::new(),
            has_upcoming_event: Observable::new(false),
            tx,
        }
    }

    fn outputs(&self) -> NotchOutputs {
        NotchOutputs {
            snapshot: self.reconciler.subscribe_snapshot(),
            is_playing: self.reconciler.subscribe_is_playing(),
            current_time: self.reconciler.subscribe_current_time(),
            active_player_name: self.reconciler.subscribe_active_player_name(),
            is_scrubbing: self.reconciler.subscribe_is_scrubbing(),
            notch_state: self.coordinator.subscribe_state(),
            show_media_after_calendar: self.coordinator.subscribe_show_media_after_calendar(),
            has_upcoming_event: self.has_upcoming_event.subscribe(),
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Input>) {
        log::info!(
            "Notch runtime started (poll every {:?})",
            self.poll_timer.period()
        );
        self.poll_timer.start(&self.tx, true, |_| Input::PollTick);

        while let Some(input) = rx.recv().await {
            if matches!(input, Input::Shutdown) {
                break;
            }
            self.handle(input);
        }

        self.poll_timer.stop();
        self.progress_clock.stop();
        log::info!("Notch runtime stopped");
    }

    fn handle(&mut self, input: Input) {
        let now = now();
        let was_playing = self.reconciler.is_playing();

        match input {
            Input::UpdateMediaState | Input::PollTick => self.reconcile(now),
            Input::DurationRetry(generation) => {
                if self.reconciler.on_retry(generation) {
                    self.reconcile(now);
                }
            }
            Input::NowPlaying {
                requested_at,
                answer,
            } => {
                let result = self.reconciler.finish_pass(now, requested_at, answer);
                log::debug!("Reconciliation pass: {:?}", result.outcome);
                self.apply_playback(result.effects, now);
            }
            Input::TogglePlayPause => {
                let effects = self.reconciler.toggle_play_pause(now);
                self.apply_playback(effects, now);
            }
            Input::NextTrack => {
                let effects = self.reconciler.next_track();
                self.apply_playback(effects, now);
            }
            Input::PreviousTrack => {
                let effects = self.reconciler.previous_track();
                self.apply_playback(effects, now);
            }
            Input::SeekTo(time) => {
                let effects = self.reconciler.seek_to(time);
                self.apply_playback(effects, now);
            }
            Input::SetScrubbing(scrubbing) => self.reconciler.set_scrubbing(scrubbing),
            Input::ProgressTick(epoch) => {
                if self.progress_clock.is_current(epoch) {
                    self.reconciler.progress_tick();
                }
            }
            Input::Hover(hovering) => {
                let effect = self.coordinator.hover_changed(hovering);
                self.apply_coordinator(effect);
            }
            Input::HoverSettle(generation) => {
                self.coordinator.hover_settled(generation);
            }
            Input::Calendar {
                alert_due,
                has_upcoming_event,
            } => {
                let has_upcoming_event = has_upcoming_event
                    .unwrap_or_else(|| self.calendar.reading().has_upcoming_event);
                self.has_upcoming_event.set(has_upcoming_event);
                let reading = CalendarReading {
                    alert_due,
                    has_upcoming_event,
                };
                if let Some(active) = self.calendar.observe(reading) {
                    if let Some(effect) = self.coordinator.calendar_changed(active, now) {
                        self.apply_coordinator(effect);
                    }
                }
            }
            Input::CalendarSettle(generation) => {
                let is_playing = self.reconciler.is_playing();
                self.coordinator.calendar_settled(generation, is_playing);
            }
            Input::Shutdown => {}
        }

        let is_playing = self.reconciler.is_playing();
        if is_playing != was_playing {
            self.coordinator.media_changed(is_playing);
        }
    }

    fn reconcile(&mut self, now: Instant) {
        let running = self.provider.is_app_running();
        let player_name = if running {
            self.provider.active_player_name()
        } else {
            String::new()
        };
        let effects = self.reconciler.begin_pass(now, running, player_name);
        self.apply_playback(effects, now);
    }

    fn apply_playback(&mut self, effects: Vec<PlaybackEffect>, now: Instant) {
        for effect in effects {
            match effect {
                PlaybackEffect::Query { requested_at } => self.query(requested_at),
                PlaybackEffect::Send(command) => self.send_command(command),
                PlaybackEffect::Reconcile => self.reconcile(now),
                PlaybackEffect::ScheduleRetry { generation, delay } => {
                    schedule_once(&self.tx, delay, Input::DurationRetry(generation));
                }
                PlaybackEffect::StartProgressClock => {
                    self.progress_clock.start(&self.tx, false, Input::ProgressTick);
                }
                PlaybackEffect::StopProgressClock => self.progress_clock.stop(),
            }
        }
    }

    fn apply_coordinator(&mut self, effect: CoordinatorEffect) {
        match effect {
            CoordinatorEffect::ScheduleHoverSettle { generation, delay } => {
                schedule_once(&self.tx, delay, Input::HoverSettle(generation));
            }
            CoordinatorEffect::ScheduleCalendarSettle { generation, delay } => {
                schedule_once(&self.tx, delay, Input::CalendarSettle(generation));
            }
        }
    }

    fn query(&self, requested_at: Instant) {
        let provider = Arc::clone(&self.provider);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let answer = provider.now_playing().await;
            let _ = tx.send(Input::NowPlaying {
                requested_at,
                answer,
            });
        });
    }

    fn send_command(&self, command: ProviderCommand) {
        if let Err(e) = self.provider.send(command) {
            log::warn!("{}", e);
        }
    }
}
