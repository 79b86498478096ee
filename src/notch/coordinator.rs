//! Notch transition coordinator.
//!
//! Arbitrates hover, media and calendar signals into one published
//! [`NotchState`]. Like the reconciler it performs no I/O: timed work is
//! returned as [`CoordinatorEffect`]s and delivered back with the
//! generation it was issued under, so superseded callbacks are no-ops.
//!
//! Calendar edges run a two-phase sequence:
//!
//! ```text
//! calendar edge ─► phase 1: update(false, isPlaying, new value)   (immediate)
//!                      │
//!                settle delay   (a newer edge restarts the sequence)
//!                      ▼
//!                  phase 2: update(false, isPlaying, false)
//!                           showMediaAfterCalendar = isPlaying && !new value
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::NotchTiming;
use crate::debounce::DebouncedSignal;
use crate::notch::history::{TransitionCause, TransitionHistory};
use crate::notch::state::{NotchState, TransitionInputs};
use crate::observable::Observable;

/// Timed work requested by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorEffect {
    /// Deliver [`NotchCoordinator::hover_settled`] after `delay`.
    ScheduleHoverSettle { generation: u64, delay: Duration },
    /// Deliver [`NotchCoordinator::calendar_settled`] after `delay`.
    ScheduleCalendarSettle { generation: u64, delay: Duration },
}

/// Bookkeeping for an in-flight calendar sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSequence {
    pub generation: u64,
    pub forced_at: Instant,
    pub settle_delay: Duration,
    /// Calendar value the sequence was started for.
    pub calendar_active: bool,
}

#[derive(Debug)]
pub struct NotchCoordinator {
    state: Observable<NotchState>,
    show_media_after_calendar: Observable<bool>,
    hover: DebouncedSignal,
    media_active: bool,
    calendar_active: bool,
    pending: Option<PendingSequence>,
    sequence_generation: u64,
    settle_delay: Duration,
    history: Arc<TransitionHistory>,
}

impl NotchCoordinator {
    pub fn new(timing: &NotchTiming, history: Arc<TransitionHistory>) -> Self {
        Self {
            state: Observable::new(NotchState::Collapsed),
            show_media_after_calendar: Observable::new(false),
            hover: DebouncedSignal::new(false, timing.hover_debounce()),
            media_active: false,
            calendar_active: false,
            pending: None,
            sequence_generation: 0,
            settle_delay: timing.calendar_settle_delay(),
            history,
        }
    }

    pub fn state(&self) -> NotchState {
        self.state.get()
    }

    pub fn show_media_after_calendar(&self) -> bool {
        self.show_media_after_calendar.get()
    }

    pub fn calendar_active(&self) -> bool {
        self.calendar_active
    }

    /// Hover value that last survived the debounce window.
    pub fn hover_expanded(&self) -> bool {
        self.hover.settled()
    }

    pub fn pending(&self) -> Option<PendingSequence> {
        self.pending
    }

    pub fn history(&self) -> &Arc<TransitionHistory> {
        &self.history
    }

    pub fn subscribe_state(&self) -> tokio::sync::watch::Receiver<NotchState> {
        self.state.subscribe()
    }

    pub fn subscribe_show_media_after_calendar(&self) -> tokio::sync::watch::Receiver<bool> {
        self.show_media_after_calendar.subscribe()
    }

    /// Resolve `inputs` by priority and publish the result.
    ///
    /// The only place the state is assigned.
    pub fn update(&mut self, inputs: TransitionInputs, cause: TransitionCause) -> NotchState {
        let from = self.state.get();
        let to = inputs.resolve();
        if self.state.set(to) {
            let seq = self.history.record(from, to, inputs, cause);
            log::info!(
                "Notch {} -> {} ({:?}, #{}, inputs {:?})",
                from,
                to,
                cause,
                seq,
                inputs
            );
        }
        to
    }

    /// Raw pointer-presence change. Nothing is resolved until it settles.
    pub fn hover_changed(&mut self, hovering: bool) -> CoordinatorEffect {
        let ticket = self.hover.push(hovering);
        CoordinatorEffect::ScheduleHoverSettle {
            generation: ticket.generation,
            delay: ticket.delay,
        }
    }

    /// Debounce window elapsed for hover `generation`.
    pub fn hover_settled(&mut self, generation: u64) -> Option<NotchState> {
        let expanded = self.hover.settle(generation)?;
        let inputs = TransitionInputs::new(expanded, self.media_active, self.calendar_active);
        Some(self.update(inputs, TransitionCause::Hover))
    }

    /// The reconciler's `isPlaying` changed.
    ///
    /// Never interrupts a hover expansion; the new value is remembered and
    /// used once the hover ends.
    pub fn media_changed(&mut self, is_playing: bool) -> Option<NotchState> {
        self.media_active = is_playing;
        if self.state.get() == NotchState::Expanded {
            return None;
        }
        let inputs = TransitionInputs::new(false, is_playing, self.calendar_active);
        Some(self.update(inputs, TransitionCause::Media))
    }

    /// Edge of the external calendar-activity signal.
    ///
    /// Repeating the current value is ignored. A real edge runs phase 1
    /// immediately and returns the phase 2 callback to schedule, replacing
    /// any sequence still pending.
    pub fn calendar_changed(&mut self, active: bool, now: Instant) -> Option<CoordinatorEffect> {
        if active == self.calendar_active {
            return None;
        }
        self.calendar_active = active;

        self.sequence_generation = self.sequence_generation.wrapping_add(1);
        let generation = self.sequence_generation;
        if let Some(previous) = self.pending.replace(PendingSequence {
            generation,
            forced_at: now,
            settle_delay: self.settle_delay,
            calendar_active: active,
        }) {
            log::debug!(
                "Calendar sequence {} superseded by {}",
                previous.generation,
                generation
            );
        }

        let inputs = TransitionInputs::new(false, self.media_active, active);
        self.update(inputs, TransitionCause::CalendarForced);

        Some(CoordinatorEffect::ScheduleCalendarSettle {
            generation,
            delay: self.settle_delay,
        })
    }

    /// Settle delay elapsed for calendar sequence `generation`.
    ///
    /// `is_playing` is read fresh from the reconciler at delivery time.
    pub fn calendar_settled(&mut self, generation: u64, is_playing: bool) -> Option<NotchState> {
        let pending = match self.pending {
            Some(pending) if pending.generation == generation => pending,
            _ => {
                log::debug!("Dropping stale calendar settle {}", generation);
                return None;
            }
        };
        self.pending = None;
        self.media_active = is_playing;

        let inputs = TransitionInputs::new(false, is_playing, false);
        let state = self.update(inputs, TransitionCause::CalendarSettled);
        self.show_media_after_calendar
            .set(is_playing && !pending.calendar_active);
        Some(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> NotchCoordinator {
        NotchCoordinator::new(
            &NotchTiming::default(),
            Arc::new(TransitionHistory::with_capacity(16)),
        )
    }

    fn hover(c: &mut NotchCoordinator, hovering: bool) -> Option<NotchState> {
        let CoordinatorEffect::ScheduleHoverSettle { generation, delay } = c.hover_changed(hovering)
        else {
            panic!("hover must schedule a hover settle");
        };
        assert_eq!(delay, Duration::from_millis(100));
        c.hover_settled(generation)
    }

    fn calendar_generation(effect: Option<CoordinatorEffect>) -> u64 {
        match effect {
            Some(CoordinatorEffect::ScheduleCalendarSettle { generation, .. }) => generation,
            other => panic!("expected calendar settle, got {:?}", other),
        }
    }

    #[test]
    fn test_update_applies_priority() {
        let mut c = coordinator();
        for bits in 0u8..8 {
            let inputs = TransitionInputs::new(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0);
            assert_eq!(c.update(inputs, TransitionCause::Hover), inputs.resolve());
            assert_eq!(c.state(), inputs.resolve());
        }
    }

    #[test]
    fn test_hover_flip_flop_resolves_once() {
        let mut c = coordinator();
        let first = c.hover_changed(true);
        let second = c.hover_changed(false);
        let third = c.hover_changed(true);

        let generation = |effect| match effect {
            CoordinatorEffect::ScheduleHoverSettle { generation, .. } => generation,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(c.hover_settled(generation(first)), None);
        assert_eq!(c.hover_settled(generation(second)), None);
        assert_eq!(c.state(), NotchState::Collapsed);
        assert!(c.history().is_empty());

        assert_eq!(c.hover_settled(generation(third)), Some(NotchState::Expanded));
        assert_eq!(c.history().len(), 1);
    }

    #[test]
    fn test_media_change_does_not_interrupt_expansion() {
        let mut c = coordinator();
        hover(&mut c, true);
        assert_eq!(c.state(), NotchState::Expanded);

        assert_eq!(c.media_changed(true), None);
        assert_eq!(c.state(), NotchState::Expanded);

        assert_eq!(hover(&mut c, false), Some(NotchState::MediaActivity));
    }

    #[test]
    fn test_media_change_updates_compact_state() {
        let mut c = coordinator();
        assert_eq!(c.media_changed(true), Some(NotchState::MediaActivity));
        assert_eq!(c.media_changed(false), Some(NotchState::Collapsed));
    }

    #[test]
    fn test_calendar_edge_collapses_expansion_immediately() {
        let mut c = coordinator();
        c.media_changed(true);
        hover(&mut c, true);
        assert_eq!(c.state(), NotchState::Expanded);

        let t0 = Instant::now();
        let generation = calendar_generation(c.calendar_changed(true, t0));

        assert_eq!(c.state(), NotchState::CalendarActivity);
        let pending = c.pending().unwrap();
        assert_eq!(pending.generation, generation);
        assert_eq!(pending.forced_at, t0);
        assert_eq!(pending.settle_delay, Duration::from_secs(1));

        assert_eq!(
            c.calendar_settled(generation, true),
            Some(NotchState::MediaActivity)
        );
        assert!(!c.show_media_after_calendar());
        assert!(c.pending().is_none());
    }

    #[test]
    fn test_calendar_end_shows_media_after_settle() {
        let mut c = coordinator();
        c.media_changed(true);
        hover(&mut c, true);
        let t0 = Instant::now();

        calendar_generation(c.calendar_changed(true, t0));
        assert_eq!(c.state(), NotchState::CalendarActivity);

        let generation = calendar_generation(c.calendar_changed(false, t0 + Duration::from_millis(300)));
        assert_eq!(c.state(), NotchState::MediaActivity);

        assert_eq!(
            c.calendar_settled(generation, true),
            Some(NotchState::MediaActivity)
        );
        assert!(c.show_media_after_calendar());
    }

    #[test]
    fn test_superseded_calendar_settle_is_noop() {
        let mut c = coordinator();
        let t0 = Instant::now();
        let first = calendar_generation(c.calendar_changed(true, t0));
        let second = calendar_generation(c.calendar_changed(false, t0));
        let history_len = c.history().len();

        assert_eq!(c.calendar_settled(first, true), None);
        assert_eq!(c.history().len(), history_len);
        assert!(c.calendar_settled(second, false).is_some());
        assert_eq!(c.calendar_settled(second, false), None);
    }

    #[test]
    fn test_repeated_calendar_value_is_ignored() {
        let mut c = coordinator();
        assert!(c.calendar_changed(false, Instant::now()).is_none());
        calendar_generation(c.calendar_changed(true, Instant::now()));
        assert!(c.calendar_changed(true, Instant::now()).is_none());
    }

    #[test]
    fn test_settle_reads_fresh_playing_value() {
        let mut c = coordinator();
        let generation = calendar_generation(c.calendar_changed(true, Instant::now()));
        assert_eq!(
            c.calendar_settled(generation, true),
            Some(NotchState::MediaActivity)
        );

        let generation = calendar_generation(c.calendar_changed(false, Instant::now()));
        assert_eq!(c.calendar_settled(generation, false), Some(NotchState::Collapsed));
        assert!(!c.show_media_after_calendar());
    }

    #[test]
    fn test_media_change_during_alert_keeps_calendar_priority() {
        let mut c = coordinator();
        let generation = calendar_generation(c.calendar_changed(true, Instant::now()));
        c.calendar_settled(generation, false);
        assert_eq!(c.state(), NotchState::Collapsed);

        assert_eq!(c.media_changed(true), Some(NotchState::CalendarActivity));
    }

    #[test]
    fn test_history_records_causes() {
        let mut c = coordinator();
        c.media_changed(true);
        let generation = calendar_generation(c.calendar_changed(true, Instant::now()));
        c.calendar_settled(generation, true);

        let causes: Vec<_> = c.history().recent().iter().rev().map(|t| t.cause).collect();
        assert_eq!(
            causes,
            vec![
                TransitionCause::Media,
                TransitionCause::CalendarForced,
                TransitionCause::CalendarSettled,
            ]
        );
    }
}
