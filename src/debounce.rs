//! Debounced boolean signal.
//!
//! Raw flips are buffered. Every flip bumps a generation counter and asks the
//! caller to schedule a settle callback after the quiet window; a callback is
//! honored only if its generation is still the latest one issued.

use std::time::Duration;

/// Request to deliver a settle callback after `delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleTicket {
    pub generation: u64,
    pub delay: Duration,
}

#[derive(Debug, Clone)]
pub struct DebouncedSignal {
    quiet_window: Duration,
    latest: bool,
    settled: bool,
    generation: u64,
}

impl DebouncedSignal {
    pub fn new(initial: bool, quiet_window: Duration) -> Self {
        Self {
            quiet_window,
            latest: initial,
            settled: initial,
            generation: 0,
        }
    }

    /// Record a raw value and return the settle callback to schedule.
    pub fn push(&mut self, value: bool) -> SettleTicket {
        self.latest = value;
        self.generation = self.generation.wrapping_add(1);
        SettleTicket {
            generation: self.generation,
            delay: self.quiet_window,
        }
    }

    /// Deliver a settle callback.
    ///
    /// Returns the value to forward, or `None` when a newer raw value has
    /// superseded this callback.
    pub fn settle(&mut self, generation: u64) -> Option<bool> {
        if generation != self.generation {
            log::debug!(
                "Debounce settle {} superseded by {}",
                generation,
                self.generation
            );
            return None;
        }
        self.settled = self.latest;
        Some(self.settled)
    }

    /// Last value that survived the quiet window.
    pub fn settled(&self) -> bool {
        self.settled
    }

    /// Most recent raw value, settled or not.
    pub fn latest(&self) -> bool {
        self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal() -> DebouncedSignal {
        DebouncedSignal::new(false, Duration::from_millis(100))
    }

    #[test]
    fn test_single_flip_settles() {
        let mut hover = signal();
        let ticket = hover.push(true);
        assert_eq!(ticket.delay, Duration::from_millis(100));
        assert_eq!(hover.settle(ticket.generation), Some(true));
        assert!(hover.settled());
    }

    #[test]
    fn test_flip_flop_only_last_ticket_survives() {
        let mut hover = signal();
        let first = hover.push(true);
        let second = hover.push(false);
        let third = hover.push(true);

        assert_eq!(hover.settle(first.generation), None);
        assert_eq!(hover.settle(second.generation), None);
        assert!(!hover.settled());
        assert_eq!(hover.settle(third.generation), Some(true));
    }

    #[test]
    fn test_stale_ticket_after_settle_is_ignored() {
        let mut hover = signal();
        let first = hover.push(true);
        assert_eq!(hover.settle(first.generation), Some(true));
        let second = hover.push(false);
        assert!(hover.settled());
        assert!(!hover.latest());
        assert_eq!(hover.settle(first.generation), None);
        assert_eq!(hover.settle(second.generation), Some(false));
    }
}
