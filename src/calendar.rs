//! Calendar activity signal.
//!
//! Reduces a list of upcoming events to the two facts the notch cares
//! about: is an alert due right now, and is anything still coming up. Only
//! edges of `alert_due` are forwarded to the coordinator.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

/// Default lead time before an event starts that counts as "due".
const DEFAULT_LEAD_MINUTES: i64 = 5;

/// Default time after an event starts that it stays "due".
const DEFAULT_LINGER_MINUTES: i64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub is_all_day: bool,
}

/// Result of evaluating the event list at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CalendarReading {
    pub alert_due: bool,
    pub has_upcoming_event: bool,
}

/// When an event counts as an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertPolicy {
    pub lead_time: ChronoDuration,
    pub linger: ChronoDuration,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            lead_time: ChronoDuration::minutes(DEFAULT_LEAD_MINUTES),
            linger: ChronoDuration::minutes(DEFAULT_LINGER_MINUTES),
        }
    }
}

impl AlertPolicy {
    pub fn evaluate(&self, events: &[CalendarEvent], now: DateTime<Utc>) -> CalendarReading {
        let has_upcoming_event = events.iter().any(|event| event.end > now);
        let alert_due = events.iter().any(|event| self.is_due(event, now));
        CalendarReading {
            alert_due,
            has_upcoming_event,
        }
    }

    fn is_due(&self, event: &CalendarEvent, now: DateTime<Utc>) -> bool {
        if event.is_all_day {
            return false;
        }
        event.start - self.lead_time <= now && now < event.start + self.linger
    }
}

/// Edge detector over successive readings.
#[derive(Debug, Clone, Default)]
pub struct CalendarSignal {
    last: CalendarReading,
}

impl CalendarSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reading(&self) -> CalendarReading {
        self.last
    }

    /// Store `reading`; returns the new `alert_due` value only on an edge.
    pub fn observe(&mut self, reading: CalendarReading) -> Option<bool> {
        let previous = std::mem::replace(&mut self.last, reading);
        (previous.alert_due != reading.alert_due).then_some(reading.alert_due)
    }
}
