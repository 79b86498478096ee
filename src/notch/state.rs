//! Notch display state and its resolution rule.
//!
//! # Priority
//!
//! ```text
//!   calendarActive ──yes──► CalendarActivity
//!        │ no
//!   expanded ───────yes──► Expanded
//!        │ no
//!   mediaActive ────yes──► MediaActivity
//!        │ no
//!        ▼
//!    Collapsed
//! ```
//!
//! Every state is reachable from every other; there is no terminal state.

use serde::Serialize;
use std::fmt;

/// What the notch currently shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotchState {
    /// Idle, nothing to show.
    #[default]
    Collapsed,
    /// Opened by the user hovering over it.
    Expanded,
    /// Compact "now playing" indicator.
    MediaActivity,
    /// Calendar alert.
    CalendarActivity,
}

impl fmt::Display for NotchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Collapsed => "collapsed",
            Self::Expanded => "expanded",
            Self::MediaActivity => "media_activity",
            Self::CalendarActivity => "calendar_activity",
        };
        f.write_str(name)
    }
}

/// The only inputs to state resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct TransitionInputs {
    pub expanded: bool,
    pub media_active: bool,
    pub calendar_active: bool,
}

impl TransitionInputs {
    pub fn new(expanded: bool, media_active: bool, calendar_active: bool) -> Self {
        Self {
            expanded,
            media_active,
            calendar_active,
        }
    }

    /// Apply the priority rule.
    pub fn resolve(&self) -> NotchState {
        resolve(self.expanded, self.media_active, self.calendar_active)
    }
}

/// Calendar beats hover, hover beats media, media beats nothing.
pub fn resolve(expanded: bool, media_active: bool, calendar_active: bool) -> NotchState {
    if calendar_active {
        NotchState::CalendarActivity
    } else if expanded {
        NotchState::Expanded
    } else if media_active {
        NotchState::MediaActivity
    } else {
        NotchState::Collapsed
    }
}
