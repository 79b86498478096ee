//! Ring buffer of recent notch transitions, kept for diagnostics.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::notch::state::{NotchState, TransitionInputs};

/// What caused a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    /// A debounced hover value settled.
    Hover,
    /// The reconciler's `isPlaying` changed.
    Media,
    /// Phase 1 of a calendar sequence.
    CalendarForced,
    /// Phase 2 of a calendar sequence.
    CalendarSettled,
}

/// One published state change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotchTransition {
    /// Monotonic per-history sequence number.
    pub seq: u64,
    pub from: NotchState,
    pub to: NotchState,
    pub inputs: TransitionInputs,
    pub cause: TransitionCause,
    pub at: DateTime<Utc>,
}

/// Bounded, thread-safe transition history.
#[derive(Debug)]
pub struct TransitionHistory {
    entries: RwLock<VecDeque<NotchTransition>>,
    capacity: usize,
    next_seq: AtomicU64,
}

impl TransitionHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
            next_seq: AtomicU64::new(1),
        }
    }

    /// Record a transition, evicting the oldest entry when full.
    pub fn record(
        &self,
        from: NotchState,
        to: NotchState,
        inputs: TransitionInputs,
        cause: TransitionCause,
    ) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.write();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(NotchTransition {
            seq,
            from,
            to,
            inputs,
            cause,
            at: Utc::now(),
        });
        seq
    }

    /// All retained transitions, newest first.
    pub fn recent(&self) -> Vec<NotchTransition> {
        self.read().iter().rev().cloned().collect()
    }

    pub fn last(&self) -> Option<NotchTransition> {
        self.read().back().cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    // A panic while holding the lock leaves the deque intact; keep using it.
    fn read(&self) -> RwLockReadGuard<'_, VecDeque<NotchTransition>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, VecDeque<NotchTransition>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}
