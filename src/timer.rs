//! Timer plumbing for the event loop.
//!
//! Timers never touch state directly: they post a message back onto the
//! loop's channel. One-shots are filtered by generation when delivered;
//! repeating timers are explicitly started and stopped, and every message
//! carries the epoch it was started under so ticks queued before a restart
//! can be recognized and dropped.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Shortest period a repeating timer will run at.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Post `message` to `tx` after `delay`.
pub fn schedule_once<T: Send + 'static>(
    tx: &UnboundedSender<T>,
    delay: Duration,
    message: T,
) -> JoinHandle<()> {
    let tx = tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        // Loop already gone: nothing left to deliver to.
        let _ = tx.send(message);
    })
}

/// A repeating timer owned by the event loop.
#[derive(Debug)]
pub struct RepeatingTimer {
    name: &'static str,
    period: Duration,
    epoch: u64,
    handle: Option<JoinHandle<()>>,
}

impl RepeatingTimer {
    /// `period` is raised to [`MIN_PERIOD`]; `interval_at` rejects zero.
    pub fn new(name: &'static str, period: Duration) -> Self {
        Self {
            name,
            period: period.max(MIN_PERIOD),
            epoch: 0,
            handle: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Whether a tick stamped with `epoch` came from the current run.
    pub fn is_current(&self, epoch: u64) -> bool {
        self.is_running() && epoch == self.epoch
    }

    /// (Re)start the timer. `make` builds the message for each tick.
    ///
    /// With `immediate` the first tick fires right away, otherwise one
    /// period from now.
    pub fn start<T, F>(&mut self, tx: &UnboundedSender<T>, immediate: bool, make: F)
    where
        T: Send + 'static,
        F: Fn(u64) -> T + Send + 'static,
    {
        self.abort();
        self.epoch = self.epoch.wrapping_add(1);
        let epoch = self.epoch;
        let period = self.period;
        let tx = tx.clone();
        let first = if immediate {
            Instant::now()
        } else {
            Instant::now() + period
        };

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = interval_at(first, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(make(epoch)).is_err() {
                    break;
                }
            }
        }));
        log::debug!("{} timer started (every {:?})", self.name, period);
    }

    pub fn stop(&mut self) {
        if self.abort() {
            self.epoch = self.epoch.wrapping_add(1);
            log::debug!("{} timer stopped", self.name);
        }
    }

    fn abort(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for RepeatingTimer {
    fn drop(&mut self) {
        self.abort();
    }
}
