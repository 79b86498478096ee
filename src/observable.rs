//! Observable properties with change-only delivery.
//!
//! Outputs consumed by the rendering layer are published through
//! [`Observable`]. Writing a value equal to the current one is a no-op:
//! subscribers are not woken and `set` reports `false`.

use tokio::sync::watch;

/// A single published value backed by a `watch` channel.
#[derive(Debug)]
pub struct Observable<T> {
    sender: watch::Sender<T>,
}

impl<T: Clone + PartialEq> Observable<T> {
    pub fn new(initial: T) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.sender.borrow().clone()
    }

    /// Store `value`, notifying subscribers only if it differs.
    ///
    /// Returns whether the stored value changed.
    pub fn set(&self, value: T) -> bool {
        self.sender.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }

    /// Subscribe to future changes.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.sender.subscribe()
    }
}

impl<T: Clone + PartialEq + Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
