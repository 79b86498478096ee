//! Notch Island core library.
//!
//! Keeps two pieces of state consistent for a persistent notch UI:
//!
//! - what media is playing, reconciled from a slow polled provider with
//!   optimistic user intent layered on top ([`playback`]);
//! - which of the mutually exclusive notch presentations is showing,
//!   arbitrated from hover, media and calendar signals ([`notch`]).
//!
//! Both cores are plain state machines. [`runtime`] drives them from a
//! single tokio task and exposes a cloneable handle plus `watch` outputs.

pub mod calendar;
pub mod config;
pub mod debounce;
pub mod errors;
pub mod intent;
pub mod notch;
pub mod observable;
pub mod playback;
pub mod runtime;
pub mod timer;

pub use config::TimingConfig;
pub use errors::{ConfigError, DegradationKind, ProviderError, RuntimeError};
pub use notch::{NotchState, NotchTransition};
pub use playback::{MediaProvider, PlaybackSnapshot};
pub use runtime::{spawn, NotchHandle, NotchOutputs};

/// Install the global `env_logger`, defaulting to `info`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
