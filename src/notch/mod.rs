//! Notch state: priority resolution, transition coordination, history.

pub mod coordinator;
pub mod history;
pub mod state;

pub use coordinator::{CoordinatorEffect, NotchCoordinator, PendingSequence};
pub use history::{NotchTransition, TransitionCause, TransitionHistory};
pub use state::{resolve, NotchState, TransitionInputs};
