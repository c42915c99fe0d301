//! Core conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.
//! The graph's edges live in [`transition`]; the runtime executes the
//! effects it returns.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{ConvContext, ConvState, ErrorKind};
pub use transition::{transition, TransitionError, TransitionResult};
