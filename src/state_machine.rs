//! Core intake form state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! `transition` never performs I/O, it returns the next session value and the
//! effects the runtime must execute.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::{Effect, Keyboard, OutboundMessage};
pub use event::Event;
pub use state::{ChatIdentity, FileReference, FormContext, FormStep, Session, Submission};
pub use transition::{transition, SessionUpdate};
