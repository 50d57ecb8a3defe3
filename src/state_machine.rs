//! Reactor decision core
//!
//! Implements the Elm Architecture pattern: a pure transition from
//! (snapshot, event) to a list of effects. The runtime executes the effects.

mod effect;
pub mod event;
pub mod snapshot;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use snapshot::Snapshot;
pub use transition::{transition, TransitionResult};
