//! Reading session state machine
//!
//! One session handles one inbound question end to end. The machine is
//! modeled as a tagged-state enum with a pure transition function returning
//! effects; the runtime executes the effects and feeds the resulting events
//! back in, which keeps the log/no-log branches auditable in isolation.

mod effect;
mod event;
mod state;
mod transition;

pub use effect::SessionEffect;
pub use event::SessionEvent;
pub use state::{SessionContext, SessionState, DEFAULT_PACING};
pub use transition::{transition, TransitionError, TransitionResult};
