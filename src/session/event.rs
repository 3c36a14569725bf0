//! Events that advance a reading session

use crate::cooldown::Gate;
use crate::deck::Spread;

/// Events fed into the transition function by the runtime.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Outcome of the atomic cooldown-check-and-record gate.
    GateChecked(Gate),

    /// Three cards drawn, in order.
    SpreadDrawn(Spread),

    /// All effects of the current narration step were executed.
    StepDelivered,

    /// The interpretation call returned text (possibly empty).
    InterpretationReady(String),

    /// The interpretation call failed; the session still completes.
    InterpretationFailed,

    /// Unexpected error in the current stage.
    Errored,
}
