//! Session states and per-session context

use crate::deck::Spread;
use std::time::Duration;

/// Default pause between narration reveals.
pub const DEFAULT_PACING: Duration = Duration::from_secs(3);

/// Immutable context for one reading session.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: i64,
    pub chat_id: i64,
    pub username: Option<String>,
    pub question: String,
    /// Requester is on the admin allow-list.
    pub is_admin: bool,
    /// Global test-mode flag, read once at session start.
    pub test_mode: bool,
    /// An interpretation service is configured.
    pub interpreter_available: bool,
    /// Policy: append a failure entry for cooldown-rejected requests.
    pub log_rejected: bool,
    /// Pause between narration reveals.
    pub pacing: Duration,
}

impl SessionContext {
    pub fn new(
        user_id: i64,
        chat_id: i64,
        username: Option<String>,
        question: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            chat_id,
            username,
            question: question.into(),
            is_admin: false,
            test_mode: false,
            interpreter_available: true,
            log_rejected: false,
            pacing: DEFAULT_PACING,
        }
    }
}

/// Session state, linear with early-exit branches.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Question received, cooldown gate not yet consulted.
    Received,

    /// Gate passed and activity recorded; waiting for the draw.
    Drawing,

    /// Revealing cards; `step` is the narration step currently delivered.
    Narrating { spread: Spread, step: usize },

    /// Interpretation request in flight.
    Interpreting { spread: Spread },

    /// Reading delivered and logged (terminal).
    Closed,

    /// Rejected at the cooldown gate (terminal, not a failure).
    Denied { remaining_minutes: i64 },

    /// Unexpected error (terminal). `logged` records whether a failure
    /// entry was appended, which only happens after activity recording.
    Failed { logged: bool },
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Closed | SessionState::Denied { .. } | SessionState::Failed { .. }
        )
    }
}
