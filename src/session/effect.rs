//! Effects produced by session transitions

use crate::deck::{Card, Role, Spread};
use std::time::Duration;

/// Effects to be executed after a state transition, strictly in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEffect {
    /// Send plain text to the session's chat.
    SendText(String),

    /// Send a card image with its role-labeled caption, falling back to
    /// text when the asset is missing.
    SendCard { card: Card, role: Role },

    /// Suspend for the reveal rhythm. Never blocks other sessions.
    Pause(Duration),

    /// Draw three cards from the catalog.
    DrawSpread,

    /// Call the interpretation service with the spread in role order.
    RequestInterpretation { spread: Spread },

    /// Append an interaction log entry; failures are swallowed.
    AppendLog { cards: Vec<String>, success: bool },
}

impl SessionEffect {
    pub fn send_text(text: impl Into<String>) -> Self {
        SessionEffect::SendText(text.into())
    }

    pub fn log_success(spread: &Spread) -> Self {
        SessionEffect::AppendLog {
            cards: spread.names(),
            success: true,
        }
    }

    pub fn log_failure() -> Self {
        SessionEffect::AppendLog {
            cards: Vec::new(),
            success: false,
        }
    }
}
