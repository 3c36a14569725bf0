//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same
//! new state and effect list, with no I/O. Side-effect ordering rules live
//! here: activity is consumed at the gate before any narration, and the log
//! entry is always the last effect of a terminal transition so it reflects
//! the final outcome.

use super::{SessionContext, SessionEffect, SessionEvent, SessionState};
use crate::cooldown::Gate;
use crate::deck::Role;
use crate::messages;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<SessionEffect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: SessionEffect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function.
#[allow(clippy::too_many_lines)]
pub fn transition(
    state: &SessionState,
    ctx: &SessionContext,
    event: SessionEvent,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Cooldown gate
        // ============================================================
        (SessionState::Received, SessionEvent::GateChecked(Gate::Allowed)) => {
            Ok(TransitionResult::new(SessionState::Drawing)
                .with_effect(SessionEffect::DrawSpread))
        }

        (
            SessionState::Received,
            SessionEvent::GateChecked(Gate::Blocked { remaining_minutes }),
        ) => {
            let mut result = TransitionResult::new(SessionState::Denied { remaining_minutes })
                .with_effect(SessionEffect::send_text(messages::cooldown_notice(
                    remaining_minutes,
                )));
            if ctx.log_rejected {
                result = result.with_effect(SessionEffect::log_failure());
            }
            Ok(result)
        }

        // Gate failure happens before activity recording: no log entry.
        (SessionState::Received, SessionEvent::Errored) => {
            Ok(TransitionResult::new(SessionState::Failed { logged: false })
                .with_effect(SessionEffect::send_text(messages::ERROR)))
        }

        // ============================================================
        // Draw and narration
        // ============================================================
        (SessionState::Drawing, SessionEvent::SpreadDrawn(spread)) => {
            let first = spread.cards()[0];
            Ok(TransitionResult::new(SessionState::Narrating { spread, step: 0 })
                .with_effect(SessionEffect::send_text(messages::READING_START))
                .with_effect(SessionEffect::SendCard {
                    card: first,
                    role: Role::Past,
                }))
        }

        (SessionState::Narrating { spread, step: 0 }, SessionEvent::StepDelivered) => {
            let spread = *spread;
            let second = spread.cards()[1];
            Ok(TransitionResult::new(SessionState::Narrating { spread, step: 1 })
                .with_effect(SessionEffect::Pause(ctx.pacing))
                .with_effect(SessionEffect::send_text(messages::SECOND_CARD_INTRO))
                .with_effect(SessionEffect::Pause(ctx.pacing))
                .with_effect(SessionEffect::SendCard {
                    card: second,
                    role: Role::Present,
                }))
        }

        (SessionState::Narrating { spread, step: 1 }, SessionEvent::StepDelivered) => {
            let spread = *spread;
            let third = spread.cards()[2];
            Ok(TransitionResult::new(SessionState::Narrating { spread, step: 2 })
                .with_effect(SessionEffect::Pause(ctx.pacing))
                .with_effect(SessionEffect::send_text(messages::THIRD_CARD_INTRO))
                .with_effect(SessionEffect::Pause(ctx.pacing))
                .with_effect(SessionEffect::SendCard {
                    card: third,
                    role: Role::Future,
                }))
        }

        // ============================================================
        // Interpretation
        // ============================================================
        (SessionState::Narrating { spread, step: 2 }, SessionEvent::StepDelivered) => {
            let spread = *spread;
            // Test mode lets administrators exercise the full reading flow
            // without disturbing the external service.
            if ctx.test_mode && ctx.is_admin {
                return Ok(TransitionResult::new(SessionState::Closed)
                    .with_effect(SessionEffect::send_text(messages::TEST_MODE_NOTICE))
                    .with_effect(SessionEffect::send_text(messages::CLOSING))
                    .with_effect(SessionEffect::log_success(&spread)));
            }
            if !ctx.interpreter_available {
                return Ok(TransitionResult::new(SessionState::Closed)
                    .with_effect(SessionEffect::send_text(messages::ORACLE_MEDITATION))
                    .with_effect(SessionEffect::send_text(messages::CLOSING))
                    .with_effect(SessionEffect::log_success(&spread)));
            }
            Ok(TransitionResult::new(SessionState::Interpreting { spread })
                .with_effect(SessionEffect::send_text(messages::INTERPRETATION_START))
                .with_effect(SessionEffect::Pause(ctx.pacing))
                .with_effect(SessionEffect::RequestInterpretation { spread }))
        }

        (SessionState::Interpreting { spread }, SessionEvent::InterpretationReady(text)) => {
            let body = messages::sanitize_interpretation(&text)
                .unwrap_or_else(|| messages::CARDS_SILENT.to_string());
            Ok(TransitionResult::new(SessionState::Closed)
                .with_effect(SessionEffect::SendText(body))
                .with_effect(SessionEffect::send_text(messages::CLOSING))
                .with_effect(SessionEffect::log_success(spread)))
        }

        // A failed interpretation does not fail the reading: the spread was
        // delivered, so the entry stays success = true.
        (SessionState::Interpreting { spread }, SessionEvent::InterpretationFailed) => {
            Ok(TransitionResult::new(SessionState::Closed)
                .with_effect(SessionEffect::send_text(messages::POWERS_UNAVAILABLE))
                .with_effect(SessionEffect::send_text(messages::CLOSING))
                .with_effect(SessionEffect::log_success(spread)))
        }

        // ============================================================
        // Failure after the gate: activity was recorded, so log it.
        // ============================================================
        (
            SessionState::Drawing
            | SessionState::Narrating { .. }
            | SessionState::Interpreting { .. },
            SessionEvent::Errored,
        ) => Ok(TransitionResult::new(SessionState::Failed { logged: true })
            .with_effect(SessionEffect::send_text(messages::ERROR))
            .with_effect(SessionEffect::log_failure())),

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{state:?} + {event:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::{Card, Spread, CATALOG};

    fn ctx() -> SessionContext {
        SessionContext::new(7, 77, Some("ada".to_string()), "what awaits me?")
    }

    fn spread() -> Spread {
        Spread::from_cards([CATALOG[0], CATALOG[1], CATALOG[16]])
    }

    fn texts(effects: &[SessionEffect]) -> Vec<&str> {
        effects
            .iter()
            .filter_map(|e| match e {
                SessionEffect::SendText(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    fn log_effect(effects: &[SessionEffect]) -> Option<(&[String], bool)> {
        effects.iter().find_map(|e| match e {
            SessionEffect::AppendLog { cards, success } => Some((cards.as_slice(), *success)),
            _ => None,
        })
    }

    #[test]
    fn allowed_gate_moves_to_drawing() {
        let result = transition(
            &SessionState::Received,
            &ctx(),
            SessionEvent::GateChecked(Gate::Allowed),
        )
        .unwrap();
        assert_eq!(result.new_state, SessionState::Drawing);
        assert_eq!(result.effects, vec![SessionEffect::DrawSpread]);
    }

    #[test]
    fn blocked_gate_denies_without_logging() {
        let result = transition(
            &SessionState::Received,
            &ctx(),
            SessionEvent::GateChecked(Gate::Blocked {
                remaining_minutes: 50,
            }),
        )
        .unwrap();
        assert_eq!(
            result.new_state,
            SessionState::Denied {
                remaining_minutes: 50
            }
        );
        assert!(texts(&result.effects)[0].contains("50 minutes"));
        assert!(log_effect(&result.effects).is_none());
    }

    #[test]
    fn blocked_gate_logs_when_policy_enabled() {
        let mut ctx = ctx();
        ctx.log_rejected = true;
        let result = transition(
            &SessionState::Received,
            &ctx,
            SessionEvent::GateChecked(Gate::Blocked {
                remaining_minutes: 5,
            }),
        )
        .unwrap();
        assert_eq!(log_effect(&result.effects), Some((&[][..], false)));
    }

    #[test]
    fn narration_reveals_cards_in_draw_order() {
        let spread = spread();
        let result = transition(
            &SessionState::Drawing,
            &ctx(),
            SessionEvent::SpreadDrawn(spread),
        )
        .unwrap();
        assert_eq!(result.new_state, SessionState::Narrating { spread, step: 0 });
        assert_eq!(
            result.effects[1],
            SessionEffect::SendCard {
                card: CATALOG[0],
                role: Role::Past
            }
        );

        let result = transition(
            &SessionState::Narrating { spread, step: 0 },
            &ctx(),
            SessionEvent::StepDelivered,
        )
        .unwrap();
        assert_eq!(result.new_state, SessionState::Narrating { spread, step: 1 });
        assert!(result
            .effects
            .contains(&SessionEffect::SendCard {
                card: CATALOG[1],
                role: Role::Present
            }));

        let result = transition(
            &SessionState::Narrating { spread, step: 1 },
            &ctx(),
            SessionEvent::StepDelivered,
        )
        .unwrap();
        assert_eq!(result.new_state, SessionState::Narrating { spread, step: 2 });
        assert!(result
            .effects
            .contains(&SessionEffect::SendCard {
                card: CATALOG[16],
                role: Role::Future
            }));
    }

    #[test]
    fn narration_steps_are_paced() {
        let spread = spread();
        let result = transition(
            &SessionState::Narrating { spread, step: 0 },
            &ctx(),
            SessionEvent::StepDelivered,
        )
        .unwrap();
        let pauses = result
            .effects
            .iter()
            .filter(|e| matches!(e, SessionEffect::Pause(_)))
            .count();
        assert_eq!(pauses, 2);
    }

    #[test]
    fn last_step_requests_interpretation() {
        let spread = spread();
        let result = transition(
            &SessionState::Narrating { spread, step: 2 },
            &ctx(),
            SessionEvent::StepDelivered,
        )
        .unwrap();
        assert_eq!(result.new_state, SessionState::Interpreting { spread });
        assert!(result
            .effects
            .contains(&SessionEffect::RequestInterpretation { spread }));
    }

    #[test]
    fn test_mode_skips_interpretation_for_admins_only() {
        let spread = spread();
        let mut ctx = ctx();
        ctx.test_mode = true;
        ctx.is_admin = true;
        let result = transition(
            &SessionState::Narrating { spread, step: 2 },
            &ctx,
            SessionEvent::StepDelivered,
        )
        .unwrap();
        assert_eq!(result.new_state, SessionState::Closed);
        assert!(texts(&result.effects).contains(&messages::TEST_MODE_NOTICE));
        assert_eq!(log_effect(&result.effects).unwrap().1, true);

        // A non-admin still gets the real interpretation in test mode.
        ctx.is_admin = false;
        let result = transition(
            &SessionState::Narrating { spread, step: 2 },
            &ctx,
            SessionEvent::StepDelivered,
        )
        .unwrap();
        assert_eq!(result.new_state, SessionState::Interpreting { spread });
    }

    #[test]
    fn missing_interpreter_degrades_to_meditation() {
        let spread = spread();
        let mut ctx = ctx();
        ctx.interpreter_available = false;
        let result = transition(
            &SessionState::Narrating { spread, step: 2 },
            &ctx,
            SessionEvent::StepDelivered,
        )
        .unwrap();
        assert_eq!(result.new_state, SessionState::Closed);
        assert!(texts(&result.effects).contains(&messages::ORACLE_MEDITATION));
    }

    #[test]
    fn interpretation_closes_with_success_log() {
        let spread = spread();
        let result = transition(
            &SessionState::Interpreting { spread },
            &ctx(),
            SessionEvent::InterpretationReady("The Tower speaks.".to_string()),
        )
        .unwrap();
        assert_eq!(result.new_state, SessionState::Closed);
        let texts = texts(&result.effects);
        assert_eq!(texts[0], "The Tower speaks.");
        assert_eq!(texts[1], messages::CLOSING);
        let (cards, success) = log_effect(&result.effects).unwrap();
        assert!(success);
        assert_eq!(cards, spread.names().as_slice());
        // The log entry is the last effect: after all user-visible output.
        assert!(matches!(
            result.effects.last(),
            Some(SessionEffect::AppendLog { .. })
        ));
    }

    #[test]
    fn empty_interpretation_falls_back_to_silence() {
        let result = transition(
            &SessionState::Interpreting { spread: spread() },
            &ctx(),
            SessionEvent::InterpretationReady("   ".to_string()),
        )
        .unwrap();
        assert_eq!(texts(&result.effects)[0], messages::CARDS_SILENT);
    }

    #[test]
    fn failed_interpretation_still_closes_as_success() {
        let result = transition(
            &SessionState::Interpreting { spread: spread() },
            &ctx(),
            SessionEvent::InterpretationFailed,
        )
        .unwrap();
        assert_eq!(result.new_state, SessionState::Closed);
        assert!(texts(&result.effects).contains(&messages::POWERS_UNAVAILABLE));
        assert_eq!(log_effect(&result.effects).unwrap().1, true);
    }

    #[test]
    fn gate_error_fails_without_log() {
        let result = transition(&SessionState::Received, &ctx(), SessionEvent::Errored).unwrap();
        assert_eq!(result.new_state, SessionState::Failed { logged: false });
        assert!(log_effect(&result.effects).is_none());
    }

    #[test]
    fn post_gate_error_fails_with_empty_card_log() {
        for state in [
            SessionState::Drawing,
            SessionState::Narrating {
                spread: spread(),
                step: 1,
            },
            SessionState::Interpreting { spread: spread() },
        ] {
            let result = transition(&state, &ctx(), SessionEvent::Errored).unwrap();
            assert_eq!(result.new_state, SessionState::Failed { logged: true });
            assert_eq!(log_effect(&result.effects), Some((&[][..], false)));
        }
    }

    #[test]
    fn terminal_states_reject_further_events() {
        let err = transition(&SessionState::Closed, &ctx(), SessionEvent::StepDelivered);
        assert!(err.is_err());
    }

    #[test]
    fn deck_cards_are_plain_copies() {
        // Spread is Copy so transitions can move it freely between states.
        fn assert_copy<T: Copy>() {}
        assert_copy::<Spread>();
        assert_copy::<Card>();
    }
}
