//! Session runtime executor
//!
//! Drives one reading session: feeds events through the pure transition
//! function and executes the resulting effects. Transport failures are
//! swallowed here so a dropped connection can never abort a session, and
//! the final log write is attempted even when every send failed.

use super::traits::{AssetResolver, Transport};
use crate::db::{Database, LogEntry};
use crate::deck::Spread;
use crate::interpreter::Interpreter;
use crate::session::{transition, SessionContext, SessionEffect, SessionEvent, SessionState};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Full reading delivered.
    Closed,
    /// Rejected at the cooldown gate.
    Denied { remaining_minutes: i64 },
    /// Terminated by an unexpected error.
    Failed,
}

/// Runtime for one reading session.
pub struct SessionRuntime<T: Transport, A: AssetResolver> {
    ctx: SessionContext,
    db: Database,
    transport: T,
    interpreter: Option<Arc<dyn Interpreter>>,
    assets: A,
}

impl<T: Transport, A: AssetResolver> SessionRuntime<T, A> {
    pub fn new(
        ctx: SessionContext,
        db: Database,
        transport: T,
        interpreter: Option<Arc<dyn Interpreter>>,
        assets: A,
    ) -> Self {
        Self {
            ctx,
            db,
            transport,
            interpreter,
            assets,
        }
    }

    /// Run the session to a terminal state.
    pub async fn run(self, now: DateTime<Utc>) -> SessionOutcome {
        let mut state = SessionState::Received;

        // The gate is one atomic store operation: cooldown check plus
        // activity recording, before any user-visible output.
        let mut event = match self.db.begin_session(self.ctx.user_id, now) {
            Ok(gate) => SessionEvent::GateChecked(gate),
            Err(e) => {
                tracing::error!(user_id = self.ctx.user_id, error = %e, "cooldown gate unavailable");
                SessionEvent::Errored
            }
        };

        loop {
            let result = match transition(&state, &self.ctx, event) {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(user_id = self.ctx.user_id, error = %e, "session aborted");
                    return SessionOutcome::Failed;
                }
            };
            state = result.new_state;

            let next = self.execute(result.effects).await;
            if state.is_terminal() {
                break;
            }
            event = next.unwrap_or(SessionEvent::StepDelivered);
        }

        tracing::info!(
            user_id = self.ctx.user_id,
            outcome = ?state,
            "session finished"
        );
        match state {
            SessionState::Denied { remaining_minutes } => {
                SessionOutcome::Denied { remaining_minutes }
            }
            SessionState::Failed { .. } => SessionOutcome::Failed,
            _ => SessionOutcome::Closed,
        }
    }

    /// Execute effects in order; a decisive effect (draw, interpretation)
    /// produces the event that advances the machine.
    async fn execute(&self, effects: Vec<SessionEffect>) -> Option<SessionEvent> {
        let mut next = None;
        for effect in effects {
            match effect {
                SessionEffect::SendText(text) => self.send_text(&text).await,

                SessionEffect::SendCard { card, role } => {
                    let caption = role.caption(&card);
                    match self.assets.resolve(&card) {
                        Some(path) => {
                            if let Err(e) = self
                                .transport
                                .send_image(self.ctx.chat_id, &path, &caption)
                                .await
                            {
                                tracing::warn!(
                                    chat_id = self.ctx.chat_id,
                                    card = card.name,
                                    error = %e,
                                    "card image send failed"
                                );
                            }
                        }
                        None => {
                            tracing::warn!(card = card.name, "card image missing");
                            self.send_text(&format!("{caption}\n(image unavailable)"))
                                .await;
                        }
                    }
                }

                SessionEffect::Pause(duration) => tokio::time::sleep(duration).await,

                SessionEffect::DrawSpread => match Spread::draw() {
                    Ok(spread) => next = Some(SessionEvent::SpreadDrawn(spread)),
                    Err(e) => {
                        tracing::error!(error = %e, "spread draw failed");
                        next = Some(SessionEvent::Errored);
                    }
                },

                SessionEffect::RequestInterpretation { spread } => {
                    next = Some(self.interpret(&spread).await);
                }

                SessionEffect::AppendLog { cards, success } => {
                    let entry = LogEntry {
                        user_id: self.ctx.user_id,
                        username: self.ctx.username.clone(),
                        question: self.ctx.question.clone(),
                        cards,
                        at: Utc::now(),
                        success,
                    };
                    if let Err(e) = self.db.append_log(&entry) {
                        tracing::error!(user_id = self.ctx.user_id, error = %e, "log append failed");
                    }
                }
            }
        }
        next
    }

    async fn send_text(&self, text: &str) {
        if let Err(e) = self.transport.send_text(self.ctx.chat_id, text).await {
            tracing::warn!(chat_id = self.ctx.chat_id, error = %e, "text send failed");
        }
    }

    async fn interpret(&self, spread: &Spread) -> SessionEvent {
        match &self.interpreter {
            Some(interpreter) => {
                match interpreter.interpret(spread, &self.ctx.question).await {
                    Ok(text) => SessionEvent::InterpretationReady(text),
                    Err(e) => {
                        tracing::warn!(
                            user_id = self.ctx.user_id,
                            kind = ?e.kind,
                            error = %e,
                            "interpretation failed"
                        );
                        SessionEvent::InterpretationFailed
                    }
                }
            }
            None => SessionEvent::InterpretationFailed,
        }
    }
}
