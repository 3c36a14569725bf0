//! Runtime for executing reading sessions
//!
//! The orchestrator owns the shared dependencies (store, transport,
//! interpreter, assets) constructed once at process start, and exposes the
//! entry points the command layer calls. Each reading runs in its own
//! [`SessionRuntime`], so sessions never share a delay timer.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{SessionOutcome, SessionRuntime};
pub use traits::*;

use crate::db::{Database, DbError, StatsAggregate};
use crate::interpreter::Interpreter;
use crate::session::SessionContext;
use crate::stats;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced to the command layer for administrative operations.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("administrator access required")]
    AccessDenied,
    #[error("{0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Storage(#[from] DbError),
}

/// Coordinates readings and administrative commands over shared
/// dependencies.
pub struct Orchestrator {
    db: Database,
    transport: Arc<dyn Transport>,
    interpreter: Option<Arc<dyn Interpreter>>,
    assets: Arc<dyn AssetResolver>,
    admins: HashSet<i64>,
    pacing: Duration,
    log_rejected: bool,
}

impl Orchestrator {
    pub fn new(
        db: Database,
        transport: Arc<dyn Transport>,
        interpreter: Option<Arc<dyn Interpreter>>,
        assets: Arc<dyn AssetResolver>,
        admins: HashSet<i64>,
    ) -> Self {
        Self {
            db,
            transport,
            interpreter,
            assets,
            admins,
            pacing: crate::session::DEFAULT_PACING,
            log_rejected: false,
        }
    }

    /// Override the reveal pacing (tests, tuning).
    #[allow(dead_code)] // Useful for tests
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Enable logging of cooldown-rejected requests.
    pub fn with_log_rejected(mut self, log_rejected: bool) -> Self {
        self.log_rejected = log_rejected;
        self
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admins.contains(&user_id)
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Drive one reading end to end for one inbound question.
    pub async fn handle_reading_request(
        &self,
        user_id: i64,
        username: Option<String>,
        chat_id: i64,
        question: &str,
        now: DateTime<Utc>,
    ) -> SessionOutcome {
        let mut ctx = SessionContext::new(user_id, chat_id, username, question);
        ctx.is_admin = self.is_admin(user_id);
        ctx.test_mode = self.db.test_mode();
        ctx.interpreter_available = self.interpreter.is_some();
        ctx.log_rejected = self.log_rejected;
        ctx.pacing = self.pacing;

        SessionRuntime::new(
            ctx,
            self.db.clone(),
            Arc::clone(&self.transport),
            self.interpreter.clone(),
            Arc::clone(&self.assets),
        )
        .run(now)
        .await
    }

    /// Usage summary for operators. Never fails once access is granted;
    /// an unreadable store reads as a quiet period.
    pub fn handle_stats_request(
        &self,
        requesting_user_id: i64,
        window_days: i64,
    ) -> Result<StatsAggregate, CommandError> {
        if !self.is_admin(requesting_user_id) {
            return Err(CommandError::AccessDenied);
        }
        Ok(stats::summarize(&self.db, window_days))
    }

    /// Set the cooldown duration; minutes must be at least 1.
    pub fn handle_set_cooldown(
        &self,
        requesting_user_id: i64,
        minutes: i64,
    ) -> Result<(), CommandError> {
        if !self.is_admin(requesting_user_id) {
            return Err(CommandError::AccessDenied);
        }
        if minutes < 1 {
            return Err(CommandError::InvalidArgument(
                "cooldown must be at least 1 minute".to_string(),
            ));
        }
        self.db.set_cooldown_minutes(minutes, requesting_user_id)?;
        Ok(())
    }

    /// Flip the global test-mode flag; returns the new state.
    pub fn handle_toggle_test_mode(
        &self,
        requesting_user_id: i64,
    ) -> Result<bool, CommandError> {
        if !self.is_admin(requesting_user_id) {
            return Err(CommandError::AccessDenied);
        }
        Ok(self.db.toggle_test_mode(requesting_user_id)?)
    }
}
