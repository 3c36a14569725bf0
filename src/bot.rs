//! Update loop and command routing
//!
//! Long-polls the Bot API and dispatches each inbound message on its own
//! task, so one user's paced reading never delays another's. Administrative
//! commands reply immediately from the current task.

use crate::db::Database;
use crate::messages;
use crate::runtime::{CommandError, Orchestrator};
use crate::stats;
use crate::telegram::{IncomingMessage, TelegramClient};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Back-off after a failed poll before trying again.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Interval between retention sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Default stats window when none is given.
const DEFAULT_STATS_DAYS: i64 = 7;

/// Parsed inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Start,
    Id,
    Stats { days: i64 },
    SetCooldown { minutes: Option<i64> },
    ToggleTestMode,
    Question(String),
}

fn parse_command(text: &str) -> Command {
    let trimmed = text.trim();
    if !trimmed.starts_with('/') {
        return Command::Question(trimmed.to_string());
    }

    let mut parts = trimmed.split_whitespace();
    let head = parts.next().unwrap_or_default();
    match head {
        "/start" => Command::Start,
        "/id" => Command::Id,
        "/stats" => Command::Stats {
            days: parts
                .next()
                .and_then(|d| d.parse().ok())
                .filter(|d| *d >= 1)
                .unwrap_or(DEFAULT_STATS_DAYS),
        },
        "/cooldown" => Command::SetCooldown {
            minutes: parts.next().and_then(|m| m.parse().ok()),
        },
        "/testmode" => Command::ToggleTestMode,
        // Unknown commands read as questions, as the reference bot treated
        // any non-command text.
        _ => Command::Question(trimmed.to_string()),
    }
}

/// The bot process: poll, route, answer.
pub struct Bot {
    orchestrator: Arc<Orchestrator>,
    telegram: Arc<TelegramClient>,
    shutdown: CancellationToken,
}

impl Bot {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        telegram: Arc<TelegramClient>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            orchestrator,
            telegram,
            shutdown,
        }
    }

    /// Poll for updates until shutdown.
    pub async fn run(self: Arc<Self>) {
        tracing::info!("bot polling started");
        let mut offset = 0i64;
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                updates = self.telegram.get_updates(offset) => match updates {
                    Ok(updates) => {
                        for update in updates {
                            offset = offset.max(update.update_id + 1);
                            let Some(message) = update.message else {
                                continue;
                            };
                            let Some(text) = message.text.clone() else {
                                continue;
                            };
                            // Each message gets its own task so a paced
                            // reading never delays other users.
                            let bot = Arc::clone(&self);
                            tokio::spawn(async move {
                                bot.handle(&message, &text).await;
                            });
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "update poll failed");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                    }
                }
            }
        }
        tracing::info!("bot polling stopped");
    }

    async fn handle(&self, message: &IncomingMessage, text: &str) {
        let Some(from) = &message.from else {
            return;
        };
        let chat_id = message.chat.id;
        let user_id = from.id;

        match parse_command(text) {
            Command::Start => self.reply(chat_id, messages::WELCOME).await,

            Command::Id => {
                let mut reply = format!(
                    "\u{1f194} Your information:\n\
                     \u{2022} ID: {user_id}\n\
                     \u{2022} Username: {}\n\
                     \u{2022} Name: {}",
                    from.username.as_deref().unwrap_or("not set"),
                    from.first_name.as_deref().unwrap_or("not set"),
                );
                if self.orchestrator.is_admin(user_id) {
                    reply.push_str("\n\u{1f451} You are a keeper of this bot");
                }
                self.reply(chat_id, &reply).await;
            }

            Command::Stats { days } => {
                match self.orchestrator.handle_stats_request(user_id, days) {
                    Ok(aggregate) => {
                        self.reply(chat_id, &stats::format_summary(&aggregate)).await;
                    }
                    Err(e) => self.reply_command_error(chat_id, &e).await,
                }
            }

            Command::SetCooldown { minutes: None } => {
                self.reply(chat_id, "Usage: /cooldown <minutes>").await;
            }

            Command::SetCooldown {
                minutes: Some(minutes),
            } => match self.orchestrator.handle_set_cooldown(user_id, minutes) {
                Ok(()) => {
                    self.reply(chat_id, &format!("Cooldown set to {minutes} minutes."))
                        .await;
                }
                Err(e) => self.reply_command_error(chat_id, &e).await,
            },

            Command::ToggleTestMode => {
                match self.orchestrator.handle_toggle_test_mode(user_id) {
                    Ok(enabled) => {
                        let state = if enabled { "on" } else { "off" };
                        self.reply(chat_id, &format!("Test mode is now {state}.")).await;
                    }
                    Err(e) => self.reply_command_error(chat_id, &e).await,
                }
            }

            Command::Question(question) => {
                tracing::info!(user_id, chat_id, "reading requested");
                self.orchestrator
                    .handle_reading_request(
                        user_id,
                        from.username.clone(),
                        chat_id,
                        &question,
                        Utc::now(),
                    )
                    .await;
            }
        }
    }

    async fn reply(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.telegram.send_message(chat_id, text).await {
            tracing::warn!(chat_id, error = %e, "reply failed");
        }
    }

    async fn reply_command_error(&self, chat_id: i64, error: &CommandError) {
        let text = match error {
            CommandError::AccessDenied => messages::ACCESS_DENIED.to_string(),
            CommandError::InvalidArgument(reason) => format!("\u{26a0} {reason}"),
            CommandError::Storage(_) => {
                "\u{274c} Failed to update the setting, try again later.".to_string()
            }
        };
        self.reply(chat_id, &text).await;
    }
}

/// Periodically purge cooldown records and log entries past the retention
/// window.
pub fn spawn_retention_sweep(
    db: Database,
    retention_days: i64,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let age = chrono::Duration::days(retention_days);
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = db.purge_older_than(age) {
                        tracing::warn!(error = %e, "retention sweep failed");
                    }
                }
            }
        }
    })
}
