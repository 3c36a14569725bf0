//! Arcana - a tarot reading bot
//!
//! A session orchestrator that draws a three-card spread, narrates it with
//! a reveal rhythm, asks an external service for an interpretation, and
//! rate-limits users through a persistent cooldown store.

mod bot;
mod config;
mod cooldown;
mod db;
mod deck;
mod interpreter;
mod messages;
mod runtime;
mod session;
mod stats;
mod telegram;

use bot::Bot;
use config::Config;
use db::Database;
use deck::CardsDir;
use interpreter::{Interpreter, YandexGptClient};
use runtime::Orchestrator;
use std::sync::Arc;
use telegram::TelegramClient;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "arcana=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration; missing credentials and a short catalog are fatal.
    let config = Config::from_env()?;
    deck::ensure_catalog()?;

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    let interpreter: Option<Arc<dyn Interpreter>> = match config.interpreter_credentials() {
        Some((folder_id, api_key)) => {
            tracing::info!("interpretation service configured");
            Some(Arc::new(YandexGptClient::new(folder_id, api_key.to_string())))
        }
        None => {
            tracing::warn!(
                "No interpretation credentials. Set YANDEX_FOLDER_ID and YANDEX_AUTH_TOKEN; \
                 readings will close with the meditation notice."
            );
            None
        }
    };

    let telegram = Arc::new(TelegramClient::new(&config.telegram_token));
    let orchestrator = Arc::new(
        Orchestrator::new(
            db.clone(),
            Arc::clone(&telegram) as Arc<dyn runtime::Transport>,
            interpreter,
            Arc::new(CardsDir::new(&config.cards_dir)),
            config.admin_ids.clone(),
        )
        .with_log_rejected(config.log_rejected),
    );

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested");
                shutdown.cancel();
            }
        });
    }

    let sweep = config
        .retention_days
        .map(|days| bot::spawn_retention_sweep(db.clone(), days, shutdown.clone()));

    tracing::info!(
        admins = config.admin_ids.len(),
        cards = deck::CATALOG.len(),
        "Arcana bot starting"
    );
    Arc::new(Bot::new(orchestrator, telegram, shutdown)).run().await;

    if let Some(sweep) = sweep {
        sweep.abort();
    }

    Ok(())
}
