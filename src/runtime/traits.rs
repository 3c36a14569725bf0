//! Trait abstractions for session I/O
//!
//! These traits enable testing the session runtime with mock
//! implementations; production adapters live with their clients.

use crate::deck::{Card, CardsDir, Spread};
use crate::interpreter::{Interpreter, InterpreterError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Opaque message sink with at-least-once delivery. Failures are reported
/// to the caller, which swallows them on the narration path.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), String>;

    async fn send_image(
        &self,
        chat_id: i64,
        image: &Path,
        caption: &str,
    ) -> Result<(), String>;
}

/// Maps a card to its image resource, if present.
pub trait AssetResolver: Send + Sync {
    fn resolve(&self, card: &Card) -> Option<PathBuf>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), String> {
        (**self).send_text(chat_id, text).await
    }

    async fn send_image(
        &self,
        chat_id: i64,
        image: &Path,
        caption: &str,
    ) -> Result<(), String> {
        (**self).send_image(chat_id, image, caption).await
    }
}

impl<T: AssetResolver + ?Sized> AssetResolver for Arc<T> {
    fn resolve(&self, card: &Card) -> Option<PathBuf> {
        (**self).resolve(card)
    }
}

#[async_trait]
impl<T: Interpreter + ?Sized> Interpreter for Arc<T> {
    async fn interpret(&self, spread: &Spread, question: &str) -> Result<String, InterpreterError> {
        (**self).interpret(spread, question).await
    }
}

// ============================================================================
// Production adapters
// ============================================================================

impl AssetResolver for CardsDir {
    fn resolve(&self, card: &Card) -> Option<PathBuf> {
        CardsDir::resolve(self, card)
    }
}
