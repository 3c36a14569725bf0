//! Mock implementations for testing
//!
//! These mocks enable session testing without real I/O.

use super::traits::{AssetResolver, Transport};
use crate::deck::{Card, Spread};
use crate::interpreter::{Interpreter, InterpreterError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

// ============================================================================
// Mock Transport
// ============================================================================

/// One delivered message, as recorded by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text {
        chat_id: i64,
        text: String,
    },
    Image {
        chat_id: i64,
        path: PathBuf,
        caption: String,
    },
}

/// Transport that records every send, optionally failing them all.
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<Sent>>,
    fail: bool,
}

impl MockTransport {
    /// A transport whose every send fails, as after a dropped connection.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Only the text payloads, in send order.
    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } => Some(text),
                Sent::Image { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), String> {
        if self.fail {
            return Err("connection closed".to_string());
        }
        self.sent.lock().unwrap().push(Sent::Text {
            chat_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_image(
        &self,
        chat_id: i64,
        image: &Path,
        caption: &str,
    ) -> Result<(), String> {
        if self.fail {
            return Err("connection closed".to_string());
        }
        self.sent.lock().unwrap().push(Sent::Image {
            chat_id,
            path: image.to_path_buf(),
            caption: caption.to_string(),
        });
        Ok(())
    }
}

// ============================================================================
// Mock Interpreter
// ============================================================================

/// Interpreter returning a fixed result and counting calls.
pub struct MockInterpreter {
    result: Result<String, ()>,
    calls: AtomicUsize,
}

impl MockInterpreter {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            result: Ok(text.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: Err(()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Interpreter for MockInterpreter {
    async fn interpret(&self, _spread: &Spread, _question: &str) -> Result<String, InterpreterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Ok(text) => Ok(text.clone()),
            Err(()) => Err(InterpreterError::server_error("mock interpreter down")),
        }
    }
}

// ============================================================================
// Mock Assets
// ============================================================================

/// Asset resolver that pretends every image exists (or none at all).
#[derive(Default)]
pub struct MockAssets {
    missing: bool,
}

impl MockAssets {
    /// A resolver with no images, forcing the text fallback.
    pub fn missing() -> Self {
        Self { missing: true }
    }
}

impl AssetResolver for MockAssets {
    fn resolve(&self, card: &Card) -> Option<PathBuf> {
        (!self.missing).then(|| PathBuf::from(format!("/cards/{}", card.image)))
    }
}
