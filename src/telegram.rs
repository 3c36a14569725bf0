//! Telegram Bot API client
//!
//! Thin adapter over the HTTP API: long-poll updates in, text and photo
//! messages out. The session core only sees this through the [`Transport`]
//! trait; delivery is at-least-once and failures are the caller's to
//! swallow or surface.

use crate::runtime::Transport;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Long-poll wait passed to getUpdates.
pub const POLL_TIMEOUT_SECS: u64 = 30;

// Client timeout must outlast the long poll.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
}

/// Bot API client bound to one bot token.
pub struct TelegramClient {
    client: Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(token: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: format!("https://api.telegram.org/bot{token}"),
        }
    }

    /// Fetch updates after `offset`, long-polling up to
    /// [`POLL_TIMEOUT_SECS`].
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TelegramError> {
        let response: ApiResponse<Vec<Update>> = self
            .client
            .post(format!("{}/getUpdates", self.base_url))
            .json(&GetUpdatesRequest {
                offset,
                timeout: POLL_TIMEOUT_SECS,
            })
            .send()
            .await?
            .json()
            .await?;
        response.into_result()
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        let response: ApiResponse<serde_json::Value> = self
            .client
            .post(format!("{}/sendMessage", self.base_url))
            .json(&SendMessageRequest { chat_id, text })
            .send()
            .await?
            .json()
            .await?;
        response.into_result().map(|_| ())
    }

    pub async fn send_photo(
        &self,
        chat_id: i64,
        image: &Path,
        caption: &str,
    ) -> Result<(), TelegramError> {
        let bytes = tokio::fs::read(image).await?;
        let file_name = image
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("card.jpg")
            .to_string();
        let photo = Part::bytes(bytes).file_name(file_name);

        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("photo", photo);

        let response: ApiResponse<serde_json::Value> = self
            .client
            .post(format!("{}/sendPhoto", self.base_url))
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;
        response.into_result().map(|_| ())
    }
}

#[async_trait]
impl Transport for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), String> {
        self.send_message(chat_id, text).await.map_err(|e| e.to_string())
    }

    async fn send_image(
        &self,
        chat_id: i64,
        image: &Path,
        caption: &str,
    ) -> Result<(), String> {
        self.send_photo(chat_id, image, caption)
            .await
            .map_err(|e| e.to_string())
    }
}

// Bot API wire types

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    offset: i64,
    timeout: u64,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T, TelegramError> {
        if self.ok {
            self.result
                .ok_or_else(|| TelegramError::Api("missing result".to_string()))
        } else {
            Err(TelegramError::Api(
                self.description
                    .unwrap_or_else(|| "unknown API error".to_string()),
            ))
        }
    }
}

/// One inbound update.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

/// An inbound chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    #[allow(dead_code)] // Wire completeness
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_deserializes_from_api_shape() {
        let body = r#"{
            "ok": true,
            "result": [{
                "update_id": 42,
                "message": {
                    "message_id": 7,
                    "from": {"id": 1, "is_bot": false, "first_name": "Ada", "username": "ada"},
                    "chat": {"id": 77, "type": "private"},
                    "date": 1700000000,
                    "text": "what awaits me?"
                }
            }]
        }"#;
        let parsed: ApiResponse<Vec<Update>> = serde_json::from_str(body).unwrap();
        let updates = parsed.into_result().unwrap();
        assert_eq!(updates[0].update_id, 42);
        let msg = updates[0].message.as_ref().unwrap();
        assert_eq!(msg.chat.id, 77);
        assert_eq!(msg.from.as_ref().unwrap().username.as_deref(), Some("ada"));
        assert_eq!(msg.text.as_deref(), Some("what awaits me?"));
    }

    #[test]
    fn api_errors_carry_description() {
        let body = r#"{"ok": false, "description": "Unauthorized"}"#;
        let parsed: ApiResponse<Vec<Update>> = serde_json::from_str(body).unwrap();
        let err = parsed.into_result().unwrap_err();
        assert!(matches!(err, TelegramError::Api(d) if d == "Unauthorized"));
    }

    #[test]
    fn updates_without_message_are_tolerated() {
        let body = r#"{"ok": true, "result": [{"update_id": 1}]}"#;
        let parsed: ApiResponse<Vec<Update>> = serde_json::from_str(body).unwrap();
        let updates = parsed.into_result().unwrap();
        assert!(updates[0].message.is_none());
    }
}
