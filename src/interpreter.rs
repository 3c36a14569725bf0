//! Interpretation service client
//!
//! The orchestrator treats interpretation as an opaque call: three cards in
//! role order plus the question go in, narrative text comes out. One call
//! per session, no retry at this layer; failures degrade to an in-character
//! notice upstream.

use crate::deck::Spread;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Interpretation error with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct InterpreterError {
    pub kind: InterpreterErrorKind,
    pub message: String,
}

impl InterpreterError {
    pub fn new(kind: InterpreterErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(InterpreterErrorKind::Network, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(InterpreterErrorKind::Auth, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(InterpreterErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(InterpreterErrorKind::ServerError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(InterpreterErrorKind::InvalidRequest, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(InterpreterErrorKind::Unknown, message)
    }
}

/// Error classification, mirrored from HTTP status classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterErrorKind {
    Network,
    RateLimit,
    ServerError,
    Auth,
    InvalidRequest,
    Unknown,
}

/// Opaque interpretation function: `(cards, question) -> text | failure`.
#[async_trait]
pub trait Interpreter: Send + Sync {
    async fn interpret(&self, spread: &Spread, question: &str)
        -> Result<String, InterpreterError>;
}

const COMPLETION_URL: &str = "https://llm.api.cloud.yandex.net/foundationModels/v1/completion";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 2000;

const PERSONA_PROMPT: &str = "You are an experienced tarot reader with a deep understanding \
of the symbolism of the cards. Give a rich, detailed and mystical interpretation of the spread.\n\
For each card, describe its symbolism, its meaning in its position (past, present or future), \
and its influence on the situation as a whole. Then trace how the energies of the past shape \
the present and how the present forms the future, and close with an overall reading and advice.\n\
Use mystical metaphors, keep a mysterious and wise but conversational tone, and never step out \
of the tarot reader role or mention being an AI model.";

/// YandexGPT-backed interpreter
pub struct YandexGptClient {
    client: Client,
    api_key: String,
    model_uri: String,
}

impl YandexGptClient {
    pub fn new(folder_id: &str, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            model_uri: format!("gpt://{folder_id}/yandexgpt"),
        }
    }

    fn build_request(&self, spread: &Spread, question: &str) -> CompletionRequest {
        let cards = spread.cards();
        let prompt = format!(
            "The cards fell as follows:\n\
             \u{1f570} Past: {}\n\
             \u{26a1} Present: {}\n\
             \u{1f52e} Future: {}\n\n\
             The question asked: {question}",
            cards[0].name, cards[1].name, cards[2].name,
        );

        CompletionRequest {
            model_uri: self.model_uri.clone(),
            completion_options: CompletionOptions {
                temperature: TEMPERATURE,
                max_tokens: MAX_TOKENS.to_string(),
            },
            messages: vec![
                CompletionMessage {
                    role: "system".to_string(),
                    text: PERSONA_PROMPT.to_string(),
                },
                CompletionMessage {
                    role: "user".to_string(),
                    text: prompt,
                },
            ],
        }
    }

    fn classify_error(status: reqwest::StatusCode, body: &str) -> InterpreterError {
        match status.as_u16() {
            401 | 403 => InterpreterError::auth(format!("authentication failed: {body}")),
            429 => InterpreterError::rate_limit(format!("rate limited: {body}")),
            400 => InterpreterError::invalid_request(format!("invalid request: {body}")),
            500..=599 => InterpreterError::server_error(format!("server error: {body}")),
            _ => InterpreterError::unknown(format!("HTTP {status}: {body}")),
        }
    }
}

#[async_trait]
impl Interpreter for YandexGptClient {
    async fn interpret(
        &self,
        spread: &Spread,
        question: &str,
    ) -> Result<String, InterpreterError> {
        let request = self.build_request(spread, question);

        let response = self
            .client
            .post(COMPLETION_URL)
            .header("Authorization", format!("Api-Key {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InterpreterError::network(format!("request timeout: {e}"))
                } else if e.is_connect() {
                    InterpreterError::network(format!("connection failed: {e}"))
                } else {
                    InterpreterError::unknown(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| InterpreterError::network(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::classify_error(status, &body));
        }

        let completion: CompletionResponse = serde_json::from_str(&body)
            .map_err(|e| InterpreterError::unknown(format!("failed to parse response: {e}")))?;

        let text = completion
            .result
            .alternatives
            .into_iter()
            .next()
            .map(|alt| alt.message.text)
            .unwrap_or_default();
        Ok(text)
    }
}

// Completion API wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionRequest {
    model_uri: String,
    completion_options: CompletionOptions,
    messages: Vec<CompletionMessage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionOptions {
    temperature: f64,
    max_tokens: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CompletionMessage {
    role: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    result: CompletionResult,
}

#[derive(Debug, Deserialize)]
struct CompletionResult {
    alternatives: Vec<CompletionAlternative>,
}

#[derive(Debug, Deserialize)]
struct CompletionAlternative {
    message: CompletionMessage,
}
