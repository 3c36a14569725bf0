//! Store schema and record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SQL schema for initialization. Idempotent; also seeds setting defaults.
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS bot_settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT,
    updated_by INTEGER
);

CREATE TABLE IF NOT EXISTS user_cooldowns (
    user_id INTEGER PRIMARY KEY,
    last_request TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS request_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    username TEXT,
    question TEXT NOT NULL,
    cards TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    success BOOLEAN NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_request_log_timestamp ON request_log(timestamp);
CREATE INDEX IF NOT EXISTS idx_request_log_user ON request_log(user_id);

INSERT OR IGNORE INTO bot_settings (key, value) VALUES ('cooldown_minutes', '1440');
INSERT OR IGNORE INTO bot_settings (key, value) VALUES ('test_mode', 'false');
";

/// Setting key for the cooldown duration in minutes.
pub const SETTING_COOLDOWN_MINUTES: &str = "cooldown_minutes";

/// Setting key for the global test-mode flag.
pub const SETTING_TEST_MODE: &str = "test_mode";

/// One attempted reading, immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub user_id: i64,
    pub username: Option<String>,
    pub question: String,
    /// Card names in draw order; empty when the reading failed before a draw.
    pub cards: Vec<String>,
    pub at: DateTime<Utc>,
    pub success: bool,
}

impl LogEntry {
    pub fn success(
        user_id: i64,
        username: Option<String>,
        question: impl Into<String>,
        cards: Vec<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            username,
            question: question.into(),
            cards,
            at,
            success: true,
        }
    }

    pub fn failure(
        user_id: i64,
        username: Option<String>,
        question: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            username,
            question: question.into(),
            cards: Vec::new(),
            at,
            success: false,
        }
    }
}

/// A log row as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedRequest {
    pub id: i64,
    pub entry: LogEntry,
}

/// Usage summary over a trailing window of the request log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsAggregate {
    pub window_days: i64,
    pub total_requests: i64,
    pub unique_users: i64,
    pub successful_requests: i64,
    pub failed_requests: i64,
    /// Display name paired with entry count, busiest first; ties break on
    /// first appearance in the log.
    pub top_users: Vec<(String, i64)>,
    /// Exact question strings paired with counts, most frequent first.
    pub top_questions: Vec<(String, i64)>,
}

/// What a retention sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeOutcome {
    pub cooldowns_removed: usize,
    pub log_entries_removed: usize,
}
