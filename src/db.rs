//! State store
//!
//! Durable storage for settings, per-user cooldown timestamps, and the
//! append-only request log. Read paths degrade to safe defaults; explicit
//! administrative writes surface their errors to the caller.

mod schema;

pub use schema::*;

use crate::cooldown::{self, Gate, DEFAULT_COOLDOWN_MINUTES, MIN_COOLDOWN_MINUTES};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe store handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Settings ====================

    fn setting(conn: &Connection, key: &str) -> DbResult<Option<String>> {
        let value = conn
            .query_row(
                "SELECT value FROM bot_settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn cooldown_minutes_with(conn: &Connection) -> i64 {
        match Self::setting(conn, SETTING_COOLDOWN_MINUTES) {
            Ok(Some(raw)) => raw
                .parse::<i64>()
                .unwrap_or(DEFAULT_COOLDOWN_MINUTES)
                .max(MIN_COOLDOWN_MINUTES),
            Ok(None) => DEFAULT_COOLDOWN_MINUTES,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read cooldown setting, using default");
                DEFAULT_COOLDOWN_MINUTES
            }
        }
    }

    /// Configured cooldown in minutes. Never fails; degrades to the 24 hour
    /// default and clamps to the administrative minimum.
    pub fn cooldown_minutes(&self) -> i64 {
        let conn = self.conn.lock().unwrap();
        Self::cooldown_minutes_with(&conn)
    }

    /// Set the cooldown. The command layer validates `minutes >= 1`.
    pub fn set_cooldown_minutes(&self, minutes: i64, changed_by: i64) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO bot_settings (key, value, updated_at, updated_by)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                SETTING_COOLDOWN_MINUTES,
                minutes.to_string(),
                Utc::now().to_rfc3339(),
                changed_by
            ],
        )?;
        tracing::info!(minutes, changed_by, "cooldown updated");
        Ok(())
    }

    /// Whether the global test-mode flag is on. Degrades to `false`.
    pub fn test_mode(&self) -> bool {
        let conn = self.conn.lock().unwrap();
        match Self::setting(&conn, SETTING_TEST_MODE) {
            Ok(Some(raw)) => raw.eq_ignore_ascii_case("true"),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read test mode setting");
                false
            }
        }
    }

    /// Flip the test-mode flag and return the new state.
    pub fn toggle_test_mode(&self, changed_by: i64) -> DbResult<bool> {
        let conn = self.conn.lock().unwrap();
        let current = Self::setting(&conn, SETTING_TEST_MODE)?
            .is_some_and(|raw| raw.eq_ignore_ascii_case("true"));
        let new_mode = !current;
        conn.execute(
            "INSERT OR REPLACE INTO bot_settings (key, value, updated_at, updated_by)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                SETTING_TEST_MODE,
                if new_mode { "true" } else { "false" },
                Utc::now().to_rfc3339(),
                changed_by
            ],
        )?;
        tracing::info!(new_mode, changed_by, "test mode toggled");
        Ok(new_mode)
    }

    // ==================== Cooldown records ====================

    fn last_activity_with(conn: &Connection, user_id: i64) -> DbResult<Option<DateTime<Utc>>> {
        let raw: Option<String> = conn
            .query_row(
                "SELECT last_request FROM user_cooldowns WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.as_deref().map(parse_datetime))
    }

    /// Timestamp of the user's last accepted request. `None` means the user
    /// has never made one; read errors also degrade to `None`.
    #[allow(dead_code)] // API completeness; sessions go through begin_session
    pub fn last_activity(&self, user_id: i64) -> Option<DateTime<Utc>> {
        let conn = self.conn.lock().unwrap();
        match Self::last_activity_with(&conn, user_id) {
            Ok(last) => last,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "failed to read last activity");
                None
            }
        }
    }

    /// Upsert the user's last accepted request. The same-or-later timestamp
    /// wins, so retries are idempotent and a stale writer never rolls a
    /// newer record back.
    #[allow(dead_code)] // API completeness; sessions go through begin_session
    pub fn record_activity(&self, user_id: i64, at: DateTime<Utc>) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO user_cooldowns (user_id, last_request) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET last_request = excluded.last_request
             WHERE excluded.last_request >= user_cooldowns.last_request",
            params![user_id, at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Cooldown check and activity recording as one atomic operation.
    ///
    /// Both run inside a single transaction under the connection mutex, so
    /// two concurrent sessions for the same user can never both pass the
    /// gate before either records activity.
    pub fn begin_session(&self, user_id: i64, now: DateTime<Utc>) -> DbResult<Gate> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let cooldown = Duration::minutes(Self::cooldown_minutes_with(&tx));
        let last = Self::last_activity_with(&tx, user_id)?;
        let gate = cooldown::evaluate(cooldown, last, now);

        if gate.is_allowed() {
            tx.execute(
                "INSERT INTO user_cooldowns (user_id, last_request) VALUES (?1, ?2)
                 ON CONFLICT(user_id) DO UPDATE SET last_request = excluded.last_request
                 WHERE excluded.last_request >= user_cooldowns.last_request",
                params![user_id, now.to_rfc3339()],
            )?;
        }
        tx.commit()?;
        Ok(gate)
    }

    // ==================== Request log ====================

    /// Append one interaction log entry and return its row id.
    ///
    /// Callers on the session path swallow the error and report it through
    /// tracing only; a log failure must never surface to the end user.
    pub fn append_log(&self, entry: &LogEntry) -> DbResult<i64> {
        let conn = self.conn.lock().unwrap();
        let cards = serde_json::to_string(&entry.cards).unwrap();
        conn.execute(
            "INSERT INTO request_log (user_id, username, question, cards, timestamp, success)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.user_id,
                entry.username,
                entry.question,
                cards,
                entry.at.to_rfc3339(),
                entry.success
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Most recent log rows, newest first.
    #[allow(dead_code)] // Useful for tests
    pub fn recent_log_entries(&self, limit: usize) -> DbResult<Vec<LoggedRequest>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, username, question, cards, timestamp, success
             FROM request_log ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            let cards_raw: String = row.get(4)?;
            let timestamp: String = row.get(5)?;
            Ok(LoggedRequest {
                id: row.get(0)?,
                entry: LogEntry {
                    user_id: row.get(1)?,
                    username: row.get(2)?,
                    question: row.get(3)?,
                    cards: serde_json::from_str(&cards_raw).unwrap_or_default(),
                    at: parse_datetime(&timestamp),
                    success: row.get(6)?,
                },
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Aggregate log entries within the trailing window ending at `now`.
    pub fn query_stats_at(&self, window_days: i64, now: DateTime<Utc>) -> DbResult<StatsAggregate> {
        let conn = self.conn.lock().unwrap();
        let cutoff = (now - Duration::days(window_days)).to_rfc3339();

        let (total_requests, unique_users, successful_requests, failed_requests) = conn
            .query_row(
                "SELECT COUNT(*),
                        COUNT(DISTINCT user_id),
                        COALESCE(SUM(CASE WHEN success THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(CASE WHEN NOT success THEN 1 ELSE 0 END), 0)
                 FROM request_log WHERE timestamp > ?1",
                params![cutoff],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )?;

        let mut stmt = conn.prepare(
            "SELECT COALESCE(username, CAST(user_id AS TEXT)) AS who, COUNT(*) AS n
             FROM request_log WHERE timestamp > ?1
             GROUP BY who ORDER BY n DESC, MIN(id) ASC LIMIT 5",
        )?;
        let top_users = stmt
            .query_map(params![cutoff], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(String, i64)>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT question, COUNT(*) AS n
             FROM request_log WHERE timestamp > ?1
             GROUP BY question ORDER BY n DESC, MIN(id) ASC LIMIT 5",
        )?;
        let top_questions = stmt
            .query_map(params![cutoff], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(String, i64)>, _>>()?;

        Ok(StatsAggregate {
            window_days,
            total_requests,
            unique_users,
            successful_requests,
            failed_requests,
            top_users,
            top_questions,
        })
    }

    /// Aggregate over the trailing window ending now.
    pub fn query_stats(&self, window_days: i64) -> DbResult<StatsAggregate> {
        self.query_stats_at(window_days, Utc::now())
    }

    // ==================== Housekeeping ====================

    /// Delete cooldown records and log entries older than `age`.
    pub fn purge_older_than(&self, age: Duration) -> DbResult<PurgeOutcome> {
        let conn = self.conn.lock().unwrap();
        let cutoff = (Utc::now() - age).to_rfc3339();
        let cooldowns_removed = conn.execute(
            "DELETE FROM user_cooldowns WHERE last_request < ?1",
            params![cutoff],
        )?;
        let log_entries_removed = conn.execute(
            "DELETE FROM request_log WHERE timestamp < ?1",
            params![cutoff],
        )?;
        if cooldowns_removed > 0 || log_entries_removed > 0 {
            tracing::info!(cooldowns_removed, log_entries_removed, "retention sweep");
        }
        Ok(PurgeOutcome {
            cooldowns_removed,
            log_entries_removed,
        })
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
