//! Read-only reporting over the interaction log
//!
//! Restricted to administrators by the command layer. A quiet or unreadable
//! store renders as a zero-valued report, never as an error.

use crate::db::{Database, StatsAggregate};

/// Question strings longer than this are truncated in the report.
const QUESTION_PREVIEW_CHARS: usize = 50;

/// Aggregate the trailing window. Degrades to a zero-valued aggregate when
/// the store is unreadable.
pub fn summarize(db: &Database, window_days: i64) -> StatsAggregate {
    match db.query_stats(window_days) {
        Ok(stats) => stats,
        Err(e) => {
            tracing::warn!(error = %e, "stats query failed, reporting empty aggregate");
            StatsAggregate {
                window_days,
                ..StatsAggregate::default()
            }
        }
    }
}

/// Render the operator report.
pub fn format_summary(stats: &StatsAggregate) -> String {
    let mut out = format!(
        "\u{1f4ca} Bot statistics for the last {} days:\n\n\
         \u{1f4dd} Total requests: {}\n\
         \u{1f465} Unique users: {}\n\
         \u{2705} Successful: {}\n\
         \u{274c} Failed: {}\n",
        stats.window_days,
        stats.total_requests,
        stats.unique_users,
        stats.successful_requests,
        stats.failed_requests,
    );

    if !stats.top_users.is_empty() {
        out.push_str("\n\u{1f451} Most active users:\n");
        for (name, count) in &stats.top_users {
            out.push_str(&format!("- {name}: {count} requests\n"));
        }
    }

    if !stats.top_questions.is_empty() {
        out.push_str("\n\u{2753} Popular questions:\n");
        for (question, count) in &stats.top_questions {
            out.push_str(&format!("- {} ({count} times)\n", preview(question)));
        }
    }

    out
}

fn preview(question: &str) -> String {
    let mut chars = question.chars();
    let head: String = chars.by_ref().take(QUESTION_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::LogEntry;
    use chrono::Utc;

    #[test]
    fn empty_store_summarizes_to_zero() {
        let db = Database::open_in_memory().unwrap();
        let stats = summarize(&db, 7);
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.window_days, 7);

        let report = format_summary(&stats);
        assert!(report.contains("Total requests: 0"));
        assert!(!report.contains("Most active users"));
    }

    #[test]
    fn report_lists_top_users_and_questions() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        db.append_log(&LogEntry::success(1, Some("ada".into()), "will it rain?", vec![], now))
            .unwrap();
        db.append_log(&LogEntry::failure(2, Some("bob".into()), "will it rain?", now))
            .unwrap();

        let report = format_summary(&summarize(&db, 7));
        assert!(report.contains("Total requests: 2"));
        assert!(report.contains("- ada: 1 requests"));
        assert!(report.contains("- will it rain? (2 times)"));
    }

    #[test]
    fn long_questions_are_truncated() {
        let question = "x".repeat(80);
        assert_eq!(preview(&question).chars().count(), 53);
        assert!(preview(&question).ends_with("..."));
        assert_eq!(preview("short"), "short");
    }
}
