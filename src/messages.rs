//! In-character text shown to end users.
//!
//! Every user-visible failure maps to one of these notices; raw errors never
//! reach the chat.

pub const WELCOME: &str = "\u{1f52e} Welcome to the world of Tarot! \u{1f31f}\n\n\
I am a mystical guide into the realm of the cards. \
Simply write your question and I will lay out a spread for you.\n\n\
\u{2728} Remember: the Tarot speaks through symbols and signs. Stay open to their messages...";

pub const READING_START: &str =
    "\u{1f52e} I am laying out the cards... The ancient magic of the Tarot will reveal its secrets to us...";

pub const SECOND_CARD_INTRO: &str =
    "\u{2728} The mists of time are parting... I can see the next card...";

pub const THIRD_CARD_INTRO: &str =
    "\u{1f31f} The final card is ready to give up its secret...";

pub const INTERPRETATION_START: &str = "\u{1f31f} I am slipping into a mystical trance... \
The cards are whispering their secrets and I am preparing a deep interpretation for you... \u{2728}";

pub const CARDS_SILENT: &str = "\u{1f52e} The cards keep their silence...";

pub const POWERS_UNAVAILABLE: &str =
    "\u{1f30c} The mystical powers are unavailable for now... \u{1f30c}";

pub const ORACLE_MEDITATION: &str =
    "\u{1f30c} The oracle has sunk into a deep meditation... \u{1f30c}";

pub const TEST_MODE_NOTICE: &str =
    "\u{1f9ea} Test mode: the spirits were not disturbed for an interpretation.";

pub const CLOSING: &str = "\u{1f319} The cards need their rest now... \
\u{2728} Come back later for a new reading \u{1f52e}";

pub const ERROR: &str =
    "\u{1f311} The powers of the Tarot are unavailable for now... Try again a little later \u{1f311}";

pub const ACCESS_DENIED: &str = "\u{26d4} This command is reserved for the keepers of the bot.";

/// Cooldown notice, bucketed to hours once the wait is long enough.
pub fn cooldown_notice(remaining_minutes: i64) -> String {
    let lead = "\u{1f550} There is not enough magical energy for another reading yet...";
    if remaining_minutes >= 120 {
        format!("{lead} Return in {} hours \u{2728}", remaining_minutes / 60)
    } else if remaining_minutes >= 60 {
        format!("{lead} Return in an hour \u{2728}")
    } else {
        format!("{lead} Return in {remaining_minutes} minutes \u{2728}")
    }
}

/// Trim an interpretation before sending it on; an effectively empty result
/// becomes `None` so the caller can fall back to [`CARDS_SILENT`].
pub fn sanitize_interpretation(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_notice_buckets_minutes() {
        assert!(cooldown_notice(50).contains("50 minutes"));
        assert!(cooldown_notice(1).contains("1 minutes"));
    }

    #[test]
    fn cooldown_notice_buckets_hours() {
        assert!(cooldown_notice(60).contains("an hour"));
        assert!(cooldown_notice(119).contains("an hour"));
        assert!(cooldown_notice(120).contains("2 hours"));
        assert!(cooldown_notice(1440).contains("24 hours"));
    }

    #[test]
    fn sanitize_drops_whitespace_only_results() {
        assert_eq!(sanitize_interpretation("  \n "), None);
        assert_eq!(
            sanitize_interpretation("  The Tower speaks.  "),
            Some("The Tower speaks.".to_string())
        );
    }
}
