//! Cooldown policy: decides whether a user may start a new reading.
//!
//! Pure with respect to storage. The store feeds it the configured duration
//! and the user's last accepted request; recording activity is the
//! orchestrator's job (via [`crate::db::Database::begin_session`]), which
//! keeps evaluation side-effect-free and safely retryable.

use chrono::{DateTime, Duration, Utc};

/// Default cooldown between accepted readings: 24 hours.
pub const DEFAULT_COOLDOWN_MINUTES: i64 = 1440;

/// Administrative floor for the cooldown setting.
pub const MIN_COOLDOWN_MINUTES: i64 = 1;

/// Outcome of a cooldown check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Allowed,
    Blocked {
        /// Remaining wait, rounded up to whole minutes, never below 1.
        remaining_minutes: i64,
    },
}

impl Gate {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Gate::Allowed)
    }
}

/// Evaluate the cooldown gate for one user.
///
/// A user with no recorded activity is always allowed. Otherwise the gate
/// opens once `now - last >= cooldown`; a blocked gate reports the remainder
/// rounded up to the next whole minute, so a one-second overage still reads
/// as a one-minute wait.
pub fn evaluate(cooldown: Duration, last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Gate {
    let Some(last) = last else {
        return Gate::Allowed;
    };

    let elapsed = now - last;
    if elapsed >= cooldown {
        return Gate::Allowed;
    }

    let remaining = cooldown - elapsed;
    let seconds = remaining.num_seconds().max(0);
    let remaining_minutes = ((seconds + 59) / 60).max(1);
    Gate::Blocked { remaining_minutes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn fresh_user_is_allowed() {
        assert_eq!(evaluate(Duration::hours(24), None, at(0)), Gate::Allowed);
    }

    #[test]
    fn elapsed_cooldown_is_allowed() {
        let gate = evaluate(Duration::minutes(60), Some(at(0)), at(60 * 60));
        assert_eq!(gate, Gate::Allowed);
    }

    #[test]
    fn remaining_rounds_up_to_whole_minutes() {
        // 10 minutes in on a 60 minute cooldown: 50 whole minutes remain.
        let gate = evaluate(Duration::minutes(60), Some(at(0)), at(10 * 60));
        assert_eq!(
            gate,
            Gate::Blocked {
                remaining_minutes: 50
            }
        );

        // 59 minutes and 59 seconds in: one second of overage still reports
        // a full minute, never zero.
        let gate = evaluate(Duration::minutes(60), Some(at(0)), at(59 * 60 + 59));
        assert_eq!(
            gate,
            Gate::Blocked {
                remaining_minutes: 1
            }
        );
    }

    #[test]
    fn shortened_cooldown_reopens_gate() {
        // Scenario D: cooldown lowered to 5 minutes, last activity 6 minutes ago.
        let gate = evaluate(Duration::minutes(5), Some(at(0)), at(6 * 60));
        assert_eq!(gate, Gate::Allowed);
    }

    proptest! {
        #[test]
        fn blocked_remainder_is_exact_ceiling(
            cooldown_minutes in 1i64..10_000,
            elapsed_seconds in 0i64..600_000,
        ) {
            let cooldown = Duration::minutes(cooldown_minutes);
            let gate = evaluate(cooldown, Some(at(0)), at(elapsed_seconds));
            let cooldown_seconds = cooldown_minutes * 60;
            if elapsed_seconds >= cooldown_seconds {
                prop_assert_eq!(gate, Gate::Allowed);
            } else {
                let expected = ((cooldown_seconds - elapsed_seconds + 59) / 60).max(1);
                prop_assert_eq!(gate, Gate::Blocked { remaining_minutes: expected });
            }
        }
    }
}
