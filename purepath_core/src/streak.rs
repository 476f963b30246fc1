//! Streak engine.
//!
//! Decides what a check-in does to a streak, at calendar-day granularity:
//! - same calendar day as the last check-in: nothing changes
//! - the day after: the streak grows by one
//! - anything else (gap, first check-in): the streak restarts at one
//!
//! Everything here is pure. Dates are resolved from timestamps by
//! [`calendar_date`] before the engine sees them.

use chrono::{DateTime, Datelike, FixedOffset, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// How "yesterday" is decided.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum YesterdayRule {
    /// Exactly one calendar day earlier, across month and year boundaries
    #[default]
    Calendar,
    /// Same year and month, and `day == today.day - 1`.
    /// Jan 31 -> Feb 1 restarts the streak under this rule.
    SameMonth,
}

/// Result of evaluating a check-in against the previous one
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreakDecision {
    /// Already checked in on this calendar day
    AlreadyCheckedIn { streak_days: u32 },
    /// Last check-in was yesterday
    Continued { streak_days: u32 },
    /// No prior check-in, or at least one day was missed
    Restarted { streak_days: u32 },
}

impl StreakDecision {
    pub fn streak_days(&self) -> u32 {
        match *self {
            StreakDecision::AlreadyCheckedIn { streak_days }
            | StreakDecision::Continued { streak_days }
            | StreakDecision::Restarted { streak_days } => streak_days,
        }
    }

    /// Whether the profile must be written
    pub fn changed(&self) -> bool {
        !matches!(self, StreakDecision::AlreadyCheckedIn { .. })
    }

    pub fn message(&self) -> &'static str {
        match self {
            StreakDecision::AlreadyCheckedIn { .. } => "Already checked in today",
            StreakDecision::Continued { .. } => "Check-in recorded, streak continued",
            StreakDecision::Restarted { .. } => "Check-in recorded, new streak started",
        }
    }
}

/// Calendar date of `ts` in the given offset, or the local time zone when `None`
pub fn calendar_date(ts: DateTime<Utc>, offset: Option<FixedOffset>) -> NaiveDate {
    match offset {
        Some(offset) => ts.with_timezone(&offset).date_naive(),
        None => ts.with_timezone(&Local).date_naive(),
    }
}

/// Whether `last` counts as the day before `today` under `rule`
pub fn is_yesterday(last: NaiveDate, today: NaiveDate, rule: YesterdayRule) -> bool {
    match rule {
        YesterdayRule::Calendar => today.pred_opt() == Some(last),
        YesterdayRule::SameMonth => {
            last.year() == today.year()
                && last.month() == today.month()
                && today.day() > 1
                && last.day() == today.day() - 1
        }
    }
}

/// Decide the next streak state.
///
/// `last_check_in` is the calendar date of the previous check-in, `None` if
/// the user never checked in.
pub fn evaluate(
    last_check_in: Option<NaiveDate>,
    today: NaiveDate,
    current_streak_days: u32,
    rule: YesterdayRule,
) -> StreakDecision {
    let Some(last) = last_check_in else {
        return StreakDecision::Restarted { streak_days: 1 };
    };

    if last == today {
        return StreakDecision::AlreadyCheckedIn {
            streak_days: current_streak_days,
        };
    }

    if is_yesterday(last, today, rule) {
        StreakDecision::Continued {
            streak_days: current_streak_days.saturating_add(1),
        }
    } else {
        StreakDecision::Restarted { streak_days: 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_same_day_is_unchanged() {
        let decision = evaluate(
            Some(date(2024, 3, 10)),
            date(2024, 3, 10),
            5,
            YesterdayRule::Calendar,
        );

        assert_eq!(decision, StreakDecision::AlreadyCheckedIn { streak_days: 5 });
        assert!(!decision.changed());
        assert_eq!(decision.message(), "Already checked in today");
    }

    #[test]
    fn test_yesterday_continues_streak() {
        let decision = evaluate(
            Some(date(2024, 3, 10)),
            date(2024, 3, 11),
            5,
            YesterdayRule::Calendar,
        );

        assert_eq!(decision.streak_days(), 6);
        assert!(decision.changed());
    }

    #[test]
    fn test_gap_restarts_streak() {
        let decision = evaluate(
            Some(date(2024, 3, 1)),
            date(2024, 3, 10),
            5,
            YesterdayRule::Calendar,
        );

        assert_eq!(decision, StreakDecision::Restarted { streak_days: 1 });
        assert!(decision.changed());
    }

    #[test]
    fn test_two_day_gap_restarts() {
        let decision = evaluate(
            Some(date(2024, 3, 8)),
            date(2024, 3, 10),
            9,
            YesterdayRule::Calendar,
        );
        assert_eq!(decision.streak_days(), 1);
    }

    #[test]
    fn test_first_check_in_starts_at_one() {
        let decision = evaluate(None, date(2024, 3, 10), 0, YesterdayRule::Calendar);
        assert_eq!(decision, StreakDecision::Restarted { streak_days: 1 });
    }

    #[test]
    fn test_future_last_check_in_restarts() {
        let decision = evaluate(
            Some(date(2024, 3, 12)),
            date(2024, 3, 10),
            3,
            YesterdayRule::Calendar,
        );
        assert_eq!(decision.streak_days(), 1);
    }

    #[test]
    fn test_month_boundary_under_calendar_rule_continues() {
        // Jan 31 -> Feb 1 is one calendar day
        let decision = evaluate(
            Some(date(2024, 1, 31)),
            date(2024, 2, 1),
            5,
            YesterdayRule::Calendar,
        );
        assert_eq!(decision, StreakDecision::Continued { streak_days: 6 });
    }

    #[test]
    fn test_month_boundary_under_same_month_rule_restarts() {
        // Legacy comparison only looks at day-of-month within the same month
        let decision = evaluate(
            Some(date(2024, 1, 31)),
            date(2024, 2, 1),
            5,
            YesterdayRule::SameMonth,
        );
        assert_eq!(decision, StreakDecision::Restarted { streak_days: 1 });
    }

    #[test]
    fn test_same_month_rule_within_month() {
        let decision = evaluate(
            Some(date(2024, 3, 10)),
            date(2024, 3, 11),
            5,
            YesterdayRule::SameMonth,
        );
        assert_eq!(decision.streak_days(), 6);
    }

    #[test]
    fn test_year_boundary_and_leap_day() {
        assert!(is_yesterday(
            date(2023, 12, 31),
            date(2024, 1, 1),
            YesterdayRule::Calendar
        ));
        assert!(is_yesterday(
            date(2024, 2, 29),
            date(2024, 3, 1),
            YesterdayRule::Calendar
        ));
        assert!(!is_yesterday(
            date(2023, 12, 31),
            date(2024, 1, 1),
            YesterdayRule::SameMonth
        ));
    }

    #[test]
    fn test_streak_saturates() {
        let decision = evaluate(
            Some(date(2024, 3, 10)),
            date(2024, 3, 11),
            u32::MAX,
            YesterdayRule::Calendar,
        );
        assert_eq!(decision.streak_days(), u32::MAX);
    }

    #[test]
    fn test_calendar_date_respects_offset() {
        // 23:30 UTC on Mar 10 is already Mar 11 at UTC+1
        let ts = Utc.with_ymd_and_hms(2024, 3, 10, 23, 30, 0).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        let plus_one = FixedOffset::east_opt(3600).unwrap();

        assert_eq!(calendar_date(ts, Some(utc)), date(2024, 3, 10));
        assert_eq!(calendar_date(ts, Some(plus_one)), date(2024, 3, 11));
    }
}
