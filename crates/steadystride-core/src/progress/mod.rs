//! Streak and weekly progress derived from completed sessions.
//!
//! This is the data behind the companion's `syncProgress` context.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::session::SessionRecord;

pub mod achievements;

pub use achievements::{Achievement, AchievementKind};

/// Number of trailing days in the weekly map, today included.
pub const WEEK_DAYS: i64 = 7;

/// Latest-wins progress context pushed to the companion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressContext {
    pub streak: u32,
    pub today_completed: bool,
    /// `YYYY-MM-DD` -> at least one session completed that day.
    pub weekly_progress: BTreeMap<String, bool>,
}

impl ProgressContext {
    /// Build the context from the days on which sessions were completed.
    pub fn from_dates<I>(dates: I, today: NaiveDate) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let days: BTreeSet<NaiveDate> = dates.into_iter().collect();
        Self {
            streak: current_streak(&days, today),
            today_completed: days.contains(&today),
            weekly_progress: weekly_progress(&days, today),
        }
    }

    pub fn from_records(records: &[SessionRecord], today: NaiveDate) -> Self {
        Self::from_dates(records.iter().map(|r| r.ended_at.date_naive()), today)
    }
}

/// Consecutive active days ending today or yesterday.
///
/// A streak survives until the end of the day after the last session, so a
/// user who has not exercised yet today keeps yesterday's streak.
pub fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let yesterday = today - Duration::days(1);
    let mut cursor = match days.range(..=today).next_back() {
        Some(&latest) if latest >= yesterday => latest,
        _ => return 0,
    };
    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        cursor -= Duration::days(1);
    }
    streak
}

/// Longest run of consecutive active days.
pub fn best_streak(days: &BTreeSet<NaiveDate>) -> u32 {
    let mut best = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for &day in days {
        run = match previous {
            Some(prev) if day - prev == Duration::days(1) => run + 1,
            _ => 1,
        };
        best = best.max(run);
        previous = Some(day);
    }
    best
}

/// Active flag for each of the last [`WEEK_DAYS`] days.
pub fn weekly_progress(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> BTreeMap<String, bool> {
    (0..WEEK_DAYS)
        .map(|offset| {
            let day = today - Duration::days(offset);
            (day.format("%Y-%m-%d").to_string(), days.contains(&day))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn set(days: &[&str]) -> BTreeSet<NaiveDate> {
        days.iter().map(|s| d(s)).collect()
    }

    #[test]
    fn streak_counts_back_from_today() {
        let days = set(&["2026-10-17", "2026-10-18", "2026-10-19"]);
        assert_eq!(current_streak(&days, d("2026-10-19")), 3);
    }

    #[test]
    fn streak_survives_until_end_of_next_day() {
        let days = set(&["2026-10-17", "2026-10-18"]);
        assert_eq!(current_streak(&days, d("2026-10-19")), 2);
        assert_eq!(current_streak(&days, d("2026-10-20")), 0);
    }

    #[test]
    fn gap_breaks_streak() {
        let days = set(&["2026-10-14", "2026-10-15", "2026-10-18", "2026-10-19"]);
        assert_eq!(current_streak(&days, d("2026-10-19")), 2);
        assert_eq!(best_streak(&days), 2);
    }

    #[test]
    fn empty_history_has_no_streak() {
        let days = BTreeSet::new();
        assert_eq!(current_streak(&days, d("2026-10-19")), 0);
        assert_eq!(best_streak(&days), 0);
    }

    #[test]
    fn future_dated_sessions_are_ignored_for_current_streak() {
        let days = set(&["2026-10-19", "2026-10-25"]);
        assert_eq!(current_streak(&days, d("2026-10-19")), 1);
    }

    #[test]
    fn weekly_map_covers_seven_days() {
        let days = set(&["2026-10-13", "2026-10-19", "2026-10-10"]);
        let weekly = weekly_progress(&days, d("2026-10-19"));
        assert_eq!(weekly.len(), 7);
        assert_eq!(weekly["2026-10-19"], true);
        assert_eq!(weekly["2026-10-13"], true);
        assert_eq!(weekly["2026-10-15"], false);
        assert!(!weekly.contains_key("2026-10-10"));
    }

    #[test]
    fn records_count_on_the_day_they_ended() {
        use chrono::TimeZone;
        let ended = chrono::Utc.with_ymd_and_hms(2026, 10, 19, 0, 5, 0).unwrap();
        let record = SessionRecord {
            id: uuid::Uuid::new_v4(),
            routine_id: "balance-builder".into(),
            routine_name: "Balance Builder".into(),
            total_exercises: 1,
            completed: [0].into(),
            skipped: BTreeSet::new(),
            total_elapsed_secs: 600,
            started_at: ended - Duration::minutes(10),
            ended_at: ended,
            completion_ratio: 1.0,
        };
        let ctx = ProgressContext::from_records(&[record], d("2026-10-19"));
        assert!(ctx.today_completed);
        assert_eq!(ctx.streak, 1);
        assert_eq!(ctx.weekly_progress["2026-10-18"], false);
    }

    #[test]
    fn context_from_dates() {
        let ctx = ProgressContext::from_dates(
            vec![d("2026-10-18"), d("2026-10-19"), d("2026-10-19")],
            d("2026-10-19"),
        );
        assert_eq!(ctx.streak, 2);
        assert!(ctx.today_completed);
    }
}
