//! Milestones unlocked by completed sessions.
//!
//! Everything is derived from stored [`SessionRecord`]s. Exercise
//! categories come from the routine library, so a record whose routine is
//! no longer known still counts toward every family except the category
//! masters.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::best_streak;
use crate::routine::{ExerciseCategory, RoutineLibrary};
use crate::session::SessionRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AchievementKind {
    #[serde(rename = "first_workout")]
    FirstWorkout,
    #[serde(rename = "streak_3")]
    Streak3,
    #[serde(rename = "streak_7")]
    Streak7,
    #[serde(rename = "streak_14")]
    Streak14,
    #[serde(rename = "streak_30")]
    Streak30,
    #[serde(rename = "streak_100")]
    Streak100,
    #[serde(rename = "exercises_10")]
    Exercises10,
    #[serde(rename = "exercises_50")]
    Exercises50,
    #[serde(rename = "exercises_100")]
    Exercises100,
    #[serde(rename = "exercises_500")]
    Exercises500,
    #[serde(rename = "minutes_30")]
    Minutes30,
    #[serde(rename = "minutes_60")]
    Minutes60,
    #[serde(rename = "minutes_300")]
    Minutes300,
    #[serde(rename = "minutes_1000")]
    Minutes1000,
    #[serde(rename = "balance_master")]
    BalanceMaster,
    #[serde(rename = "strength_builder")]
    StrengthBuilder,
    #[serde(rename = "flexibility_champ")]
    FlexibilityChamp,
    #[serde(rename = "fall_preventer")]
    FallPreventer,
}

/// What an achievement counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Sessions,
    /// Longest run of consecutive active days.
    BestStreak,
    Exercises,
    Minutes,
    Category(ExerciseCategory),
}

/// Completed exercises needed in one category for its master badge.
const CATEGORY_TARGET: u64 = 20;

impl AchievementKind {
    pub const ALL: [AchievementKind; 18] = [
        AchievementKind::FirstWorkout,
        AchievementKind::Streak3,
        AchievementKind::Streak7,
        AchievementKind::Streak14,
        AchievementKind::Streak30,
        AchievementKind::Streak100,
        AchievementKind::Exercises10,
        AchievementKind::Exercises50,
        AchievementKind::Exercises100,
        AchievementKind::Exercises500,
        AchievementKind::Minutes30,
        AchievementKind::Minutes60,
        AchievementKind::Minutes300,
        AchievementKind::Minutes1000,
        AchievementKind::BalanceMaster,
        AchievementKind::StrengthBuilder,
        AchievementKind::FlexibilityChamp,
        AchievementKind::FallPreventer,
    ];

    pub fn metric(&self) -> Metric {
        use AchievementKind::*;
        match self {
            FirstWorkout => Metric::Sessions,
            Streak3 | Streak7 | Streak14 | Streak30 | Streak100 => Metric::BestStreak,
            Exercises10 | Exercises50 | Exercises100 | Exercises500 => Metric::Exercises,
            Minutes30 | Minutes60 | Minutes300 | Minutes1000 => Metric::Minutes,
            BalanceMaster => Metric::Category(ExerciseCategory::Balance),
            StrengthBuilder => Metric::Category(ExerciseCategory::Strength),
            FlexibilityChamp => Metric::Category(ExerciseCategory::Flexibility),
            FallPreventer => Metric::Category(ExerciseCategory::FallPrevention),
        }
    }

    pub fn target(&self) -> u64 {
        use AchievementKind::*;
        match self {
            FirstWorkout => 1,
            Streak3 => 3,
            Streak7 => 7,
            Streak14 => 14,
            Streak30 => 30,
            Streak100 => 100,
            Exercises10 => 10,
            Exercises50 => 50,
            Exercises100 => 100,
            Exercises500 => 500,
            Minutes30 => 30,
            Minutes60 => 60,
            Minutes300 => 300,
            Minutes1000 => 1000,
            BalanceMaster | StrengthBuilder | FlexibilityChamp | FallPreventer => CATEGORY_TARGET,
        }
    }

    pub fn title(&self) -> &'static str {
        use AchievementKind::*;
        match self {
            FirstWorkout => "First Steps",
            Streak3 => "Getting Started",
            Streak7 => "Week Warrior",
            Streak14 => "Two Week Triumph",
            Streak30 => "Month of Motion",
            Streak100 => "Century Club",
            Exercises10 => "Exercise Explorer",
            Exercises50 => "Exercise Enthusiast",
            Exercises100 => "Exercise Expert",
            Exercises500 => "Exercise Legend",
            Minutes30 => "Half Hour Hero",
            Minutes60 => "Hour of Power",
            Minutes300 => "Dedicated Mover",
            Minutes1000 => "Time Champion",
            BalanceMaster => "Balance Master",
            StrengthBuilder => "Strength Builder",
            FlexibilityChamp => "Flexibility Champion",
            FallPreventer => "Fall Preventer",
        }
    }

    pub fn description(&self) -> String {
        match self.metric() {
            Metric::Sessions => "Complete your first workout".to_string(),
            Metric::BestStreak => format!("Exercise {} days in a row", self.target()),
            Metric::Exercises => format!("Complete {} exercises", self.target()),
            Metric::Minutes => format!("Exercise for {} total minutes", self.target()),
            Metric::Category(category) => format!(
                "Complete {} {} exercises",
                self.target(),
                category.label().to_lowercase()
            ),
        }
    }
}

/// Running totals over a set of sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    pub sessions: u64,
    pub best_streak: u32,
    pub exercises: u64,
    /// Sum of each session's rounded minutes, as in the stats totals.
    pub minutes: u64,
    pub by_category: HashMap<ExerciseCategory, u64>,
    days: BTreeSet<chrono::NaiveDate>,
}

impl Tally {
    pub fn from_records(records: &[SessionRecord], library: &RoutineLibrary) -> Self {
        let mut tally = Self::default();
        for record in records {
            tally.add(record, library);
        }
        tally
    }

    fn add(&mut self, record: &SessionRecord, library: &RoutineLibrary) {
        self.sessions += 1;
        self.exercises += record.completed.len() as u64;
        self.minutes += record.duration_minutes();
        if self.days.insert(record.ended_at.date_naive()) {
            self.best_streak = best_streak(&self.days);
        }

        let Some(routine) = library.find(&record.routine_id) else {
            tracing::debug!(routine = %record.routine_id, "unknown routine, categories not counted");
            return;
        };
        for &index in &record.completed {
            if let Some(exercise) = routine.exercises.get(index) {
                *self.by_category.entry(exercise.category).or_default() += 1;
            }
        }
    }

    pub fn value(&self, metric: Metric) -> u64 {
        match metric {
            Metric::Sessions => self.sessions,
            Metric::BestStreak => u64::from(self.best_streak),
            Metric::Exercises => self.exercises,
            Metric::Minutes => self.minutes,
            Metric::Category(category) => self.by_category.get(&category).copied().unwrap_or(0),
        }
    }
}

/// One achievement with the user's progress toward it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Achievement {
    pub kind: AchievementKind,
    pub title: &'static str,
    pub description: String,
    pub target: u64,
    /// Capped at `target`.
    pub current: u64,
    pub earned: bool,
    /// End of the session that crossed the target.
    pub earned_at: Option<DateTime<Utc>>,
}

impl Achievement {
    /// Fraction of the target reached, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        self.current as f64 / self.target as f64
    }
}

/// Progress on every achievement, in [`AchievementKind::ALL`] order.
///
/// Records are replayed oldest first so each earned achievement carries the
/// time it was unlocked.
pub fn evaluate(records: &[SessionRecord], library: &RoutineLibrary) -> Vec<Achievement> {
    let mut ordered: Vec<&SessionRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.ended_at);

    let mut earned_at: HashMap<AchievementKind, DateTime<Utc>> = HashMap::new();
    let mut tally = Tally::default();
    for record in ordered {
        tally.add(record, library);
        for kind in AchievementKind::ALL {
            if tally.value(kind.metric()) >= kind.target() {
                earned_at.entry(kind).or_insert(record.ended_at);
            }
        }
    }

    AchievementKind::ALL
        .iter()
        .map(|&kind| {
            let target = kind.target();
            let earned_at = earned_at.get(&kind).copied();
            Achievement {
                kind,
                title: kind.title(),
                description: kind.description(),
                target,
                current: tally.value(kind.metric()).min(target),
                earned: earned_at.is_some(),
                earned_at,
            }
        })
        .collect()
}

/// Earned achievements only, oldest unlock first.
pub fn unlocked(records: &[SessionRecord], library: &RoutineLibrary) -> Vec<Achievement> {
    let mut earned: Vec<Achievement> = evaluate(records, library)
        .into_iter()
        .filter(|a| a.earned)
        .collect();
    earned.sort_by_key(|a| a.earned_at);
    earned
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn at(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap() + Duration::days(day)
    }

    fn session(
        routine_id: &str,
        completed: &[usize],
        elapsed: u64,
        ended_at: DateTime<Utc>,
    ) -> SessionRecord {
        let total = completed.len().max(1);
        SessionRecord {
            id: Uuid::new_v4(),
            routine_id: routine_id.into(),
            routine_name: routine_id.into(),
            total_exercises: total,
            completed: completed.iter().copied().collect(),
            skipped: BTreeSet::new(),
            total_elapsed_secs: elapsed,
            started_at: ended_at - Duration::seconds(elapsed as i64),
            ended_at,
            completion_ratio: completed.len() as f64 / total as f64,
        }
    }

    fn find(list: &[Achievement], kind: AchievementKind) -> &Achievement {
        list.iter().find(|a| a.kind == kind).unwrap()
    }

    #[test]
    fn no_sessions_no_achievements() {
        let library = RoutineLibrary::builtin();
        let all = evaluate(&[], &library);
        assert_eq!(all.len(), AchievementKind::ALL.len());
        assert!(all.iter().all(|a| !a.earned && a.current == 0));
        assert!(unlocked(&[], &library).is_empty());
    }

    #[test]
    fn first_workout_unlocks_on_first_session() {
        let library = RoutineLibrary::builtin();
        let records = vec![session("nope", &[0], 60, at(0))];
        let first = find(&evaluate(&records, &library), AchievementKind::FirstWorkout).clone();
        assert!(first.earned);
        assert_eq!(first.earned_at, Some(at(0)));
        assert_eq!(first.progress(), 1.0);
    }

    #[test]
    fn streak_family_uses_best_run_of_days() {
        let library = RoutineLibrary::builtin();
        // Seven straight days, a gap, then three more.
        let mut records: Vec<_> = (0..7).map(|d| session("x", &[0], 60, at(d))).collect();
        records.extend((9..12).map(|d| session("x", &[0], 60, at(d))));
        // A second session on an active day does not extend the run.
        records.push(session("x", &[0], 60, at(3) + Duration::hours(2)));

        let all = evaluate(&records, &library);
        assert!(find(&all, AchievementKind::Streak3).earned);
        assert_eq!(find(&all, AchievementKind::Streak3).earned_at, Some(at(2)));
        let week = find(&all, AchievementKind::Streak7);
        assert!(week.earned);
        assert_eq!(week.earned_at, Some(at(6)));
        let fortnight = find(&all, AchievementKind::Streak14);
        assert!(!fortnight.earned);
        assert_eq!(fortnight.current, 7);
    }

    #[test]
    fn exercise_family_counts_completed_only() {
        let library = RoutineLibrary::builtin();
        let records: Vec<_> = (0..4)
            .map(|d| session("x", &[0, 1, 2], 60, at(d)))
            .collect();
        let all = evaluate(&records, &library);
        let ten = find(&all, AchievementKind::Exercises10);
        assert!(ten.earned);
        assert_eq!(ten.earned_at, Some(at(3)));
        let fifty = find(&all, AchievementKind::Exercises50);
        assert!(!fifty.earned);
        assert_eq!(fifty.current, 12);
    }

    #[test]
    fn minute_family_sums_rounded_session_minutes() {
        let library = RoutineLibrary::builtin();
        // 14m30s rounds to 15 each; 15 + 15 = 30.
        let records = vec![
            session("x", &[0], 870, at(0)),
            session("x", &[0], 870, at(1)),
        ];
        let all = evaluate(&records, &library);
        assert_eq!(find(&all, AchievementKind::Minutes30).earned_at, Some(at(1)));
        assert_eq!(find(&all, AchievementKind::Minutes60).current, 30);
        assert!(!find(&all, AchievementKind::Minutes60).earned);
    }

    #[test]
    fn category_family_looks_up_routine_exercises() {
        let library = RoutineLibrary::builtin();
        let routine = library.find("balance-builder").unwrap();
        let balance: Vec<usize> = routine
            .exercises
            .iter()
            .enumerate()
            .filter(|(_, e)| e.category == ExerciseCategory::Balance)
            .map(|(i, _)| i)
            .collect();
        assert!(!balance.is_empty());

        let sessions_needed = CATEGORY_TARGET.div_ceil(balance.len() as u64) as i64;
        let records: Vec<_> = (0..sessions_needed)
            .map(|d| session("balance-builder", &balance, 300, at(d)))
            .collect();
        let tally = Tally::from_records(&records, &library);
        assert!(tally.value(Metric::Category(ExerciseCategory::Balance)) >= CATEGORY_TARGET);

        let all = evaluate(&records, &library);
        assert!(find(&all, AchievementKind::BalanceMaster).earned);
        assert_eq!(
            find(&all, AchievementKind::BalanceMaster).earned_at,
            Some(at(sessions_needed - 1))
        );
        assert!(!find(&all, AchievementKind::FallPreventer).earned);
    }

    #[test]
    fn unknown_routine_skips_categories_but_counts_elsewhere() {
        let library = RoutineLibrary::builtin();
        let records = vec![session("retired-routine", &[0, 1, 2, 3], 600, at(0))];
        let tally = Tally::from_records(&records, &library);
        assert_eq!(tally.exercises, 4);
        assert!(tally.by_category.is_empty());
    }

    #[test]
    fn unlocked_is_ordered_by_unlock_time() {
        let library = RoutineLibrary::builtin();
        let records = vec![
            session("x", &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9], 1800, at(1)),
            session("x", &[0], 60, at(0)),
        ];
        let kinds: Vec<_> = unlocked(&records, &library).into_iter().map(|a| a.kind).collect();
        assert_eq!(kinds[0], AchievementKind::FirstWorkout);
        assert!(kinds.contains(&AchievementKind::Exercises10));
        assert!(kinds.contains(&AchievementKind::Minutes30));
    }

    #[test]
    fn kinds_serialize_with_stable_ids() {
        assert_eq!(
            serde_json::to_value(AchievementKind::Streak30).unwrap(),
            "streak_30"
        );
        assert_eq!(
            serde_json::to_value(AchievementKind::FallPreventer).unwrap(),
            "fall_preventer"
        );
    }
}
