use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::companion::WorkoutSummary;
use crate::session::{Phase, SessionRecord};

/// Every session state change produces an Event.
/// Mutators return them; the actor broadcasts them to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        routine_id: String,
        routine_name: String,
        exercise_count: usize,
        at: DateTime<Utc>,
    },
    ExerciseStarted {
        index: usize,
        name: String,
        duration_secs: u64,
        first_instruction: String,
        at: DateTime<Utc>,
    },
    HalfwayReached {
        index: usize,
        name: String,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    ExerciseCompleted {
        index: usize,
        name: String,
        at: DateTime<Utc>,
    },
    ExerciseSkipped {
        index: usize,
        name: String,
        at: DateTime<Utc>,
    },
    RestStarted {
        after_index: usize,
        rest_secs: u64,
        at: DateTime<Utc>,
    },
    SessionPaused {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        record: SessionRecord,
        at: DateTime<Utc>,
    },
    /// Discarded; nothing was persisted.
    SessionCancelled {
        current_index: usize,
        total_elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    HeartRateUpdated {
        bpm: f64,
        at: DateTime<Utc>,
    },
    PostureAlert {
        message: String,
        at: DateTime<Utc>,
    },
    /// The companion ended its workout on its own. The local session keeps
    /// running; the presentation layer decides what to do.
    CompanionEndedWorkout {
        summary: Option<WorkoutSummary>,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: Phase,
        paused: bool,
        current_index: usize,
        exercise_name: Option<String>,
        time_remaining_secs: u64,
        total_elapsed_secs: u64,
        completed: BTreeSet<usize>,
        skipped: BTreeSet<usize>,
        progress: f64,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Event::SessionCompleted { .. } | Event::SessionCancelled { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = Event::RestStarted {
            after_index: 2,
            rest_secs: 15,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "RestStarted");
        assert_eq!(json["rest_secs"], 15);
    }

    #[test]
    fn terminal_events() {
        let cancelled = Event::SessionCancelled {
            current_index: 0,
            total_elapsed_secs: 3,
            at: Utc::now(),
        };
        assert!(cancelled.is_terminal());
        let hr = Event::HeartRateUpdated {
            bpm: 80.0,
            at: Utc::now(),
        };
        assert!(!hr.is_terminal());
    }
}
