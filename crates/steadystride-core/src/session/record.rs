//! Immutable summary of a completed session and the store it is handed to.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::engine::SessionState;
use crate::error::CoreError;

/// Sessions at or above this completion ratio count as successful.
pub const SUCCESS_RATIO: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub routine_id: String,
    pub routine_name: String,
    pub total_exercises: usize,
    pub completed: BTreeSet<usize>,
    pub skipped: BTreeSet<usize>,
    pub total_elapsed_secs: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// `completed / total_exercises`.
    pub completion_ratio: f64,
}

impl SessionRecord {
    pub(crate) fn assemble(state: &SessionState, ended_at: DateTime<Utc>) -> Self {
        let total = state.exercises.len();
        let completion_ratio = if total == 0 {
            0.0
        } else {
            state.completed.len() as f64 / total as f64
        };
        Self {
            id: Uuid::new_v4(),
            routine_id: state.routine_id.clone(),
            routine_name: state.routine_name.clone(),
            total_exercises: total,
            completed: state.completed.clone(),
            skipped: state.skipped.clone(),
            total_elapsed_secs: state.total_elapsed_secs,
            started_at: state.started_at,
            ended_at,
            completion_ratio,
        }
    }

    pub fn was_successful(&self) -> bool {
        self.completion_ratio >= SUCCESS_RATIO
    }

    /// Elapsed time rounded to the nearest minute.
    pub fn duration_minutes(&self) -> u64 {
        (self.total_elapsed_secs + 30) / 60
    }
}

/// Persistence collaborator. Called once per completed session.
pub trait SessionStore: Send {
    /// # Errors
    /// Implementation-specific; the engine logs and carries on.
    fn save_session(&self, record: &SessionRecord) -> Result<(), CoreError>;
}

/// In-memory store. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<Vec<SessionRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<SessionRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl SessionStore for MemoryStore {
    fn save_session(&self, record: &SessionRecord) -> Result<(), CoreError> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(completed: usize, total: usize, elapsed: u64) -> SessionRecord {
        let now = Utc::now();
        SessionRecord {
            id: Uuid::new_v4(),
            routine_id: "r".into(),
            routine_name: "R".into(),
            total_exercises: total,
            completed: (0..completed).collect(),
            skipped: BTreeSet::new(),
            total_elapsed_secs: elapsed,
            started_at: now,
            ended_at: now,
            completion_ratio: completed as f64 / total as f64,
        }
    }

    #[test]
    fn success_threshold() {
        assert!(record(7, 10, 0).was_successful());
        assert!(!record(3, 5, 0).was_successful());
    }

    #[test]
    fn duration_rounds_to_nearest_minute() {
        assert_eq!(record(1, 1, 89).duration_minutes(), 1);
        assert_eq!(record(1, 1, 90).duration_minutes(), 2);
    }

    #[test]
    fn memory_store_clones_share_records() {
        let store = MemoryStore::new();
        let view = store.clone();
        store.save_session(&record(1, 2, 60)).unwrap();
        assert_eq!(view.records().len(), 1);
    }
}
