use serde::{Deserialize, Serialize};

use super::exercise::Exercise;
use crate::error::SessionError;

/// An ordered template of exercises run as one workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    /// Stable identifier, e.g. `"morning-energy"`.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Rest between consecutive exercises, in seconds.
    pub rest_secs: u64,
    pub exercises: Vec<Exercise>,
}

impl Routine {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        rest_secs: u64,
        exercises: Vec<Exercise>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            rest_secs,
            exercises,
        }
    }

    /// Check that the routine can be run as a session.
    ///
    /// # Errors
    /// `EmptyRoutine` with no exercises, `InvalidExercise` when an exercise
    /// has a zero duration.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.exercises.is_empty() {
            return Err(SessionError::EmptyRoutine);
        }
        if let Some((index, ex)) = self
            .exercises
            .iter()
            .enumerate()
            .find(|(_, ex)| ex.duration_secs == 0)
        {
            return Err(SessionError::InvalidExercise {
                index,
                name: ex.name.clone(),
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    /// Total planned seconds including the rests between exercises.
    pub fn total_duration_secs(&self) -> u64 {
        let work: u64 = self.exercises.iter().map(|e| e.duration_secs).sum();
        let rests = self.rest_secs.saturating_mul(self.len().saturating_sub(1) as u64);
        work.saturating_add(rests)
    }

    pub fn exercise_names(&self) -> Vec<String> {
        self.exercises.iter().map(|e| e.name.clone()).collect()
    }
}
