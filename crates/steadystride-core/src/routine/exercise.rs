use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseCategory {
    Balance,
    Strength,
    Flexibility,
    FallPrevention,
    Posture,
    Breathing,
    Warmup,
    Cooldown,
}

impl ExerciseCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ExerciseCategory::Balance => "Balance",
            ExerciseCategory::Strength => "Strength",
            ExerciseCategory::Flexibility => "Flexibility",
            ExerciseCategory::FallPrevention => "Fall Prevention",
            ExerciseCategory::Posture => "Posture",
            ExerciseCategory::Breathing => "Breathing",
            ExerciseCategory::Warmup => "Warm Up",
            ExerciseCategory::Cooldown => "Cool Down",
        }
    }
}

/// One timed movement within a routine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    /// Duration in seconds.
    pub duration_secs: u64,
    #[serde(default)]
    pub instructions: Vec<String>,
    pub category: ExerciseCategory,
}

impl Exercise {
    pub fn new(name: impl Into<String>, duration_secs: u64, category: ExerciseCategory) -> Self {
        Self {
            name: name.into(),
            duration_secs,
            instructions: Vec::new(),
            category,
        }
    }

    pub fn with_instructions<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instructions = lines.into_iter().map(Into::into).collect();
        self
    }

    /// First instruction line, used for display and the companion prompt.
    pub fn first_instruction(&self) -> &str {
        self.instructions.first().map(String::as_str).unwrap_or("")
    }

    /// Remaining seconds at which the halfway cue fires.
    ///
    /// `None` for exercises too short to have a distinct midpoint.
    pub fn halfway_secs(&self) -> Option<u64> {
        let half = self.duration_secs / 2;
        (half > 0).then_some(half)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_instruction_defaults_to_empty() {
        let ex = Exercise::new("Calf Raises", 45, ExerciseCategory::Strength);
        assert_eq!(ex.first_instruction(), "");

        let ex = ex.with_instructions(["Hold the chair", "Rise onto toes"]);
        assert_eq!(ex.first_instruction(), "Hold the chair");
    }

    #[test]
    fn halfway_uses_integer_half() {
        assert_eq!(Exercise::new("a", 30, ExerciseCategory::Balance).halfway_secs(), Some(15));
        assert_eq!(Exercise::new("b", 45, ExerciseCategory::Balance).halfway_secs(), Some(22));
        assert_eq!(Exercise::new("c", 1, ExerciseCategory::Balance).halfway_secs(), None);
    }

    #[test]
    fn category_serializes_snake_case() {
        let json = serde_json::to_string(&ExerciseCategory::FallPrevention).unwrap();
        assert_eq!(json, "\"fall_prevention\"");
    }
}
