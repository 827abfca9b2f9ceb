//! Voice announcement triggers.
//!
//! The engine only says *which* cue fired and with what parameters;
//! wording belongs to whoever speaks it.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cue", rename_all = "snake_case")]
pub enum VoiceCue {
    ExerciseStart { name: String, duration_secs: u64 },
    Halfway { name: String, remaining_secs: u64 },
    ExerciseComplete { name: String },
    RestStart { seconds: u64 },
    WorkoutComplete,
}

const COMPLETE_PHRASES: &[&str] = &[
    "Exercise complete. Take a moment to rest.",
    "Well done! Rest and get ready for the next exercise.",
    "Great work! Catch your breath.",
    "Excellent! Rest up.",
];

impl VoiceCue {
    /// Default English wording.
    pub fn script(&self) -> String {
        match self {
            VoiceCue::ExerciseStart { name, duration_secs } => {
                let length = if *duration_secs >= 60 {
                    let minutes = duration_secs / 60;
                    if minutes == 1 {
                        "1 minute".to_string()
                    } else {
                        format!("{minutes} minutes")
                    }
                } else {
                    format!("{duration_secs} seconds")
                };
                format!("Starting {name}. This exercise is {length}.")
            }
            VoiceCue::Halfway { .. } => "You're halfway there!".to_string(),
            VoiceCue::ExerciseComplete { .. } => COMPLETE_PHRASES
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(COMPLETE_PHRASES[0])
                .to_string(),
            VoiceCue::RestStart { seconds } => format!("Rest for {seconds} seconds."),
            VoiceCue::WorkoutComplete => {
                "Congratulations! You've completed your workout. Great job today!".to_string()
            }
        }
    }
}

/// Receives cues from the engine. Must not block.
pub trait VoiceCoach: Send + Sync {
    fn announce(&self, cue: &VoiceCue);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SilentCoach;

impl VoiceCoach for SilentCoach {
    fn announce(&self, _cue: &VoiceCue) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceSpeed {
    Slow,
    #[default]
    Normal,
    Fast,
}

/// Coach that renders each cue's script to the log.
///
/// Stand-in for a speech synthesizer on platforms without one.
#[derive(Debug, Clone)]
pub struct SpokenCoach {
    enabled: bool,
    speed: VoiceSpeed,
}

impl SpokenCoach {
    pub fn new(enabled: bool, speed: VoiceSpeed) -> Self {
        Self { enabled, speed }
    }
}

impl VoiceCoach for SpokenCoach {
    fn announce(&self, cue: &VoiceCue) {
        if !self.enabled {
            return;
        }
        tracing::info!(target: "steadystride::voice", speed = ?self.speed, "{}", cue.script());
    }
}
