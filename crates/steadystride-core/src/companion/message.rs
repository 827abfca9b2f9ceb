//! JSON wire format exchanged with the companion wearable.
//!
//! Every payload is a flat object tagged by `"type"` (camelCase) and
//! stamped with a `"timestamp"` in fractional seconds since the epoch.

use serde::{Deserialize, Serialize};

use crate::error::CompanionError;
use crate::progress::ProgressContext;

/// Messages sent from the phone to the companion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundMessage {
    #[serde(rename_all = "camelCase")]
    StartWorkout {
        routine_name: String,
        exercises: Vec<String>,
    },
    PauseWorkout,
    ResumeWorkout,
    EndWorkout,
    #[serde(rename = "exerciseChange", rename_all = "camelCase")]
    ExerciseChanged {
        exercise_name: String,
        /// Seconds.
        duration: u64,
        instructions: String,
    },
    SyncProgress(ProgressContext),
}

impl OutboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::StartWorkout { .. } => "startWorkout",
            OutboundMessage::PauseWorkout => "pauseWorkout",
            OutboundMessage::ResumeWorkout => "resumeWorkout",
            OutboundMessage::EndWorkout => "endWorkout",
            OutboundMessage::ExerciseChanged { .. } => "exerciseChange",
            OutboundMessage::SyncProgress(_) => "syncProgress",
        }
    }

    /// Real-time commands are dropped when the companion is unreachable;
    /// progress context is held and replayed.
    pub fn is_realtime(&self) -> bool {
        !matches!(self, OutboundMessage::SyncProgress(_))
    }
}

/// Summary attached to a companion-side end of workout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSummary {
    /// Seconds the companion measured.
    #[serde(default, rename = "duration")]
    pub duration_secs: Option<f64>,
    #[serde(default)]
    pub exercises_completed: Option<u32>,
    #[serde(default)]
    pub average_heart_rate: Option<f64>,
}

/// Messages received from the companion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InboundMessage {
    #[serde(rename_all = "camelCase")]
    HeartRateUpdate { heart_rate: f64 },
    PostureAlert { message: String },
    EndWorkout {
        #[serde(default)]
        summary: Option<WorkoutSummary>,
    },
    #[serde(rename_all = "camelCase")]
    WorkoutComplete {
        duration: f64,
        exercises_completed: u32,
    },
    RequestSync,
}

const INBOUND_TYPES: &[&str] = &[
    "heartRateUpdate",
    "postureAlert",
    "endWorkout",
    "workoutComplete",
    "requestSync",
];

impl InboundMessage {
    /// Treat `workoutComplete` as an end of workout carrying a summary.
    pub fn companion_summary(&self) -> Option<Option<WorkoutSummary>> {
        match self {
            InboundMessage::EndWorkout { summary } => Some(summary.clone()),
            InboundMessage::WorkoutComplete {
                duration,
                exercises_completed,
            } => Some(Some(WorkoutSummary {
                duration_secs: Some(*duration),
                exercises_completed: Some(*exercises_completed),
                average_heart_rate: None,
            })),
            _ => None,
        }
    }
}

/// Serialize a message into its wire form with a timestamp.
pub fn encode<T: Serialize>(message: &T, timestamp: f64) -> Result<String, serde_json::Error> {
    let mut value = serde_json::to_value(message)?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("timestamp".into(), serde_json::json!(timestamp));
    }
    serde_json::to_string(&value)
}

/// Parse an inbound payload.
///
/// # Errors
/// `UnknownMessageType` for a well-formed payload with an unhandled `type`,
/// `Decode` for anything else that does not parse.
pub fn decode(raw: &str) -> Result<InboundMessage, CompanionError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    if let Some(kind) = value.get("type").and_then(|t| t.as_str()) {
        if !INBOUND_TYPES.contains(&kind) {
            return Err(CompanionError::UnknownMessageType(kind.to_string()));
        }
    }
    Ok(serde_json::from_value(value)?)
}

pub(crate) fn epoch_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn start_workout_uses_camel_case_fields() {
        let msg = OutboundMessage::StartWorkout {
            routine_name: "Balance Builder".into(),
            exercises: vec!["Single Leg Stand".into()],
        };
        let raw = encode(&msg, 1_700_000_000.5).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["type"], "startWorkout");
        assert_eq!(json["routineName"], "Balance Builder");
        assert_eq!(json["exercises"][0], "Single Leg Stand");
        assert_eq!(json["timestamp"], 1_700_000_000.5);
    }

    #[test]
    fn exercise_change_keeps_legacy_type_name() {
        let msg = OutboundMessage::ExerciseChanged {
            exercise_name: "Calf Raises".into(),
            duration: 45,
            instructions: "Hold the chair".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "exerciseChange");
        assert_eq!(json["exerciseName"], "Calf Raises");
        assert_eq!(msg.kind(), "exerciseChange");
        assert!(msg.is_realtime());
    }

    #[test]
    fn sync_progress_flattens_context() {
        let mut weekly = BTreeMap::new();
        weekly.insert("2026-10-19".to_string(), true);
        let msg = OutboundMessage::SyncProgress(ProgressContext {
            streak: 3,
            today_completed: true,
            weekly_progress: weekly,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "syncProgress");
        assert_eq!(json["streak"], 3);
        assert_eq!(json["todayCompleted"], true);
        assert_eq!(json["weeklyProgress"]["2026-10-19"], true);
        assert!(!msg.is_realtime());
    }

    #[test]
    fn decode_heart_rate_ignores_timestamp() {
        let msg = decode(r#"{"type":"heartRateUpdate","heartRate":88.0,"timestamp":1.0}"#).unwrap();
        assert_eq!(msg, InboundMessage::HeartRateUpdate { heart_rate: 88.0 });
    }

    #[test]
    fn decode_end_workout_with_and_without_summary() {
        let bare = decode(r#"{"type":"endWorkout"}"#).unwrap();
        assert_eq!(bare.companion_summary(), Some(None));

        let full = decode(
            r#"{"type":"endWorkout","summary":{"duration":310.0,"exercisesCompleted":4}}"#,
        )
        .unwrap();
        let summary = full.companion_summary().unwrap().unwrap();
        assert_eq!(summary.duration_secs, Some(310.0));
        assert_eq!(summary.exercises_completed, Some(4));
    }

    #[test]
    fn workout_complete_maps_to_summary() {
        let msg = decode(r#"{"type":"workoutComplete","duration":120.0,"exercisesCompleted":2}"#)
            .unwrap();
        let summary = msg.companion_summary().unwrap().unwrap();
        assert_eq!(summary.exercises_completed, Some(2));
    }

    #[test]
    fn decode_rejects_unknown_type_and_garbage() {
        assert!(matches!(
            decode(r#"{"type":"selfDestruct"}"#),
            Err(CompanionError::UnknownMessageType(t)) if t == "selfDestruct"
        ));
        assert!(matches!(decode("not json"), Err(CompanionError::Decode(_))));
        assert!(matches!(
            decode(r#"{"type":"heartRateUpdate"}"#),
            Err(CompanionError::Decode(_))
        ));
    }
}
