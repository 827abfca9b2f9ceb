//! Guided workout session engine.
//!
//! A counted state machine: each `tick()` is one second, with no catch-up
//! for late ticks. The engine owns no timer. The caller (usually
//! [`SessionActor`](super::SessionActor)) delivers ticks and user commands
//! in a single serialized order.
//!
//! ## State Transitions
//!
//! ```text
//! start -> Exercising -> Resting -> Exercising -> ... -> Completed
//!              |            |
//!              +--(paused)--+        any live state -> Cancelled
//! ```
//!
//! `paused` is orthogonal to the active phase and freezes both the
//! countdown and the elapsed total.
//!
//! ## Usage
//!
//! ```ignore
//! let (mut engine, events) = SessionEngine::start(&routine, Collaborators::detached())?;
//! // once per second:
//! let events = engine.tick();
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cue::{SilentCoach, VoiceCoach, VoiceCue};
use super::record::{MemoryStore, SessionRecord, SessionStore};
use crate::companion::{CompanionChannel, DisconnectedChannel, OutboundMessage};
use crate::error::SessionError;
use crate::events::Event;
use crate::routine::{Exercise, Routine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Exercising,
    Resting,
    Completed,
    Cancelled,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Cancelled)
    }
}

/// Everything the engine tracks for one workout attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub routine_id: String,
    pub routine_name: String,
    pub rest_secs: u64,
    /// Snapshot taken at start; later routine edits do not apply.
    pub exercises: Vec<Exercise>,
    /// Equals `exercises.len()` only once Completed.
    pub current_index: usize,
    pub phase: Phase,
    pub paused: bool,
    pub exercise_time_remaining: u64,
    pub rest_time_remaining: u64,
    pub total_elapsed_secs: u64,
    pub completed: BTreeSet<usize>,
    pub skipped: BTreeSet<usize>,
    /// Whether the halfway cue already fired for the current exercise.
    pub halfway_announced: bool,
    pub started_at: DateTime<Utc>,
}

impl SessionState {
    pub fn current_exercise(&self) -> Option<&Exercise> {
        self.exercises.get(self.current_index)
    }

    pub fn is_last_exercise(&self) -> bool {
        self.current_index + 1 >= self.exercises.len()
    }

    /// Countdown for whichever phase is active.
    pub fn time_remaining(&self) -> u64 {
        match self.phase {
            Phase::Exercising => self.exercise_time_remaining,
            Phase::Resting => self.rest_time_remaining,
            Phase::Completed | Phase::Cancelled => 0,
        }
    }

    /// 0.0 .. 1.0 share of exercises completed so far.
    pub fn progress(&self) -> f64 {
        if self.exercises.is_empty() {
            return 0.0;
        }
        self.completed.len() as f64 / self.exercises.len() as f64
    }

    /// `m:ss` for the active countdown.
    pub fn formatted_time_remaining(&self) -> String {
        format_clock(self.time_remaining())
    }

    pub fn formatted_total_time(&self) -> String {
        format_clock(self.total_elapsed_secs)
    }
}

fn format_clock(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Services the engine calls into. Injected at construction.
pub struct Collaborators {
    pub voice: Arc<dyn VoiceCoach>,
    pub companion: Arc<dyn CompanionChannel>,
    pub store: Box<dyn SessionStore>,
}

impl Collaborators {
    pub fn new(
        voice: Arc<dyn VoiceCoach>,
        companion: Arc<dyn CompanionChannel>,
        store: Box<dyn SessionStore>,
    ) -> Self {
        Self {
            voice,
            companion,
            store,
        }
    }

    /// No voice, no companion, records kept in memory.
    pub fn detached() -> Self {
        Self::new(
            Arc::new(SilentCoach),
            Arc::new(DisconnectedChannel),
            Box::new(MemoryStore::new()),
        )
    }
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Completed,
    Skipped,
}

pub struct SessionEngine {
    state: SessionState,
    record: Option<SessionRecord>,
    collaborators: Collaborators,
}

impl SessionEngine {
    /// Begin a session on `routine`.
    ///
    /// Returns the engine in `Exercising` on the first exercise, plus the
    /// events produced by starting.
    ///
    /// # Errors
    /// `EmptyRoutine` or `InvalidExercise` if the routine cannot be run.
    pub fn start(
        routine: &Routine,
        collaborators: Collaborators,
    ) -> Result<(Self, Vec<Event>), SessionError> {
        routine.validate()?;
        let exercises = routine.exercises.clone();
        let first_duration = exercises[0].duration_secs;
        let mut engine = Self {
            state: SessionState {
                routine_id: routine.id.clone(),
                routine_name: routine.name.clone(),
                rest_secs: routine.rest_secs,
                exercises,
                current_index: 0,
                phase: Phase::Exercising,
                paused: false,
                exercise_time_remaining: first_duration,
                rest_time_remaining: 0,
                total_elapsed_secs: 0,
                completed: BTreeSet::new(),
                skipped: BTreeSet::new(),
                halfway_announced: false,
                started_at: Utc::now(),
            },
            record: None,
            collaborators,
        };

        tracing::info!(
            routine = %engine.state.routine_id,
            exercises = engine.state.exercises.len(),
            "session started"
        );
        engine
            .collaborators
            .companion
            .send(OutboundMessage::StartWorkout {
                routine_name: engine.state.routine_name.clone(),
                exercises: routine.exercise_names(),
            });
        let mut events = vec![Event::SessionStarted {
            routine_id: engine.state.routine_id.clone(),
            routine_name: engine.state.routine_name.clone(),
            exercise_count: engine.state.exercises.len(),
            at: engine.state.started_at,
        }];
        events.push(engine.announce_exercise());
        Ok((engine, events))
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    pub fn is_terminal(&self) -> bool {
        self.state.phase.is_terminal()
    }

    pub fn current_exercise(&self) -> Option<&Exercise> {
        self.state.current_exercise()
    }

    pub fn is_last_exercise(&self) -> bool {
        self.state.is_last_exercise()
    }

    pub fn progress(&self) -> f64 {
        self.state.progress()
    }

    pub fn formatted_time_remaining(&self) -> String {
        self.state.formatted_time_remaining()
    }

    /// The record produced on completion. `None` until then, and forever
    /// for a cancelled session.
    pub fn record(&self) -> Option<&SessionRecord> {
        self.record.as_ref()
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        let s = &self.state;
        Event::StateSnapshot {
            phase: s.phase,
            paused: s.paused,
            current_index: s.current_index,
            exercise_name: s.current_exercise().map(|e| e.name.clone()),
            time_remaining_secs: s.time_remaining(),
            total_elapsed_secs: s.total_elapsed_secs,
            completed: s.completed.clone(),
            skipped: s.skipped.clone(),
            progress: s.progress(),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Advance one second. No-op while paused or after termination.
    pub fn tick(&mut self) -> Vec<Event> {
        if self.state.paused || self.is_terminal() {
            return Vec::new();
        }
        self.state.total_elapsed_secs += 1;
        let mut events = Vec::new();

        match self.state.phase {
            Phase::Exercising => {
                self.state.exercise_time_remaining =
                    self.state.exercise_time_remaining.saturating_sub(1);
                let remaining = self.state.exercise_time_remaining;

                // `<=` rather than `==` so an uneven countdown still fires once.
                let halfway = self.current_exercise().and_then(Exercise::halfway_secs);
                if let Some(half) = halfway {
                    if !self.state.halfway_announced && remaining > 0 && remaining <= half {
                        self.state.halfway_announced = true;
                        events.push(self.announce_halfway(remaining));
                    }
                }

                if remaining == 0 {
                    events.extend(self.finish_exercise(Outcome::Completed));
                }
            }
            Phase::Resting => {
                self.state.rest_time_remaining = self.state.rest_time_remaining.saturating_sub(1);
                if self.state.rest_time_remaining == 0 {
                    events.extend(self.begin_next_exercise());
                }
            }
            Phase::Completed | Phase::Cancelled => {}
        }
        events
    }

    /// Freeze countdown and elapsed time. Redundant calls are no-ops.
    ///
    /// # Errors
    /// `SessionTerminated` after Completed/Cancelled.
    pub fn pause(&mut self) -> Result<Vec<Event>, SessionError> {
        self.ensure_live()?;
        if self.state.paused {
            return Ok(Vec::new());
        }
        self.state.paused = true;
        self.collaborators.companion.send(OutboundMessage::PauseWorkout);
        tracing::debug!(phase = ?self.state.phase, "session paused");
        Ok(vec![Event::SessionPaused {
            phase: self.state.phase,
            remaining_secs: self.state.time_remaining(),
            at: Utc::now(),
        }])
    }

    /// # Errors
    /// `SessionTerminated` after Completed/Cancelled.
    pub fn resume(&mut self) -> Result<Vec<Event>, SessionError> {
        self.ensure_live()?;
        if !self.state.paused {
            return Ok(Vec::new());
        }
        self.state.paused = false;
        self.collaborators.companion.send(OutboundMessage::ResumeWorkout);
        tracing::debug!(phase = ?self.state.phase, "session resumed");
        Ok(vec![Event::SessionResumed {
            phase: self.state.phase,
            remaining_secs: self.state.time_remaining(),
            at: Utc::now(),
        }])
    }

    /// Leave the current exercise without credit.
    ///
    /// # Errors
    /// `SessionTerminated` after termination, `InvalidTransition` outside
    /// the Exercising phase.
    pub fn skip(&mut self) -> Result<Vec<Event>, SessionError> {
        self.ensure_exercising("skip")?;
        Ok(self.finish_exercise(Outcome::Skipped))
    }

    /// Mark the current exercise done early.
    ///
    /// # Errors
    /// `SessionTerminated` after termination, `InvalidTransition` outside
    /// the Exercising phase.
    pub fn complete_current(&mut self) -> Result<Vec<Event>, SessionError> {
        self.ensure_exercising("complete")?;
        self.state.exercise_time_remaining = 0;
        Ok(self.finish_exercise(Outcome::Completed))
    }

    /// Abandon the session. No record is produced.
    ///
    /// # Errors
    /// `SessionTerminated` after Completed/Cancelled.
    pub fn cancel(&mut self) -> Result<Vec<Event>, SessionError> {
        self.ensure_live()?;
        self.state.phase = Phase::Cancelled;
        self.state.paused = false;
        self.collaborators.companion.send(OutboundMessage::EndWorkout);
        tracing::info!(
            routine = %self.state.routine_id,
            index = self.state.current_index,
            elapsed = self.state.total_elapsed_secs,
            "session cancelled"
        );
        Ok(vec![Event::SessionCancelled {
            current_index: self.state.current_index,
            total_elapsed_secs: self.state.total_elapsed_secs,
            at: Utc::now(),
        }])
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.is_terminal() {
            return Err(SessionError::SessionTerminated {
                phase: self.state.phase,
            });
        }
        Ok(())
    }

    fn ensure_exercising(&self, command: &'static str) -> Result<(), SessionError> {
        self.ensure_live()?;
        if self.state.phase != Phase::Exercising {
            return Err(SessionError::InvalidTransition {
                command,
                phase: self.state.phase,
            });
        }
        Ok(())
    }

    fn finish_exercise(&mut self, outcome: Outcome) -> Vec<Event> {
        let index = self.state.current_index;
        let name = self
            .current_exercise()
            .map(|e| e.name.clone())
            .unwrap_or_default();
        let mut events = Vec::new();

        match outcome {
            Outcome::Completed => {
                self.state.completed.insert(index);
                self.collaborators
                    .voice
                    .announce(&VoiceCue::ExerciseComplete { name: name.clone() });
                events.push(Event::ExerciseCompleted {
                    index,
                    name,
                    at: Utc::now(),
                });
            }
            Outcome::Skipped => {
                self.state.skipped.insert(index);
                events.push(Event::ExerciseSkipped {
                    index,
                    name,
                    at: Utc::now(),
                });
            }
        }
        self.state.exercise_time_remaining = 0;

        if self.state.is_last_exercise() {
            events.extend(self.complete_session());
        } else if self.state.rest_secs == 0 {
            events.extend(self.begin_next_exercise());
        } else {
            self.state.phase = Phase::Resting;
            self.state.rest_time_remaining = self.state.rest_secs;
            self.collaborators.voice.announce(&VoiceCue::RestStart {
                seconds: self.state.rest_secs,
            });
            events.push(Event::RestStarted {
                after_index: index,
                rest_secs: self.state.rest_secs,
                at: Utc::now(),
            });
        }
        events
    }

    fn begin_next_exercise(&mut self) -> Vec<Event> {
        self.state.current_index += 1;
        self.state.rest_time_remaining = 0;
        let Some(duration) = self.current_exercise().map(|e| e.duration_secs) else {
            return self.complete_session();
        };
        self.state.phase = Phase::Exercising;
        self.state.exercise_time_remaining = duration;
        self.state.halfway_announced = false;
        vec![self.announce_exercise()]
    }

    fn announce_exercise(&self) -> Event {
        let index = self.state.current_index;
        let exercise = &self.state.exercises[index];
        self.collaborators.voice.announce(&VoiceCue::ExerciseStart {
            name: exercise.name.clone(),
            duration_secs: exercise.duration_secs,
        });
        self.collaborators
            .companion
            .send(OutboundMessage::ExerciseChanged {
                exercise_name: exercise.name.clone(),
                duration: exercise.duration_secs,
                instructions: exercise.first_instruction().to_string(),
            });
        tracing::debug!(index, name = %exercise.name, "exercise started");
        Event::ExerciseStarted {
            index,
            name: exercise.name.clone(),
            duration_secs: exercise.duration_secs,
            first_instruction: exercise.first_instruction().to_string(),
            at: Utc::now(),
        }
    }

    fn announce_halfway(&self, remaining: u64) -> Event {
        let index = self.state.current_index;
        let name = self
            .current_exercise()
            .map(|e| e.name.clone())
            .unwrap_or_default();
        self.collaborators.voice.announce(&VoiceCue::Halfway {
            name: name.clone(),
            remaining_secs: remaining,
        });
        Event::HalfwayReached {
            index,
            name,
            remaining_secs: remaining,
            at: Utc::now(),
        }
    }

    fn complete_session(&mut self) -> Vec<Event> {
        self.state.current_index = self.state.exercises.len();
        self.state.phase = Phase::Completed;
        self.state.paused = false;
        self.state.exercise_time_remaining = 0;
        self.state.rest_time_remaining = 0;

        let record = SessionRecord::assemble(&self.state, Utc::now());
        self.collaborators.voice.announce(&VoiceCue::WorkoutComplete);
        self.collaborators.companion.send(OutboundMessage::EndWorkout);
        if let Err(e) = self.collaborators.store.save_session(&record) {
            tracing::error!(session = %record.id, error = %e, "failed to persist session record");
        }
        tracing::info!(
            routine = %record.routine_id,
            completed = record.completed.len(),
            skipped = record.skipped.len(),
            elapsed = record.total_elapsed_secs,
            "session completed"
        );
        self.record = Some(record.clone());
        vec![Event::SessionCompleted {
            record,
            at: Utc::now(),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::companion::CompanionLink;
    use crate::routine::ExerciseCategory;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCoach {
        cues: Mutex<Vec<VoiceCue>>,
    }

    impl RecordingCoach {
        fn cues(&self) -> Vec<VoiceCue> {
            self.cues.lock().unwrap().clone()
        }

        fn halfway_count(&self) -> usize {
            self.cues()
                .iter()
                .filter(|c| matches!(c, VoiceCue::Halfway { .. }))
                .count()
        }
    }

    impl VoiceCoach for RecordingCoach {
        fn announce(&self, cue: &VoiceCue) {
            self.cues.lock().unwrap().push(cue.clone());
        }
    }

    fn routine(durations: &[u64], rest: u64) -> Routine {
        let exercises = durations
            .iter()
            .enumerate()
            .map(|(i, d)| {
                Exercise::new(format!("Exercise {i}"), *d, ExerciseCategory::Balance)
                    .with_instructions([format!("Step {i}")])
            })
            .collect();
        Routine::new("test", "Test Routine", rest, exercises)
    }

    fn start(durations: &[u64], rest: u64) -> (SessionEngine, Arc<RecordingCoach>, MemoryStore) {
        let coach = Arc::new(RecordingCoach::default());
        let store = MemoryStore::new();
        let collaborators = Collaborators::new(
            coach.clone(),
            Arc::new(DisconnectedChannel),
            Box::new(store.clone()),
        );
        let (engine, _) = SessionEngine::start(&routine(durations, rest), collaborators).unwrap();
        (engine, coach, store)
    }

    fn tick_n(engine: &mut SessionEngine, n: usize) -> Vec<Event> {
        (0..n).flat_map(|_| engine.tick()).collect()
    }

    #[test]
    fn start_enters_first_exercise() {
        let (engine, coach, _) = start(&[30, 45], 15);
        let s = engine.state();
        assert_eq!(s.phase, Phase::Exercising);
        assert_eq!(s.current_index, 0);
        assert_eq!(s.exercise_time_remaining, 30);
        assert!(!s.paused);
        assert_eq!(
            coach.cues(),
            vec![VoiceCue::ExerciseStart {
                name: "Exercise 0".into(),
                duration_secs: 30
            }]
        );
    }

    #[test]
    fn empty_routine_fails_to_start() {
        let result = SessionEngine::start(&routine(&[], 15), Collaborators::detached());
        assert!(matches!(result, Err(SessionError::EmptyRoutine)));
    }

    #[test]
    fn full_run_scenario() {
        let (mut engine, coach, store) = start(&[30, 45], 15);

        tick_n(&mut engine, 30);
        assert!(engine.state().completed.contains(&0));
        assert_eq!(engine.phase(), Phase::Resting);
        assert_eq!(engine.state().rest_time_remaining, 15);

        tick_n(&mut engine, 15);
        assert_eq!(engine.phase(), Phase::Exercising);
        assert_eq!(engine.state().current_index, 1);
        assert_eq!(engine.state().exercise_time_remaining, 45);

        let events = tick_n(&mut engine, 45);
        assert_eq!(engine.phase(), Phase::Completed);
        assert_eq!(engine.state().completed, BTreeSet::from([0, 1]));
        assert_eq!(engine.state().total_elapsed_secs, 90);
        assert_eq!(engine.state().current_index, 2);
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::SessionCompleted { .. })));

        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].completion_ratio, 1.0);
        assert_eq!(engine.record(), Some(&records[0]));
        assert_eq!(coach.cues().last(), Some(&VoiceCue::WorkoutComplete));
    }

    #[test]
    fn completion_ratio_with_skips() {
        let (mut engine, _, store) = start(&[30, 45, 60, 45, 60], 15);

        tick_n(&mut engine, 30 + 15); // 0 done naturally
        tick_n(&mut engine, 45 + 15); // 1 done naturally
        engine.skip().unwrap(); // 2 skipped
        tick_n(&mut engine, 15);
        tick_n(&mut engine, 45 + 15); // 3 done naturally
        engine.skip().unwrap(); // 4 skipped, last

        assert_eq!(engine.phase(), Phase::Completed);
        let record = &store.records()[0];
        assert_eq!(record.completed, BTreeSet::from([0, 1, 3]));
        assert_eq!(record.skipped, BTreeSet::from([2, 4]));
        assert!((record.completion_ratio - 0.6).abs() < f64::EPSILON);
        assert_eq!(record.total_exercises, 5);
    }

    #[test]
    fn halfway_fires_once_at_half() {
        let (mut engine, coach, _) = start(&[30, 45], 15);
        let events = tick_n(&mut engine, 14);
        assert!(events.is_empty());
        assert_eq!(coach.halfway_count(), 0);

        let events = engine.tick();
        assert_eq!(engine.state().exercise_time_remaining, 15);
        assert!(matches!(
            events.as_slice(),
            [Event::HalfwayReached { remaining_secs: 15, .. }]
        ));

        tick_n(&mut engine, 15);
        assert_eq!(coach.halfway_count(), 1);
    }

    #[test]
    fn halfway_survives_pause_and_is_per_exercise() {
        let (mut engine, coach, _) = start(&[30, 45], 15);
        tick_n(&mut engine, 15);
        engine.pause().unwrap();
        tick_n(&mut engine, 5);
        engine.resume().unwrap();
        tick_n(&mut engine, 15 + 15);
        assert_eq!(coach.halfway_count(), 1);

        // 45s exercise: integer half is 22.
        tick_n(&mut engine, 23);
        assert_eq!(coach.halfway_count(), 2);
        assert_eq!(engine.state().exercise_time_remaining, 22);
    }

    #[test]
    fn pause_freezes_time_and_is_idempotent() {
        let (mut engine, _, _) = start(&[30], 15);
        tick_n(&mut engine, 5);
        let first = engine.pause().unwrap();
        assert_eq!(first.len(), 1);
        let before = engine.state().clone();

        assert!(engine.pause().unwrap().is_empty());
        tick_n(&mut engine, 10);
        assert_eq!(engine.state(), &before);

        assert_eq!(engine.resume().unwrap().len(), 1);
        assert!(engine.resume().unwrap().is_empty());
        engine.tick();
        assert_eq!(engine.state().total_elapsed_secs, 6);
    }

    #[test]
    fn skip_moves_to_rest_without_credit() {
        let (mut engine, coach, _) = start(&[30, 45], 15);
        tick_n(&mut engine, 3);
        let events = engine.skip().unwrap();
        assert_eq!(engine.phase(), Phase::Resting);
        assert_eq!(engine.state().rest_time_remaining, 15);
        assert!(engine.state().skipped.contains(&0));
        assert!(!engine.state().completed.contains(&0));
        assert_eq!(engine.state().total_elapsed_secs, 3);
        assert!(matches!(
            events.as_slice(),
            [Event::ExerciseSkipped { index: 0, .. }, Event::RestStarted { .. }]
        ));
        assert!(!coach
            .cues()
            .iter()
            .any(|c| matches!(c, VoiceCue::ExerciseComplete { .. })));
    }

    #[test]
    fn skip_on_last_exercise_completes() {
        let (mut engine, _, store) = start(&[30], 15);
        engine.skip().unwrap();
        assert_eq!(engine.phase(), Phase::Completed);
        assert_eq!(engine.state().current_index, 1);
        assert_eq!(store.records()[0].completion_ratio, 0.0);
    }

    #[test]
    fn skip_during_rest_is_invalid() {
        let (mut engine, _, _) = start(&[30, 45], 15);
        engine.complete_current().unwrap();
        assert_eq!(engine.phase(), Phase::Resting);
        assert_eq!(
            engine.skip(),
            Err(SessionError::InvalidTransition {
                command: "skip",
                phase: Phase::Resting
            })
        );
        assert!(matches!(
            engine.complete_current(),
            Err(SessionError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn complete_current_credits_exercise() {
        let (mut engine, coach, _) = start(&[30, 45], 15);
        tick_n(&mut engine, 10);
        engine.complete_current().unwrap();
        assert!(engine.state().completed.contains(&0));
        assert_eq!(engine.state().exercise_time_remaining, 0);
        assert_eq!(engine.phase(), Phase::Resting);
        assert!(coach
            .cues()
            .contains(&VoiceCue::ExerciseComplete { name: "Exercise 0".into() }));
        assert!(coach.cues().contains(&VoiceCue::RestStart { seconds: 15 }));
    }

    #[test]
    fn zero_rest_goes_straight_to_next_exercise() {
        let (mut engine, _, _) = start(&[2, 3], 0);
        tick_n(&mut engine, 2);
        assert_eq!(engine.phase(), Phase::Exercising);
        assert_eq!(engine.state().current_index, 1);
        assert_eq!(engine.state().exercise_time_remaining, 3);
    }

    #[test]
    fn cancel_mid_session_discards() {
        let (mut engine, _, store) = start(&[30, 45], 15);
        tick_n(&mut engine, 10);
        let events = engine.cancel().unwrap();
        assert_eq!(engine.phase(), Phase::Cancelled);
        assert!(matches!(
            events.as_slice(),
            [Event::SessionCancelled { total_elapsed_secs: 10, .. }]
        ));
        assert!(engine.record().is_none());
        assert!(store.records().is_empty());
    }

    #[test]
    fn terminal_engine_rejects_mutators() {
        let (mut engine, _, _) = start(&[30], 15);
        engine.cancel().unwrap();
        let before = engine.state().clone();

        assert!(engine.tick().is_empty());
        for result in [
            engine.pause(),
            engine.resume(),
            engine.skip(),
            engine.complete_current(),
            engine.cancel(),
        ] {
            assert_eq!(
                result,
                Err(SessionError::SessionTerminated {
                    phase: Phase::Cancelled
                })
            );
        }
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn routine_edits_after_start_do_not_leak_in() {
        let mut r = routine(&[30, 45], 15);
        let (engine, _) = SessionEngine::start(&r, Collaborators::detached()).unwrap();
        r.exercises.clear();
        r.exercises.push(Exercise::new("Other", 5, ExerciseCategory::Posture));
        assert_eq!(engine.state().exercises.len(), 2);
        assert_eq!(engine.current_exercise().unwrap().name, "Exercise 0");
    }

    #[test]
    fn companion_receives_workout_lifecycle() {
        let (link, mut peer, _inbound) = CompanionLink::pair();
        peer.set_reachable(true);
        let collaborators = Collaborators::new(
            Arc::new(SilentCoach),
            link.clone(),
            Box::new(MemoryStore::new()),
        );
        let (mut engine, _) = SessionEngine::start(&routine(&[2, 2], 1), collaborators).unwrap();
        engine.pause().unwrap();
        engine.resume().unwrap();
        tick_n(&mut engine, 2 + 1 + 2);

        let kinds: Vec<&str> = peer.drain().iter().map(|m| m.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                "startWorkout",
                "exerciseChange",
                "pauseWorkout",
                "resumeWorkout",
                "exerciseChange",
                "endWorkout",
            ]
        );
        assert!(!link.status().workout_active());
    }

    #[test]
    fn unreachable_companion_does_not_affect_timing() {
        let (link, mut peer, _inbound) = CompanionLink::pair();
        let collaborators = Collaborators::new(
            Arc::new(SilentCoach),
            link,
            Box::new(MemoryStore::new()),
        );
        let (mut engine, _) = SessionEngine::start(&routine(&[30, 45], 15), collaborators).unwrap();
        tick_n(&mut engine, 90);
        assert_eq!(engine.phase(), Phase::Completed);
        assert_eq!(engine.state().total_elapsed_secs, 90);
        assert!(peer.drain().is_empty());
    }

    #[test]
    fn formatted_clock() {
        let (mut engine, _, _) = start(&[90], 15);
        assert_eq!(engine.state().formatted_time_remaining(), "1:30");
        tick_n(&mut engine, 25);
        assert_eq!(engine.state().formatted_time_remaining(), "1:05");
        assert_eq!(engine.state().formatted_total_time(), "0:25");
    }
}
