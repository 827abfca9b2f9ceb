//! Guided workout sessions.
//!
//! The engine is a plain state machine; the actor gives it a clock and a
//! mailbox.

mod actor;
mod cue;
mod engine;
mod record;

pub use actor::{SessionActor, SessionControl, SessionHandle, Ticker};
pub use cue::{SilentCoach, SpokenCoach, VoiceCoach, VoiceCue, VoiceSpeed};
pub use engine::{Collaborators, Phase, SessionEngine, SessionState};
pub use record::{MemoryStore, SessionRecord, SessionStore, SUCCESS_RATIO};
