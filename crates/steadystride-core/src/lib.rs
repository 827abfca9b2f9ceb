//! # SteadyStride Core Library
//!
//! Guided balance and mobility workouts for older adults, with a companion
//! wearable kept in sync. All logic lives here; the `steadystride` CLI is a
//! thin presentation layer over the same library.
//!
//! ## Architecture
//!
//! - **Session Engine**: an integer-second state machine driven by an
//!   external `tick()`, with voice, companion and persistence injected
//! - **Session Actor**: one tokio task that serializes ticks, user commands
//!   and inbound companion messages into the engine
//! - **Companion**: JSON wire messages and a best-effort channel to the
//!   wearable
//! - **Storage**: SQLite session history and TOML configuration
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: workout state machine
//! - [`SessionActor`]: serialized mailbox around the engine
//! - [`CompanionLink`]: in-process companion channel
//! - [`Database`]: session history and statistics
//! - [`Config`]: application configuration

pub mod companion;
pub mod error;
pub mod events;
pub mod progress;
pub mod routine;
pub mod session;
pub mod storage;

pub use companion::{CompanionChannel, CompanionLink, CompanionPeer, CompanionStatus};
pub use error::{CompanionError, ConfigError, CoreError, DatabaseError, SessionError};
pub use events::Event;
pub use progress::{Achievement, AchievementKind, ProgressContext};
pub use routine::{Exercise, ExerciseCategory, Routine, RoutineLibrary};
pub use session::{
    Collaborators, Phase, SessionActor, SessionEngine, SessionHandle, SessionRecord,
    SessionState, Ticker,
};
pub use storage::{Config, Database, Stats};
