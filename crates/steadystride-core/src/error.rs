//! Core error types for steadystride-core.
//!
//! Engine errors are programmer errors surfaced to the caller; they are
//! never retried. Companion channel failures stop at the channel boundary
//! and only show up here when decoding inbound wire messages.

use std::path::PathBuf;
use thiserror::Error;

use crate::session::Phase;

/// Core error type for steadystride-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Session engine errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Companion wire errors
    #[error("Companion error: {0}")]
    Companion(#[from] CompanionError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the session engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Attempt to start a session on a routine with no exercises.
    #[error("routine has no exercises")]
    EmptyRoutine,

    /// An exercise in the routine cannot be timed.
    #[error("exercise {index} ('{name}') has a zero duration")]
    InvalidExercise { index: usize, name: String },

    /// Mutating call after the session reached Completed or Cancelled.
    #[error("session already terminated ({phase:?})")]
    SessionTerminated { phase: Phase },

    /// Command not valid in the current phase.
    #[error("cannot {command} while {phase:?}")]
    InvalidTransition { command: &'static str, phase: Phase },
}

/// Errors decoding messages received from the companion device.
#[derive(Error, Debug)]
pub enum CompanionError {
    /// Payload was not valid JSON or did not match a known shape.
    #[error("failed to decode companion message: {0}")]
    Decode(#[from] serde_json::Error),

    /// Payload carried a `type` this side does not handle.
    #[error("unknown companion message type: {0}")]
    UnknownMessageType(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Stored row could not be decoded
    #[error("Corrupt row {id}: {message}")]
    CorruptRow { id: String, message: String },

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Config file exists but could not be read
    #[error("Failed to read configuration at {path}: {message}")]
    ReadFailed { path: PathBuf, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
