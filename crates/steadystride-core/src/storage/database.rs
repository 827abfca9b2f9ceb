//! SQLite-based session storage and statistics.
//!
//! Provides persistent storage for:
//! - Completed workout sessions (one row per [`SessionRecord`])
//! - Session statistics (daily and all-time)
//! - Active days for streak and weekly progress

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use indoc::indoc;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::data_dir;
use crate::error::{CoreError, DatabaseError};
use crate::progress::ProgressContext;
use crate::session::{SessionRecord, SessionStore, SUCCESS_RATIO};

const DB_FILE: &str = "steadystride.db";

const SCHEMA: &str = indoc! {"
    CREATE TABLE IF NOT EXISTS sessions (
        id                 TEXT PRIMARY KEY,
        routine_id         TEXT NOT NULL,
        routine_name       TEXT NOT NULL DEFAULT '',
        total_exercises    INTEGER NOT NULL,
        completed          TEXT NOT NULL,
        skipped            TEXT NOT NULL,
        completed_count    INTEGER NOT NULL,
        total_elapsed_secs INTEGER NOT NULL,
        completion_ratio   REAL NOT NULL,
        started_at         TEXT NOT NULL,
        ended_at           TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_sessions_ended_at ON sessions(ended_at);
    CREATE INDEX IF NOT EXISTS idx_sessions_routine_id ON sessions(routine_id);
"};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Stats {
    pub total_sessions: u64,
    /// Sessions at or above the success ratio.
    pub successful_sessions: u64,
    pub total_minutes: u64,
    pub exercises_completed: u64,
    pub today_sessions: u64,
    pub today_minutes: u64,
}

/// SQLite database for completed sessions.
pub struct Database {
    conn: Connection,
}

struct RawRow {
    id: String,
    routine_id: String,
    routine_name: String,
    total_exercises: u64,
    completed: String,
    skipped: String,
    total_elapsed_secs: u64,
    completion_ratio: f64,
    started_at: String,
    ended_at: String,
}

impl Database {
    /// Open the database at `<data_dir>/steadystride.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        Self::open_in(&data_dir()?)
    }

    /// Open `steadystride.db` inside `dir`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_in(dir: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let path = dir.join(DB_FILE);
        let conn = Connection::open(&path)
            .map_err(|source| DatabaseError::OpenFailed { path, source })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    #[cfg(test)]
    pub fn open_memory() -> Result<Self, Box<dyn std::error::Error>> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Insert a completed session. Saving the same record twice is a no-op.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_session(&self, record: &SessionRecord) -> Result<(), DatabaseError> {
        let completed = serde_json::to_string(&record.completed)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        let skipped = serde_json::to_string(&record.skipped)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        self.conn.execute(
            "INSERT OR IGNORE INTO sessions (
                id, routine_id, routine_name, total_exercises, completed, skipped,
                completed_count, total_elapsed_secs, completion_ratio, started_at, ended_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.id.to_string(),
                record.routine_id,
                record.routine_name,
                record.total_exercises as u64,
                completed,
                skipped,
                record.completed.len() as u64,
                record.total_elapsed_secs,
                record.completion_ratio,
                record.started_at.to_rfc3339(),
                record.ended_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Most recent sessions first.
    ///
    /// # Errors
    /// Query failure, or `CorruptRow` if a stored row cannot be decoded.
    pub fn list_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, DatabaseError> {
        self.select_sessions(i64::try_from(limit).unwrap_or(i64::MAX))
    }

    /// Every stored session, most recent first.
    ///
    /// # Errors
    /// See [`Database::list_sessions`].
    pub fn all_sessions(&self) -> Result<Vec<SessionRecord>, DatabaseError> {
        // A negative LIMIT means no limit in SQLite.
        self.select_sessions(-1)
    }

    fn select_sessions(&self, limit: i64) -> Result<Vec<SessionRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, routine_id, routine_name, total_exercises, completed, skipped,
                    total_elapsed_secs, completion_ratio, started_at, ended_at
             FROM sessions
             ORDER BY ended_at DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(RawRow {
                id: row.get(0)?,
                routine_id: row.get(1)?,
                routine_name: row.get(2)?,
                total_exercises: row.get(3)?,
                completed: row.get(4)?,
                skipped: row.get(5)?,
                total_elapsed_secs: row.get(6)?,
                completion_ratio: row.get(7)?,
                started_at: row.get(8)?,
                ended_at: row.get(9)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(decode_row(row?)?);
        }
        Ok(records)
    }

    /// Distinct UTC days on which a session ended.
    ///
    /// Same day boundary as [`Database::stats_today`].
    ///
    /// # Errors
    /// Query failure, or `CorruptRow` for an unparseable timestamp.
    pub fn session_dates(&self) -> Result<BTreeSet<NaiveDate>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT substr(ended_at, 1, 10) FROM sessions")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut dates = BTreeSet::new();
        for row in rows {
            let day = row?;
            let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d").map_err(|e| {
                DatabaseError::CorruptRow {
                    id: day.clone(),
                    message: e.to_string(),
                }
            })?;
            dates.insert(date);
        }
        Ok(dates)
    }

    /// Streak and weekly map as of `today`.
    ///
    /// # Errors
    /// See [`Database::session_dates`].
    pub fn progress_context(&self, today: NaiveDate) -> Result<ProgressContext, DatabaseError> {
        Ok(ProgressContext::from_dates(self.session_dates()?, today))
    }

    pub fn stats_today(&self) -> Result<Stats, DatabaseError> {
        let since = today_start();
        let (sessions, successful, minutes, exercises) = self.aggregate(Some(since.as_str()))?;
        Ok(Stats {
            total_sessions: sessions,
            successful_sessions: successful,
            total_minutes: minutes,
            exercises_completed: exercises,
            today_sessions: sessions,
            today_minutes: minutes,
        })
    }

    pub fn stats_all(&self) -> Result<Stats, DatabaseError> {
        let (sessions, successful, minutes, exercises) = self.aggregate(None)?;
        let since = today_start();
        let (today_sessions, _, today_minutes, _) = self.aggregate(Some(since.as_str()))?;
        Ok(Stats {
            total_sessions: sessions,
            successful_sessions: successful,
            total_minutes: minutes,
            exercises_completed: exercises,
            today_sessions,
            today_minutes,
        })
    }

    fn aggregate(&self, since: Option<&str>) -> Result<(u64, u64, u64, u64), DatabaseError> {
        let row = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(completion_ratio >= ?1), 0),
                    COALESCE(SUM((total_elapsed_secs + 30) / 60), 0),
                    COALESCE(SUM(completed_count), 0)
             FROM sessions
             WHERE ?2 IS NULL OR ended_at >= ?2",
            params![SUCCESS_RATIO, since],
            |row| {
                Ok((
                    row.get::<_, u64>(0)?,
                    row.get::<_, u64>(1)?,
                    row.get::<_, u64>(2)?,
                    row.get::<_, u64>(3)?,
                ))
            },
        )?;
        Ok(row)
    }
}

impl SessionStore for Database {
    fn save_session(&self, record: &SessionRecord) -> Result<(), CoreError> {
        self.record_session(record)?;
        tracing::debug!(session = %record.id, "session record stored");
        Ok(())
    }
}

fn today_start() -> String {
    let today = Utc::now().format("%Y-%m-%d").to_string();
    format!("{today}T00:00:00+00:00")
}

fn decode_row(raw: RawRow) -> Result<SessionRecord, DatabaseError> {
    let corrupt = |message: String| DatabaseError::CorruptRow {
        id: raw.id.clone(),
        message,
    };
    let timestamp = |s: &str| {
        DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| corrupt(e.to_string()))
    };

    Ok(SessionRecord {
        id: Uuid::parse_str(&raw.id).map_err(|e| corrupt(e.to_string()))?,
        routine_id: raw.routine_id.clone(),
        routine_name: raw.routine_name.clone(),
        total_exercises: raw.total_exercises as usize,
        completed: serde_json::from_str(&raw.completed).map_err(|e| corrupt(e.to_string()))?,
        skipped: serde_json::from_str(&raw.skipped).map_err(|e| corrupt(e.to_string()))?,
        total_elapsed_secs: raw.total_elapsed_secs,
        started_at: timestamp(&raw.started_at)?,
        ended_at: timestamp(&raw.ended_at)?,
        completion_ratio: raw.completion_ratio,
    })
}
