use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time view of the companion link.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub reachable: bool,
    /// Latest heart rate reported by the companion; no history is kept.
    pub heart_rate: Option<f64>,
    pub workout_active: bool,
    pub last_sync: Option<DateTime<Utc>>,
}

/// Process-wide companion state.
///
/// Written only by the channel, read by the engine side and the
/// presentation layer. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct CompanionStatus {
    inner: Arc<RwLock<StatusSnapshot>>,
}

impl CompanionStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.read().clone()
    }

    pub fn is_reachable(&self) -> bool {
        self.read().reachable
    }

    pub fn heart_rate(&self) -> Option<f64> {
        self.read().heart_rate
    }

    pub fn workout_active(&self) -> bool {
        self.read().workout_active
    }

    pub(crate) fn set_reachable(&self, reachable: bool) {
        self.write().reachable = reachable;
    }

    pub(crate) fn set_heart_rate(&self, bpm: f64) {
        self.write().heart_rate = Some(bpm);
    }

    pub(crate) fn set_workout_active(&self, active: bool) {
        self.write().workout_active = active;
    }

    pub(crate) fn mark_synced(&self, at: DateTime<Utc>) {
        self.write().last_sync = Some(at);
    }

    // A panicked writer cannot leave the plain-data snapshot half-updated.
    fn read(&self) -> RwLockReadGuard<'_, StatusSnapshot> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StatusSnapshot> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}
