//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Session timing (default rest, tick interval, catch-up policy)
//! - Voice coaching
//! - Companion sync
//! - User-defined routines
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::routine::{Exercise, Routine, RoutineLibrary};
use crate::session::VoiceSpeed;

/// Session timing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Rest for custom routines that do not set their own.
    #[serde(default = "default_rest_secs")]
    pub default_rest_secs: u64,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Deliver late ticks in a burst instead of dropping them.
    #[serde(default)]
    pub catch_up_missed_ticks: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub speed: VoiceSpeed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Push streak/weekly progress after each completed session.
    #[serde(default = "default_true")]
    pub sync_progress_on_complete: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub companion: CompanionConfig,
    #[serde(default)]
    pub custom_routines: Vec<CustomRoutine>,
}

/// User-defined routine as written in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomRoutine {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Falls back to `session.default_rest_secs`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_secs: Option<u64>,
    pub exercises: Vec<Exercise>,
}

impl CustomRoutine {
    pub fn to_routine(&self, default_rest_secs: u64) -> Routine {
        Routine {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            rest_secs: self.rest_secs.unwrap_or(default_rest_secs),
            exercises: self.exercises.clone(),
        }
    }
}

fn default_rest_secs() -> u64 {
    15
}
fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_true() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_rest_secs: default_rest_secs(),
            tick_interval_ms: default_tick_interval_ms(),
            catch_up_missed_ticks: false,
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            speed: VoiceSpeed::Normal,
        }
    }
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sync_progress_on_complete: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            voice: VoiceConfig::default(),
            companion: CompanionConfig::default(),
            custom_routines: Vec::new(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => value
                    .parse::<u64>()
                    .map(|n| serde_json::Value::Number(n.into()))
                    .map_err(|_| invalid(format!("cannot parse '{value}' as a whole number")))?,
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                _ => serde_json::Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    fn path_in(dir: &Path) -> PathBuf {
        dir.join("config.toml")
    }

    /// Load from disk, writing defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed, or if the default config cannot be written to disk. An
    /// unreadable file is left untouched.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_from(&data_dir()?)
    }

    /// Same as [`Config::load`] against an explicit directory.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_from(dir: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let path = Self::path_in(dir);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)
                    .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(dir)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::ReadFailed {
                path,
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&data_dir()?)
    }

    /// # Errors
    ///
    /// See [`Config::save`].
    pub fn save_to(&self, dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(Self::path_in(dir), content)?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Change a value in memory. The new value must have the same shape as
    /// the one it replaces and the resulting config must still deserialize.
    ///
    /// # Errors
    ///
    /// `UnknownKey` or `InvalidValue`.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
        self.apply(key, value)?;
        self.save()?;
        Ok(())
    }

    /// Built-in routines merged with the user's own.
    pub fn routine_library(&self) -> RoutineLibrary {
        let custom: Vec<Routine> = self
            .custom_routines
            .iter()
            .map(|r| r.to_routine(self.session.default_rest_secs))
            .collect();
        RoutineLibrary::with_custom(&custom)
    }

    /// Flattened `key = value` pairs for every scalar setting.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }
}
