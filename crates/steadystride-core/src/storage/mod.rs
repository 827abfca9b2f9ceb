mod config;
pub mod database;

pub use config::{CompanionConfig, Config, CustomRoutine, SessionConfig, VoiceConfig};
pub use database::{Database, Stats};

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// `STEADYSTRIDE_HOME` wins when set. Otherwise `~/.config/steadystride[-dev]/`
/// based on `STEADYSTRIDE_ENV` (set it to `dev` for the development directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let dir = match std::env::var_os("STEADYSTRIDE_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env =
                std::env::var("STEADYSTRIDE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("steadystride-dev")
            } else {
                base_dir.join("steadystride")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
