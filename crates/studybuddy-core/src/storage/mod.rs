//! Persistence for the setup collaborator's preferences.
//!
//! Only the configuration record is stored. Timer state never touches disk.

mod config;

pub use config::{Config, SoundType, MAX_CUSTOM_SOUND_BYTES};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the StudyBuddy data directory.
///
/// `STUDYBUDDY_HOME` wins when set. Otherwise `~/.config/studybuddy[-dev]/`
/// based on `STUDYBUDDY_ENV` (set it to `dev` for the development directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("STUDYBUDDY_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env =
                std::env::var("STUDYBUDDY_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("studybuddy-dev")
            } else {
                base_dir.join("studybuddy")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(e.to_string()))?;
    Ok(dir)
}
