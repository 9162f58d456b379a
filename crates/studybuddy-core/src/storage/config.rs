//! TOML-based session configuration.
//!
//! Holds the parameters the setup flow hands to the tracker:
//! - How many students and how many study sessions each
//! - Study and break lengths in minutes
//! - Which alert sound plays when a break ends
//!
//! Configuration is stored at `~/.config/studybuddy/config.toml`.

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;

/// Largest custom alert payload accepted, in bytes.
pub const MAX_CUSTOM_SOUND_BYTES: usize = 2 * 1024 * 1024;

/// Alert played when a break runs out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundType {
    #[default]
    Classic,
    Bell,
    Digital,
    Buzzer,
    Custom,
}

impl SoundType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoundType::Classic => "classic",
            SoundType::Bell => "bell",
            SoundType::Digital => "digital",
            SoundType::Buzzer => "buzzer",
            SoundType::Custom => "custom",
        }
    }
}

impl std::fmt::Display for SoundType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SoundType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classic" => Ok(SoundType::Classic),
            "bell" => Ok(SoundType::Bell),
            "digital" => Ok(SoundType::Digital),
            "buzzer" => Ok(SoundType::Buzzer),
            "custom" => Ok(SoundType::Custom),
            other => Err(ConfigError::InvalidValue {
                key: "sound_type".into(),
                message: format!("unknown sound '{other}'"),
            }),
        }
    }
}

/// Session configuration.
///
/// Serialized to/from TOML. A `Config` must pass [`Config::validate`] before
/// a tracker is built from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_num_kids")]
    pub num_kids: u32,
    #[serde(default = "default_num_sessions")]
    pub num_sessions: u32,
    #[serde(default = "default_study_duration")]
    pub study_duration_minutes: u32,
    #[serde(default = "default_break_duration")]
    pub break_duration_minutes: u32,
    #[serde(default)]
    pub sound_type: SoundType,
    /// Opaque audio payload for [`SoundType::Custom`] (e.g. a base64 data URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_sound_data: Option<String>,
}

fn default_num_kids() -> u32 {
    1
}
fn default_num_sessions() -> u32 {
    3
}
fn default_study_duration() -> u32 {
    25
}
fn default_break_duration() -> u32 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_kids: default_num_kids(),
            num_sessions: default_num_sessions(),
            study_duration_minutes: default_study_duration(),
            break_duration_minutes: default_break_duration(),
            sound_type: SoundType::Classic,
            custom_sound_data: None,
        }
    }
}

impl Config {
    /// Check every field against its lower bound and the custom payload
    /// against [`MAX_CUSTOM_SOUND_BYTES`].
    ///
    /// # Errors
    ///
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let counts = [
            ("num_kids", self.num_kids),
            ("num_sessions", self.num_sessions),
            ("study_duration_minutes", self.study_duration_minutes),
            ("break_duration_minutes", self.break_duration_minutes),
        ];
        for (key, value) in counts {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: "must be at least 1".into(),
                });
            }
        }

        if let Some(data) = &self.custom_sound_data {
            if data.len() > MAX_CUSTOM_SOUND_BYTES {
                return Err(ConfigError::InvalidValue {
                    key: "custom_sound_data".into(),
                    message: format!(
                        "payload is {} bytes, limit is {MAX_CUSTOM_SOUND_BYTES}",
                        data.len()
                    ),
                });
            }
        }
        Ok(())
    }

    /// Study period length in seconds.
    pub fn study_secs(&self) -> u32 {
        self.study_duration_minutes.saturating_mul(60)
    }

    /// Break period length in seconds.
    pub fn break_secs(&self) -> u32 {
        self.break_duration_minutes.saturating_mul(60)
    }

    /// The sound an alert should actually play.
    ///
    /// `Custom` without a payload falls back to `Classic`.
    pub fn alert_sound(&self) -> (SoundType, Option<&str>) {
        match (self.sound_type, self.custom_sound_data.as_deref()) {
            (SoundType::Custom, Some(data)) if !data.is_empty() => (SoundType::Custom, Some(data)),
            (SoundType::Custom, _) => (SoundType::Classic, None),
            (other, _) => (other, None),
        }
    }

    fn set_json_value_by_key(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        if key.is_empty() {
            return Err(ConfigError::UnknownKey(String::new()));
        }
        let obj = root
            .as_object_mut()
            .ok_or_else(|| ConfigError::UnknownKey(key.into()))?;

        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.into(),
            message,
        };

        let new_value = match key {
            // Optional field: absent from the JSON form when unset.
            "custom_sound_data" if value.is_empty() => serde_json::Value::Null,
            "custom_sound_data" => serde_json::Value::String(value.into()),
            _ => {
                let existing = obj
                    .get(key)
                    .ok_or_else(|| ConfigError::UnknownKey(key.into()))?;
                match existing {
                    serde_json::Value::Number(_) => value
                        .trim()
                        .parse::<u32>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as a count")))?,
                    serde_json::Value::Bool(_) => value
                        .trim()
                        .parse::<bool>()
                        .map(serde_json::Value::Bool)
                        .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    _ => serde_json::Value::String(value.trim().to_lowercase()),
                }
            }
        };

        obj.insert(key.to_string(), new_value);
        Ok(())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// fails validation, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults there if it is missing.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`].
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Read and validate a config file without writing anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or fails
    /// validation.
    pub fn read_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        if key == "custom_sound_data" {
            return Some(self.custom_sound_data.clone().unwrap_or_default());
        }
        match json.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Apply a value by key in memory, re-validating the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the resulting config is invalid. `self` is untouched on error.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_key(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| {
            ConfigError::InvalidValue {
                key: key.into(),
                message: e.to_string(),
            }
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if [`Config::apply`] fails or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }
}
