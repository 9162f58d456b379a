//! Core error types for studybuddy-core.
//!
//! Errors only exist at the acceptance boundary: a bad configuration or a
//! malformed session plan is rejected before a tracker is built. Once the
//! tracking phase is running, invalid commands are no-ops, not errors.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for studybuddy-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session plan validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The scheduler loop is gone; commands can no longer be delivered
    #[error("Tracking phase has ended")]
    PhaseEnded,

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Home/config directory could not be prepared
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Session plan validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Empty collection
    #[error("Empty collection: {0}")]
    EmptyCollection(String),

    /// Plan has the wrong number of students or sessions
    #[error("Expected {expected} {collection}, found {found}")]
    CountMismatch {
        collection: String,
        expected: usize,
        found: usize,
    },

    /// A required text field is blank
    #[error("'{field}' must not be blank")]
    BlankField { field: String },

    /// Two students share an id
    #[error("Duplicate student id: {0}")]
    DuplicateId(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
