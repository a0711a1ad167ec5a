//! Core error types for bartomato-core.
//!
//! Every failure falls into one of three recoverable categories: a command
//! that is not legal from the current phase, a rejected configuration, or a
//! collaborator (vault, stats persistence) that could not do its job. None of
//! them leaves the engine in a partially-updated state.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::{Command, TimerPhase};

/// Core error type for bartomato-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The command is not legal from the current phase. No state was changed.
    #[error("cannot {command} while timer is {phase}")]
    InvalidTransition { command: Command, phase: TimerPhase },

    /// The configuration was rejected. The previous configuration is kept.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// A vault scan or stats persistence call failed.
    #[error("collaborator unavailable: {0}")]
    CollaboratorUnavailable(#[from] CollaboratorError),
}

impl CoreError {
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, CoreError::InvalidTransition { .. })
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Failures of the external collaborators around the engine.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("Vault not configured")]
    VaultNotConfigured,

    #[error("Invalid vault at {path}: {reason}")]
    InvalidVault { path: PathBuf, reason: String },

    #[error("Vault I/O error at {path}: {source}")]
    VaultIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Daily note exists but has no section to write into
    #[error("Could not find '{section}' section in {path}")]
    MissingSection { path: PathBuf, section: String },

    #[error("Invalid vault pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Stats database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Stats worker has shut down")]
    StatsWorkerClosed,

    #[error("Failed to start stats worker: {0}")]
    StatsWorkerSpawn(#[source] std::io::Error),

    #[error("Failed to encode engine snapshot: {0}")]
    Snapshot(#[source] serde_json::Error),

    #[error("Data directory unavailable: {0}")]
    DataDir(#[source] std::io::Error),
}

impl CollaboratorError {
    pub(crate) fn vault_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CollaboratorError::VaultIo {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
