//! Core error types for studytrack-core.
//!
//! Validation failures are raised before any state changes. Reference
//! failures (a subject or exam that disappeared under a concurrent edit) are
//! not errors at all: they are logged and skipped by the synchronizer.

use std::path::PathBuf;
use thiserror::Error;

use crate::storage::EntityKind;

/// Core error type for studytrack-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The profile record does not exist in the store
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// Another activation of the same profile is still running
    #[error("Activation already in progress for profile {0}")]
    ActivationInProgress(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by a [`Store`](crate::storage::Store) implementation.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the database
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// `update` targeted a record that is not stored
    #[error("{kind} record not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// The record is not a JSON object or lacks a usable key
    #[error("Malformed {kind} record: {message}")]
    Malformed { kind: EntityKind, message: String },

    /// Write rejected by the backend
    #[error("Write to {kind} rejected: {message}")]
    WriteRejected { kind: EntityKind, message: String },
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

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    /// A required text field was empty after trimming
    #[error("'{field}' must not be empty")]
    EmptyField { field: &'static str },

    /// Task duration must be positive
    #[error("Task duration must be greater than zero (got {0})")]
    NonPositiveDuration(i64),

    /// Recurring reminder weekday outside 0..=6
    #[error("Weekday {0} is out of range (0=Sunday .. 6=Saturday)")]
    InvalidWeekday(u8),

    /// Marks outside 0..=100
    #[error("Marks must be between 0 and 100 (got {0})")]
    InvalidMarks(f64),

    /// A subject with the same name already exists
    #[error("Subject '{0}' already exists")]
    DuplicateSubject(String),

    /// Subject and chapter must be given together
    #[error("A task with a chapter must also name its subject")]
    ChapterWithoutSubject,

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseBusy
                    || err.code == rusqlite::ErrorCode::DatabaseLocked
                {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
