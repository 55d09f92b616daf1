//! Error types for the telemetry tracker

use thiserror::Error;

/// Result type for telemetry operations
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Telemetry error types
///
/// None of these reach the UI at runtime: the store and the audio task
/// convert them into defaults or no-ops at their own boundary.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// Backend read/write failed (quota exceeded, security error, ...)
    #[error("Storage error: {0}")]
    Storage(String),

    /// No key-value storage is available in this context
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Stored blob parsed but is not a record
    #[error("Malformed interaction record: {0}")]
    MalformedRecord(String),

    /// Audio context failed to start
    #[error("Audio error: {0}")]
    Audio(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Detached task could not be spawned
    #[error("Spawn error: {0}")]
    Spawn(String),
}

impl From<serde_json::Error> for TelemetryError {
    fn from(err: serde_json::Error) -> Self {
        TelemetryError::Serialization(err.to_string())
    }
}

impl From<futures::task::SpawnError> for TelemetryError {
    fn from(err: futures::task::SpawnError) -> Self {
        TelemetryError::Spawn(err.to_string())
    }
}
