//! Error types for SkipKV
//!
//! Provides a unified error type for all engine operations.

use thiserror::Error;

/// Result type alias using SkipKvError
pub type Result<T> = std::result::Result<T, SkipKvError>;

/// Unified error type for SkipKV operations
#[derive(Debug, Error)]
pub enum SkipKvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Snapshot Errors
    // -------------------------------------------------------------------------
    #[error("Snapshot corruption detected: {0}")]
    SnapshotCorrupt(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Keyspace Errors
    // -------------------------------------------------------------------------
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongKind,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Engine is shut down")]
    Shutdown,
}

impl From<bincode::Error> for SkipKvError {
    fn from(e: bincode::Error) -> Self {
        SkipKvError::Serialization(e.to_string())
    }
}
