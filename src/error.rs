//! Error types for tlogkv
//!
//! Provides a unified error type for all operations.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using TlogError
pub type Result<T> = std::result::Result<T, TlogError>;

/// Unified error type for tlogkv operations
#[derive(Debug, Error)]
pub enum TlogError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transaction log did not drain within {0:?}")]
    ShutdownTimeout(Duration),

    // -------------------------------------------------------------------------
    // Replay Errors
    // -------------------------------------------------------------------------
    #[error("input parse error at line {line}: {reason}")]
    Parse { line: u64, reason: String },

    #[error("transaction numbers out of sequence at line {line}: {found} follows {previous}")]
    Sequence { line: u64, previous: u64, found: u64 },

    // -------------------------------------------------------------------------
    // Transaction Log Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("transaction log writer is not running")]
    NotRunning,

    #[error("transaction log writer stopped after a write failure")]
    WriterStopped,

    #[error("invalid transaction log state: {0}")]
    InvalidState(String),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    KeyNotFound,

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TlogError {
    /// Whether this error means the log's history cannot be trusted
    ///
    /// Replay failures of this kind must stop the service from starting.
    pub fn is_integrity_error(&self) -> bool {
        matches!(self, TlogError::Parse { .. } | TlogError::Sequence { .. })
    }
}
