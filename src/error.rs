//! Error types for LogKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using LogKvError
pub type Result<T> = std::result::Result<T, LogKvError>;

/// Unified error type for LogKV operations
#[derive(Debug, Error)]
pub enum LogKvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Log Errors
    // -------------------------------------------------------------------------
    /// A complete record could not be decoded, or holds the wrong key
    #[error("Log corruption at offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },

    /// A record that starts inside the log but runs to or past its end
    #[error("Torn entry at offset {offset}: {reason}")]
    TornEntry { offset: u64, reason: String },

    /// Read at or beyond the logical end of the log
    #[error("End of log at offset {offset}")]
    EndOfLog { offset: u64 },

    #[error("Entry too large: {size} bytes does not fit in a u32 length field")]
    EntryTooLarge { size: usize },

    // -------------------------------------------------------------------------
    // Engine Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    KeyNotFound,

    #[error("Invalid log: engine has no open log file")]
    InvalidLog,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LogKvError {
    /// Shorthand for building a `Corruption` error
    pub(crate) fn corruption(offset: u64, reason: impl Into<String>) -> Self {
        LogKvError::Corruption {
            offset,
            reason: reason.into(),
        }
    }

    /// Re-anchor a `Corruption` error at the given log offset
    pub(crate) fn at_offset(self, offset: u64) -> Self {
        match self {
            LogKvError::Corruption { reason, .. } => LogKvError::Corruption { offset, reason },
            other => other,
        }
    }

    /// True for the end-of-log signal that terminates a forward scan
    pub fn is_end_of_log(&self) -> bool {
        matches!(self, LogKvError::EndOfLog { .. })
    }
}
