//! Error types for the UniParc index tools
//!
//! Every variant is written to be read by an operator watching a long bulk
//! run: it says what failed and what to do about it.

use std::fmt::Display;
use std::path::Path;
use thiserror::Error;

/// Result type alias for index operations
pub type Result<T> = std::result::Result<T, IndexError>;

/// Error type shared by the store, the loader and the query tool
#[derive(Error, Debug)]
pub enum IndexError {
    /// The persistent store could not be opened (bad path, missing file,
    /// lock held by another process, not an index file, permissions).
    #[error("Cannot open store '{path}': {reason}. Check that the path is valid and readable, and that no other process has the store open.")]
    StoreOpen { path: String, reason: String },

    /// A loader input line does not have exactly two whitespace-separated fields.
    #[error("Malformed input at line {line}: expected '<external_id> <content_hash>', got {content:?}. Fix the input or rerun with --skip-malformed.")]
    MalformedInput { line: u64, content: String },

    /// The store could not be committed or closed cleanly.
    #[error("Failed to close store '{path}': {reason}. The index may not be durably written; rebuild it from scratch.")]
    StoreClose { path: String, reason: String },

    /// A write was attempted on a store opened read-only.
    #[error("Store '{0}' is open read-only")]
    ReadOnly(String),

    /// Underlying storage engine failure during a read or write
    #[error("Store operation failed: {0}")]
    Store(#[from] rusqlite::Error),

    /// Reading input or writing output failed
    #[error("I/O failed: {0}. Check the input stream, output pipe and disk space.")]
    Io(#[from] std::io::Error),

    /// Invalid option values
    #[error("Configuration error: {0}")]
    Config(String),

    /// The JSON run summary could not be produced
    #[error("Failed to serialize run summary: {0}")]
    Summary(#[from] serde_json::Error),
}

impl IndexError {
    /// Create a store open error
    pub fn store_open(path: &Path, reason: impl Display) -> Self {
        Self::StoreOpen {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a store close error
    pub fn store_close(path: &Path, reason: impl Display) -> Self {
        Self::StoreClose {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a malformed input error, decoding the raw line lossily
    pub fn malformed_input(line: u64, raw: &[u8]) -> Self {
        let content = String::from_utf8_lossy(raw)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        Self::MalformedInput { line, content }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for the failures that happen before any record is touched
    pub fn is_store_open(&self) -> bool {
        matches!(self, Self::StoreOpen { .. })
    }
}
