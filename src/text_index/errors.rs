//! Text index error types
//!
//! Error codes:
//! - AERO_TEXT_NOT_LOADED
//! - AERO_TEXT_LOAD_FAILED
//! - AERO_TEXT_INVALID_OPTIONS
//! - AERO_TEXT_INVALID_CHUNK_SIZE
//! - AERO_TEXT_SNAPSHOT_CORRUPT

use thiserror::Error;

/// Result type for text index operations
pub type TextIndexResult<T> = Result<T, TextIndexError>;

/// Text index errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextIndexError {
    /// A lazy index was queried with no loader available
    #[error("text index '{index}': backing data not loaded")]
    NotLoaded { index: String },

    /// The loader rejected; the index stays unloaded
    #[error("text index '{index}': load failed: {reason}")]
    LoadFailure { index: String, reason: String },

    /// Options rejected at construction
    #[error("invalid text index options: {0}")]
    InvalidOptions(String),

    /// `spread` needs a positive chunk size
    #[error("invalid chunk size {0}: must be at least 1")]
    InvalidChunkSize(usize),

    /// Snapshot bytes failed checksum or decoding
    #[error("corrupt snapshot: {0}")]
    SnapshotCorrupt(String),
}

impl TextIndexError {
    pub(crate) fn not_loaded(index: &str) -> Self {
        TextIndexError::NotLoaded {
            index: index.to_string(),
        }
    }

    pub(crate) fn load_failure(index: &str, reason: impl Into<String>) -> Self {
        TextIndexError::LoadFailure {
            index: index.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            TextIndexError::NotLoaded { .. } => "AERO_TEXT_NOT_LOADED",
            TextIndexError::LoadFailure { .. } => "AERO_TEXT_LOAD_FAILED",
            TextIndexError::InvalidOptions(_) => "AERO_TEXT_INVALID_OPTIONS",
            TextIndexError::InvalidChunkSize(_) => "AERO_TEXT_INVALID_CHUNK_SIZE",
            TextIndexError::SnapshotCorrupt(_) => "AERO_TEXT_SNAPSHOT_CORRUPT",
        }
    }
}
