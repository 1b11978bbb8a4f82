//! Executor error types
//!
//! Error codes:
//! - AERO_EXECUTION_INVALID_PLAN (plan does not fit the schema or filter)
//! - AERO_INDEX_* / AERO_TEXT_* (forwarded from index streams)

use thiserror::Error;

use crate::index::IndexError;

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutorError {
    /// An index stream or batch fetch failed; no partial result is returned
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("invalid plan: {0}")]
    InvalidPlan(String),
}

impl ExecutorError {
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorError::Index(err) => err.code(),
            ExecutorError::InvalidPlan(_) => "AERO_EXECUTION_INVALID_PLAN",
        }
    }
}
