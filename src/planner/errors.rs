//! Planner error types
//!
//! Error codes:
//! - AERO_QUERY_INVALID (malformed criteria)
//! - AERO_QUERY_INVALID_OPTIONS (bad sort/skip/limit)

use thiserror::Error;

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

/// Planner errors; every variant rejects the query before execution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlannerError {
    #[error("malformed criteria at '{path}': {reason}")]
    MalformedCriteria { path: String, reason: String },

    #[error("invalid find options: {0}")]
    InvalidOptions(String),
}

impl PlannerError {
    pub fn malformed(path: &str, reason: impl Into<String>) -> Self {
        let path = if path.is_empty() { "<root>" } else { path };
        PlannerError::MalformedCriteria {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PlannerError::MalformedCriteria { .. } => "AERO_QUERY_INVALID",
            PlannerError::InvalidOptions(_) => "AERO_QUERY_INVALID_OPTIONS",
        }
    }
}
