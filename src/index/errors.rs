//! Index error types
//!
//! Error codes:
//! - AERO_INDEX_UNSUPPORTED_OPERATOR
//! - AERO_INDEX_INVALID_VALUE
//! - AERO_INDEX_MISSING_KEY
//! - AERO_INDEX_BACKEND
//! - AERO_TEXT_* (forwarded from the text index)

use thiserror::Error;

use crate::text_index::TextIndexError;

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors raised by index cursors and lookups
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndexError {
    /// The index was asked for an operator it did not accept
    #[error("index '{index}' does not support operator {operator}")]
    UnsupportedOperator { index: String, operator: String },

    /// The lookup value has the wrong shape for the operator
    #[error("index '{index}': invalid lookup value: {reason}")]
    InvalidValue { index: String, reason: String },

    /// A record lacks a usable value at the key path
    #[error("index '{index}': record has no key at '{path}'")]
    MissingKey { index: String, path: String },

    /// Failure reported by an external index implementation
    #[error("index backend failure: {0}")]
    Backend(String),

    #[error(transparent)]
    Text(#[from] TextIndexError),
}

impl IndexError {
    pub fn unsupported(index: &str, operator: impl ToString) -> Self {
        IndexError::UnsupportedOperator {
            index: index.to_string(),
            operator: operator.to_string(),
        }
    }

    pub fn invalid_value(index: &str, reason: impl Into<String>) -> Self {
        IndexError::InvalidValue {
            index: index.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            IndexError::UnsupportedOperator { .. } => "AERO_INDEX_UNSUPPORTED_OPERATOR",
            IndexError::InvalidValue { .. } => "AERO_INDEX_INVALID_VALUE",
            IndexError::MissingKey { .. } => "AERO_INDEX_MISSING_KEY",
            IndexError::Backend(_) => "AERO_INDEX_BACKEND",
            IndexError::Text(e) => e.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_errors_keep_their_code() {
        let err: IndexError = TextIndexError::NotLoaded {
            index: "names".to_string(),
        }
        .into();
        assert_eq!(err.code(), "AERO_TEXT_NOT_LOADED");
        assert!(err.to_string().contains("names"));
    }

    #[test]
    fn test_unsupported_message() {
        let err = IndexError::unsupported("age", "$regex");
        assert_eq!(err.code(), "AERO_INDEX_UNSUPPORTED_OPERATOR");
        assert!(err.to_string().contains("$regex"));
    }
}
