//! CLI-specific error types

use std::io;

use thiserror::Error;

use crate::collection::QueryError;
use crate::config::ConfigError;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    /// A data file line failed to parse
    #[error("{path}:{line}: {reason}")]
    Data { path: String, line: usize, reason: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl CliError {
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Io(_) => "AERO_CLI_IO_ERROR",
            CliError::Json(_) | CliError::Data { .. } => "AERO_CLI_INVALID_INPUT",
            CliError::InvalidArgument(_) => "AERO_CLI_INVALID_ARGUMENT",
            CliError::Config(e) => e.code(),
            CliError::Query(e) => e.code(),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e.to_string())
    }
}
