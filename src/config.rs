//! Engine configuration
//!
//! JSON file, every field optional:
//!
//! ```json
//! { "default_batch_size": 20, "shard_chunk_size": 1000, "log_level": "info" }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::Severity;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(String),

    #[error("invalid config JSON: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read(_) => "AERO_CONFIG_READ_FAILED",
            ConfigError::Parse(_) | ConfigError::Invalid(_) => "AERO_CONFIG_INVALID",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Key batch size for finds without a limit
    #[serde(default = "default_batch_size")]
    pub default_batch_size: usize,

    /// Postings per text index shard
    #[serde(default = "default_shard_chunk_size")]
    pub shard_chunk_size: usize,

    /// Minimum log severity: trace, info, warn or error
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_batch_size() -> usize {
    20
}
fn default_shard_chunk_size() -> usize {
    1000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_batch_size: default_batch_size(),
            shard_chunk_size: default_shard_chunk_size(),
            log_level: default_log_level(),
        }
    }
}

impl QueryConfig {
    /// Load and validate configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
        let config: QueryConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.default_batch_size == 0 {
            return Err(ConfigError::Invalid("default_batch_size must be > 0".into()));
        }
        if self.shard_chunk_size == 0 {
            return Err(ConfigError::Invalid("shard_chunk_size must be > 0".into()));
        }
        self.severity()?;
        Ok(())
    }

    pub fn severity(&self) -> ConfigResult<Severity> {
        Severity::parse(&self.log_level)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown log_level '{}'", self.log_level)))
    }
}
