//! Text index configuration
//!
//! Options are plain data fixed at construction. They serialize on their own,
//! separately from posting data, so a shard's options can travel without its
//! postings and vice versa.

use serde::{Deserialize, Serialize};

use super::errors::{TextIndexError, TextIndexResult};

/// Percentage of query tokens that must hit when the threshold is automatic
pub const AUTO_THRESHOLD_PERCENT: usize = 40;

/// Immutable text index options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextIndexOptions {
    /// Index identifier (shards get `"<parent>:<n>"`)
    pub id: String,

    /// N-gram length in characters
    #[serde(default = "default_gram_len")]
    pub gram_len: usize,

    /// Fixed match threshold, used unless `actuation_limit_auto` is set
    #[serde(default = "default_actuation_limit")]
    pub actuation_limit: usize,

    /// Derive the threshold from the query token count
    #[serde(default)]
    pub actuation_limit_auto: bool,

    /// Case-fold text before tokenizing
    #[serde(default = "default_to_lower_case")]
    pub to_lower_case: bool,

    /// `false` marks a deferred index whose postings are materialized on
    /// first query
    #[serde(default = "default_is_loaded")]
    pub is_loaded: bool,
}

fn default_gram_len() -> usize {
    3
}

fn default_actuation_limit() -> usize {
    2
}

fn default_to_lower_case() -> bool {
    true
}

fn default_is_loaded() -> bool {
    true
}

impl TextIndexOptions {
    /// Creates options with defaults for everything except the id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            gram_len: default_gram_len(),
            actuation_limit: default_actuation_limit(),
            actuation_limit_auto: false,
            to_lower_case: default_to_lower_case(),
            is_loaded: default_is_loaded(),
        }
    }

    pub fn with_gram_len(mut self, gram_len: usize) -> Self {
        self.gram_len = gram_len;
        self
    }

    pub fn with_actuation_limit(mut self, limit: usize) -> Self {
        self.actuation_limit = limit;
        self
    }

    pub fn with_auto_threshold(mut self, auto: bool) -> Self {
        self.actuation_limit_auto = auto;
        self
    }

    pub fn with_lower_case(mut self, to_lower_case: bool) -> Self {
        self.to_lower_case = to_lower_case;
        self
    }

    /// Marks the index as deferred
    pub fn deferred(mut self) -> Self {
        self.is_loaded = false;
        self
    }

    /// Same options under another identifier
    pub fn renamed(&self, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..self.clone()
        }
    }

    /// Validate the options.
    pub fn validate(&self) -> TextIndexResult<()> {
        if self.gram_len == 0 {
            return Err(TextIndexError::InvalidOptions(format!(
                "index '{}': gram_len must be at least 1",
                self.id
            )));
        }
        Ok(())
    }

    /// Returns true if `count` hits out of `token_count` query tokens is a match.
    ///
    /// The automatic rule compares `count >= token_count * 40 / 100` without
    /// rounding.
    pub fn meets_threshold(&self, count: usize, token_count: usize) -> bool {
        if self.actuation_limit_auto {
            count * 100 >= token_count * AUTO_THRESHOLD_PERCENT
        } else {
            count >= self.actuation_limit
        }
    }
}
