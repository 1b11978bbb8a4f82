//! Find options and criteria helpers
//!
//! Criteria themselves stay `serde_json::Value` objects:
//! - `field: literal` is implicit `$eq`
//! - `field: {"$op": value, ...}` applies every operator
//! - `field: {"sub": ...}` continues the path (`field.sub`)
//! - `$and` / `$or` take arrays of criteria objects
//! - other top-level `$name` keys are custom operators bound to an index

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{PlannerError, PlannerResult};
use crate::index::SortDirection;

/// Sort specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

impl FromStr for SortSpec {
    type Err = PlannerError;

    /// Parses `field`, `field:asc` or `field:desc`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = match s.rsplit_once(':') {
            Some((field, "asc")) => (field, SortDirection::Asc),
            Some((field, "desc")) => (field, SortDirection::Desc),
            Some((_, other)) => {
                return Err(PlannerError::InvalidOptions(format!(
                    "unknown sort direction '{}'",
                    other
                )))
            }
            None => (s, SortDirection::Asc),
        };
        if field.is_empty() {
            return Err(PlannerError::InvalidOptions("empty sort field".into()));
        }
        Ok(SortSpec {
            field: field.to_string(),
            direction,
        })
    }
}

/// Sort, skip and limit for a find
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindOptions {
    #[serde(default)]
    pub sort: Vec<SortSpec>,
    #[serde(default)]
    pub skip: usize,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Number of matching records needed before skip and limit are satisfied
    pub fn window(&self) -> Option<usize> {
        self.limit.map(|limit| self.skip.saturating_add(limit))
    }

    pub fn validate(&self) -> PlannerResult<()> {
        if let Some(spec) = self.sort.iter().find(|spec| spec.field.is_empty()) {
            return Err(PlannerError::InvalidOptions(format!(
                "empty sort field ({:?})",
                spec.direction
            )));
        }
        Ok(())
    }
}

/// Returns true for `$`-prefixed keys
pub fn is_operator_key(key: &str) -> bool {
    key.starts_with('$')
}

/// Join a path prefix and a field name with '.'
pub fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}

/// Escape a key for use as a JSON pointer segment
pub fn pointer_segment(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

/// True if `value` is an object whose keys are all operators
pub fn is_operator_object(value: &Value) -> bool {
    match value.as_object() {
        Some(map) => !map.is_empty() && map.keys().all(|k| is_operator_key(k)),
        None => false,
    }
}
