//! Result types for query execution

use serde::Serialize;
use serde_json::Value;

use crate::planner::PlanDiagnostics;

/// Result of one find
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// Records in result order
    pub records: Vec<Value>,
    pub diagnostics: PlanDiagnostics,
    /// Records tested by the matcher
    pub scanned_count: usize,
    /// Records fetched through `PrimaryIndex::find`
    pub fetched_count: usize,
    pub returned_count: usize,
    /// Whether a limit cut the result
    pub limit_applied: bool,
}

impl ExecutionResult {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Values of `field` in result order; missing fields are skipped
    pub fn values_of<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.records.iter().filter_map(move |record| record.get(field))
    }
}
