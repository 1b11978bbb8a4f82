//! Explain output
//!
//! Deterministic, human-readable rendering of a plan or of the error that
//! rejected it.

use std::fmt;

use serde::Serialize;

use super::errors::PlannerError;
use super::plan::{PlanDiagnostics, QueryPlan};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplainPlan {
    pub accepted: bool,
    /// "index" when keys come from indices, "full_scan" otherwise
    pub scan_type: Option<String>,
    pub diagnostics: Option<PlanDiagnostics>,
    /// "field asc" per sort spec
    pub sort: Vec<String>,
    pub skip: usize,
    pub limit: Option<usize>,
    pub rejection_reason: Option<String>,
    pub rejection_code: Option<String>,
}

impl ExplainPlan {
    pub fn from_plan(plan: &QueryPlan) -> Self {
        let sort = plan
            .options
            .sort
            .iter()
            .map(|spec| {
                let direction = if spec.direction.is_desc() { "desc" } else { "asc" };
                format!("{} {}", spec.field, direction)
            })
            .collect();

        Self {
            accepted: true,
            scan_type: Some(if plan.missed { "full_scan" } else { "index" }.to_string()),
            diagnostics: Some(plan.diagnostics.clone()),
            sort,
            skip: plan.options.skip,
            limit: plan.options.limit,
            rejection_reason: None,
            rejection_code: None,
        }
    }

    pub fn from_error(err: &PlannerError) -> Self {
        Self {
            accepted: false,
            scan_type: None,
            diagnostics: None,
            sort: Vec::new(),
            skip: 0,
            limit: None,
            rejection_reason: Some(err.to_string()),
            rejection_code: Some(err.code().to_string()),
        }
    }
}

fn list(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.accepted {
            writeln!(f, "QUERY REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "  code:   {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "  reason: {}", reason)?;
            }
            return Ok(());
        }

        writeln!(f, "QUERY PLAN")?;
        if let Some(scan_type) = &self.scan_type {
            writeln!(f, "  scan:      {}", scan_type)?;
        }
        if let Some(d) = &self.diagnostics {
            writeln!(f, "  exact:     {}", d.greedy)?;
            writeln!(f, "  lookups:   {}", d.index_count)?;
            writeln!(f, "  indices:   {}", list(&d.indices))?;
            writeln!(f, "  covered:   {}", list(&d.covered_paths))?;
            writeln!(f, "  unindexed: {}", list(&d.unindexed_paths))?;
            if d.sort_cursors > 0 {
                writeln!(f, "  sort by:   index")?;
            } else if !self.sort.is_empty() {
                writeln!(f, "  sort by:   memory")?;
            }
            if !d.unsorted_fields.is_empty() {
                writeln!(f, "  unsorted:  {}", list(&d.unsorted_fields))?;
            }
        }
        writeln!(f, "  sort:      {}", list(&self.sort))?;
        writeln!(f, "  skip:      {}", self.skip)?;
        match self.limit {
            Some(limit) => writeln!(f, "  limit:     {}", limit),
            None => writeln!(f, "  limit:     -"),
        }
    }
}
