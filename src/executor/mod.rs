//! Query executor
//!
//! Consumes plans and produces ordered results.
//!
//! # Execution flow
//!
//! 1. Materialize membership clauses in the filter
//! 2. Obtain candidates: merged index key stream, or a primary full scan
//!    when the plan is missed
//! 3. Re-check every candidate with the predicate matcher
//! 4. Apply sort, skip and limit
//!
//! # Invariants
//!
//! - Results never depend on whether an index was used
//! - Early stop only for greedy plans

mod errors;
mod executor;
mod filters;
mod result;
mod sorter;

pub use errors::{ExecutorError, ExecutorResult};
pub use executor::{QueryExecutor, DEFAULT_BATCH_SIZE};
pub use filters::{CriteriaMatcher, PredicateMatcher};
pub use result::ExecutionResult;
pub use sorter::ResultSorter;
