//! Query planner
//!
//! Compiles criteria into a tree of staged index lookups and decides how
//! exact the plan is.
//!
//! # Plan flags
//!
//! - greedy: every clause and the sort are answered by indices, so the
//!   executor may stop at `skip + limit`
//! - missed: no index restricts the query; the executor scans the primary
//!
//! Planning is deterministic: bindings are consulted in registration order.

mod cache;
mod criteria;
mod errors;
mod explain;
mod merge;
mod plan;
mod planner;
mod schema;

pub use cache::RecordCache;
pub use criteria::{is_operator_key, is_operator_object, join_path, pointer_segment, FindOptions, SortSpec};
pub use errors::{PlannerError, PlannerResult};
pub use explain::ExplainPlan;
pub use merge::{distinct, intersect, union};
pub use plan::{Combinator, MembershipSlot, PlanDiagnostics, PlanNode, QueryPlan, StagedLookup};
pub use planner::QueryPlanner;
pub use schema::{BindingTarget, IndexBinding, Schema};
