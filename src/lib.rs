//! aeroquery - an embeddable query engine over JSON records
//!
//! Criteria are planned against registered indices (ordered range indices,
//! the primary index, and sharded fuzzy text indices behind custom
//! operators) and every candidate is re-checked by a predicate matcher, so
//! results do not depend on which indices exist.

pub mod cli;
pub mod collection;
pub mod config;
pub mod executor;
pub mod index;
pub mod observability;
pub mod planner;
pub mod text_index;
