//! Query plans
//!
//! A plan is a tree of staged index lookups. Nothing touches an index until
//! `open` is called; opening yields one merged key stream for the executor.
//!
//! Node flags:
//! - `greedy`: index results need no in-memory narrowing beyond the matcher
//!   re-check, so skip/limit can stop the scan early
//! - `missed`: no index restricts the node; the executor must scan
//! - `covered`: paths the node's lookups fully answer

use std::collections::BTreeSet;

use futures_util::StreamExt;
use serde::Serialize;
use serde_json::Value;

use super::cache::RecordCache;
use super::criteria::FindOptions;
use super::merge::{intersect, union};
use super::schema::Schema;
use crate::index::{
    batched, failed, record_key, CursorOptions, IndexError, IndexKey, IndexResult, KeyStream, Operator, SortDirection,
};

/// One index lookup, bound to a schema binding by position
#[derive(Debug, Clone, PartialEq)]
pub struct StagedLookup {
    pub binding: usize,
    /// Clause path; None for custom operators
    pub path: Option<String>,
    pub operator: Operator,
    /// None opens a full traversal
    pub value: Option<Value>,
    pub sort: Option<SortDirection>,
    /// Position in `QueryPlan::memberships` of the slot fed by this lookup
    pub membership: Option<usize>,
}

impl StagedLookup {
    /// Open the lookup against its binding.
    ///
    /// A lookup whose membership slot was already materialized replays those
    /// keys instead of querying its index again. Primary-bound lookups stream
    /// records, park them in `cache` and emit their keys.
    pub fn open<'a>(
        &'a self,
        schema: &'a Schema,
        cache: &'a RecordCache,
        materialized: &'a [Vec<IndexKey>],
        chunk_size: Option<usize>,
    ) -> KeyStream<'a> {
        if let Some(keys) = self.membership.and_then(|slot| materialized.get(slot)) {
            return batched(keys.clone(), chunk_size);
        }
        let Some(binding) = schema.binding(self.binding) else {
            return failed(IndexError::Backend(format!("no index binding at position {}", self.binding)));
        };
        let options = CursorOptions {
            operator: Some(self.operator.clone()),
            sort: self.sort,
            chunk_size,
        };

        if !binding.is_primary {
            return binding.index.cursor(self.value.as_ref(), options);
        }

        let id_attr = schema.id_attr();
        let name = binding.index.name();
        schema
            .primary()
            .records(self.value.as_ref(), options)
            .map(move |batch| -> IndexResult<Vec<IndexKey>> {
                let records = batch?;
                let mut keys = Vec::with_capacity(records.len());
                for record in records {
                    let key = record_key(&record, id_attr, name)?;
                    cache.insert(key.clone(), record);
                    keys.push(key);
                }
                Ok(keys)
            })
            .boxed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanNode {
    pub combinator: Combinator,
    pub lookups: Vec<StagedLookup>,
    pub children: Vec<PlanNode>,
    /// Leaf clauses no index accepted
    pub uncovered: usize,
    pub greedy: bool,
    pub missed: bool,
    pub covered: BTreeSet<String>,
}

impl PlanNode {
    pub fn and() -> Self {
        Self {
            combinator: Combinator::And,
            lookups: Vec::new(),
            children: Vec::new(),
            uncovered: 0,
            greedy: true,
            missed: true,
            covered: BTreeSet::new(),
        }
    }

    pub fn or(children: Vec<PlanNode>) -> Self {
        let mut node = Self {
            combinator: Combinator::Or,
            children,
            ..Self::and()
        };
        node.finish();
        node
    }

    pub fn and_of(children: Vec<PlanNode>) -> Self {
        let mut node = Self {
            children,
            ..Self::and()
        };
        node.finish();
        node
    }

    /// Recompute flags from lookups and (already finished) children.
    pub fn finish(&mut self) {
        match self.combinator {
            Combinator::And => {
                self.greedy = self.uncovered == 0 && self.children.iter().all(|c| c.greedy);
                self.missed = self.lookups.is_empty() && self.children.iter().all(|c| c.missed);
                let mut covered: BTreeSet<String> =
                    self.lookups.iter().filter_map(|l| l.path.clone()).collect();
                for child in &self.children {
                    covered.extend(child.covered.iter().cloned());
                }
                self.covered = covered;
            }
            Combinator::Or => {
                self.greedy = self.children.iter().all(|c| c.greedy);
                self.missed = self.children.iter().any(|c| c.missed);
                let mut branches = self.children.iter();
                let mut covered = branches.next().map(|c| c.covered.clone()).unwrap_or_default();
                for child in branches {
                    covered = covered.intersection(&child.covered).cloned().collect();
                }
                self.covered = covered;
            }
        }
    }

    /// Number of lookups in this subtree
    pub fn lookup_count(&self) -> usize {
        self.lookups.len() + self.children.iter().map(PlanNode::lookup_count).sum::<usize>()
    }

    /// Names of every index staged in this subtree, in staging order
    pub fn index_names(&self, schema: &Schema, out: &mut Vec<String>) {
        for lookup in &self.lookups {
            if let Some(binding) = schema.binding(lookup.binding) {
                out.push(binding.index.name().to_string());
            }
        }
        for child in &self.children {
            child.index_names(schema, out);
        }
    }

    /// Open the merged key stream, or None if the node is missed.
    ///
    /// AND nodes intersect their lookups then their non-missed children, so
    /// the first lookup drives the order. OR nodes union their branches.
    pub fn open<'a>(
        &'a self,
        schema: &'a Schema,
        cache: &'a RecordCache,
        materialized: &'a [Vec<IndexKey>],
        chunk_size: Option<usize>,
    ) -> Option<KeyStream<'a>> {
        if self.missed {
            return None;
        }
        match self.combinator {
            Combinator::And => {
                let mut inputs: Vec<KeyStream<'a>> = self
                    .lookups
                    .iter()
                    .map(|lookup| lookup.open(schema, cache, materialized, chunk_size))
                    .collect();
                inputs.extend(
                    self.children
                        .iter()
                        .filter_map(|child| child.open(schema, cache, materialized, chunk_size)),
                );
                Some(intersect(inputs))
            }
            Combinator::Or => {
                let inputs = self
                    .children
                    .iter()
                    .filter_map(|child| child.open(schema, cache, materialized, chunk_size))
                    .collect();
                Some(union(inputs))
            }
        }
    }
}

/// Filter location whose `$in` list is filled with a lookup's keys before
/// execution
#[derive(Debug, Clone, PartialEq)]
pub struct MembershipSlot {
    /// JSON pointer to the `$in` array inside `QueryPlan::filter`
    pub pointer: String,
    pub lookup: StagedLookup,
}

/// Plan summary for logging and explain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanDiagnostics {
    pub index_count: usize,
    pub sort_cursors: usize,
    pub greedy: bool,
    pub missed: bool,
    pub covered_paths: Vec<String>,
    pub unindexed_paths: Vec<String>,
    pub unsorted_fields: Vec<String>,
    pub indices: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub root: PlanNode,
    /// Criteria the matcher re-checks (custom operators removed or rewritten)
    pub filter: Value,
    pub memberships: Vec<MembershipSlot>,
    pub options: FindOptions,
    pub greedy: bool,
    pub missed: bool,
    pub diagnostics: PlanDiagnostics,
}

impl QueryPlan {
    /// Open the root key stream; None for a missed plan.
    ///
    /// `materialized` holds the keys of each membership slot, by position.
    pub fn open<'a>(
        &'a self,
        schema: &'a Schema,
        cache: &'a RecordCache,
        materialized: &'a [Vec<IndexKey>],
        chunk_size: Option<usize>,
    ) -> Option<KeyStream<'a>> {
        self.root.open(schema, cache, materialized, chunk_size)
    }
}
