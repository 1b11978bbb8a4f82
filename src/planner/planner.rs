//! Query planner
//!
//! Compiles criteria and find options into a `QueryPlan`.
//!
//! Clause handling, in priority order:
//! 1. `$and` / `$or` arrays compile each branch and combine them
//! 2. Custom top-level operators stage a lookup on their bound index
//! 3. Comparison operators take the first binding on the path that accepts them
//! 4. Nested objects without operators continue the path
//! 5. Literals are implicit `$eq`
//!
//! A clause no index accepts is not an error: the matcher still checks it,
//! and the plan loses exactness.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde_json::{Map, Value};

use super::criteria::{is_operator_key, join_path, pointer_segment, FindOptions};
use super::errors::{PlannerError, PlannerResult};
use super::plan::{MembershipSlot, PlanDiagnostics, PlanNode, QueryPlan, StagedLookup};
use super::schema::Schema;
use crate::index::Operator;
use crate::observability::Logger;

/// Pending filter rewrites, applied once compilation succeeded
#[derive(Default)]
struct Compilation {
    /// object pointer → custom operator keys to drop
    removals: BTreeMap<String, Vec<String>>,
    /// object pointer + lookup for custom operators under `$or`
    memberships: Vec<(String, StagedLookup)>,
    unindexed: BTreeSet<String>,
}

/// Planner over one schema
pub struct QueryPlanner<'a> {
    schema: &'a Schema,
}

impl<'a> QueryPlanner<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Plans a query.
    ///
    /// Deterministic: same criteria, options and schema give the same plan.
    pub fn plan(&self, criteria: &Value, options: &FindOptions) -> PlannerResult<QueryPlan> {
        options.validate()?;
        let object = criteria
            .as_object()
            .ok_or_else(|| PlannerError::malformed("", "criteria must be an object"))?;

        let mut compilation = Compilation::default();
        let mut root = self.compile_object(object, "", "", false, &mut compilation)?;

        let (sort_cursors, sort_driven, unsorted_fields) = self.stage_sort(&mut root, options);
        root.finish();

        let greedy = root.greedy && sort_driven;
        let missed = root.missed;
        let (filter, memberships) = self.rewrite_filter(criteria, compilation.removals, compilation.memberships)?;

        let mut indices = Vec::new();
        root.index_names(self.schema, &mut indices);

        let diagnostics = PlanDiagnostics {
            index_count: root.lookup_count(),
            sort_cursors,
            greedy,
            missed,
            covered_paths: root.covered.iter().cloned().collect(),
            unindexed_paths: compilation.unindexed.into_iter().collect(),
            unsorted_fields,
            indices,
        };

        let index_count = diagnostics.index_count.to_string();
        Logger::trace(
            "QUERY_PLANNED",
            &[
                ("greedy", if greedy { "true" } else { "false" }),
                ("missed", if missed { "true" } else { "false" }),
                ("index_count", index_count.as_str()),
            ],
        );

        Ok(QueryPlan {
            root,
            filter,
            memberships,
            options: options.clone(),
            greedy,
            missed,
            diagnostics,
        })
    }

    /// Compile a criteria object into an AND node.
    ///
    /// `path` is empty for the root and for `$and`/`$or` branches; only there
    /// are `$`-keys allowed.
    fn compile_object(
        &self,
        object: &Map<String, Value>,
        path: &str,
        pointer: &str,
        under_or: bool,
        compilation: &mut Compilation,
    ) -> PlannerResult<PlanNode> {
        let mut node = PlanNode::and();

        for (key, value) in object {
            let key_pointer = format!("{}/{}", pointer, pointer_segment(key));

            if key == "$and" || key == "$or" {
                let is_or = key == "$or";
                let branches = value
                    .as_array()
                    .filter(|items| !items.is_empty())
                    .ok_or_else(|| PlannerError::malformed(path, format!("{} requires a non-empty array", key)))?;

                let mut children = Vec::with_capacity(branches.len());
                for (i, branch) in branches.iter().enumerate() {
                    let branch = branch
                        .as_object()
                        .ok_or_else(|| PlannerError::malformed(path, format!("{} branches must be objects", key)))?;
                    let branch_pointer = format!("{}/{}", key_pointer, i);
                    children.push(self.compile_object(branch, "", &branch_pointer, under_or || is_or, compilation)?);
                }

                node.children.push(if is_or {
                    PlanNode::or(children)
                } else {
                    PlanNode::and_of(children)
                });
            } else if is_operator_key(key) {
                let mut lookup = self.stage_custom(key, value, path)?;
                compilation
                    .removals
                    .entry(pointer.to_string())
                    .or_default()
                    .push(key.clone());
                if under_or {
                    lookup.membership = Some(compilation.memberships.len());
                    compilation.memberships.push((pointer.to_string(), lookup.clone()));
                }
                node.lookups.push(lookup);
            } else {
                let field_path = join_path(path, key);
                self.compile_field(&field_path, value, &key_pointer, under_or, &mut node, compilation)?;
            }
        }

        node.finish();
        Ok(node)
    }

    fn stage_custom(&self, name: &str, value: &Value, path: &str) -> PlannerResult<StagedLookup> {
        if !self.schema.is_custom_operator(name) {
            return Err(PlannerError::malformed(path, format!("unknown operator {}", name)));
        }
        let binding = self
            .schema
            .operator_binding(name, value)
            .ok_or_else(|| PlannerError::malformed(path, format!("no index accepts {} with value {}", name, value)))?;

        Ok(StagedLookup {
            binding,
            path: None,
            operator: Operator::Custom(name.to_string()),
            value: Some(value.clone()),
            sort: None,
            membership: None,
        })
    }

    fn compile_field(
        &self,
        path: &str,
        value: &Value,
        pointer: &str,
        under_or: bool,
        node: &mut PlanNode,
        compilation: &mut Compilation,
    ) -> PlannerResult<()> {
        let Some(map) = value.as_object().filter(|m| !m.is_empty()) else {
            self.stage_comparison(path, Operator::Eq, value, node, compilation);
            return Ok(());
        };

        let operator_keys = map.keys().filter(|k| is_operator_key(k)).count();
        if operator_keys == 0 {
            let child = self.compile_object(map, path, pointer, under_or, compilation)?;
            node.children.push(child);
            return Ok(());
        }
        if operator_keys != map.len() {
            return Err(PlannerError::malformed(path, "operators mixed with field names"));
        }

        for (name, operand) in map {
            let operator = Operator::parse(name)
                .ok_or_else(|| PlannerError::malformed(path, format!("unknown operator {}", name)))?;
            validate_operand(path, &operator, operand)?;
            self.stage_comparison(path, operator, operand, node, compilation);
        }
        Ok(())
    }

    fn stage_comparison(
        &self,
        path: &str,
        operator: Operator,
        value: &Value,
        node: &mut PlanNode,
        compilation: &mut Compilation,
    ) {
        match self.schema.path_binding(path, &operator, value) {
            Some(binding) => node.lookups.push(StagedLookup {
                binding,
                path: Some(path.to_string()),
                operator,
                value: Some(value.clone()),
                sort: None,
                membership: None,
            }),
            None => {
                node.uncovered += 1;
                compilation.unindexed.insert(path.to_string());
            }
        }
    }

    /// Stage the sort driver on the root node.
    ///
    /// Only a single-field sort on a sortable index is index driven. The
    /// driver is always a full ordered traversal prepended to the root
    /// intersection: a bounded lookup would place a multikey record at its
    /// first matching value rather than at the value the sort orders it by.
    ///
    /// Returns (sort cursors, sort driven, uncovered sort fields).
    fn stage_sort(&self, root: &mut PlanNode, options: &FindOptions) -> (usize, bool, Vec<String>) {
        let unsorted = |fields: &[&str]| -> Vec<String> {
            fields
                .iter()
                .filter(|f| self.schema.sort_binding(f).is_none())
                .map(|f| f.to_string())
                .collect()
        };

        let spec = match options.sort.as_slice() {
            [] => return (0, true, Vec::new()),
            [spec] => spec,
            many => {
                let fields: Vec<&str> = many.iter().map(|s| s.field.as_str()).collect();
                return (0, false, unsorted(&fields));
            }
        };

        let Some(sort_binding) = self.schema.sort_binding(&spec.field) else {
            return (0, false, vec![spec.field.clone()]);
        };

        root.lookups.insert(
            0,
            StagedLookup {
                binding: sort_binding,
                path: None,
                operator: Operator::Eq,
                value: None,
                sort: Some(spec.direction),
                membership: None,
            },
        );
        (1, true, Vec::new())
    }

    /// Build the matcher filter: drop custom operators and splice membership
    /// clauses where they sat under `$or`.
    fn rewrite_filter(
        &self,
        criteria: &Value,
        removals: BTreeMap<String, Vec<String>>,
        memberships: Vec<(String, StagedLookup)>,
    ) -> PlannerResult<(Value, Vec<MembershipSlot>)> {
        let mut filter = criteria.clone();

        for (pointer, keys) in &removals {
            let object = filter
                .pointer_mut(pointer)
                .and_then(Value::as_object_mut)
                .ok_or_else(|| PlannerError::malformed(pointer, "criteria changed during planning"))?;
            for key in keys {
                object.remove(key);
            }
        }

        let id_attr = self.schema.id_attr();
        let mut slots = Vec::with_capacity(memberships.len());
        for (pointer, lookup) in memberships {
            let object = filter
                .pointer_mut(&pointer)
                .and_then(Value::as_object_mut)
                .ok_or_else(|| PlannerError::malformed(&pointer, "criteria changed during planning"))?;

            let clauses = object
                .entry("$and")
                .or_insert_with(|| Value::Array(Vec::new()));
            let Some(clauses) = clauses.as_array_mut() else {
                return Err(PlannerError::malformed(&pointer, "$and requires a non-empty array"));
            };

            let mut membership = Map::new();
            membership.insert(id_attr.to_string(), serde_json::json!({ "$in": [] }));
            clauses.push(Value::Object(membership));

            slots.push(MembershipSlot {
                pointer: format!(
                    "{}/$and/{}/{}/$in",
                    pointer,
                    clauses.len() - 1,
                    pointer_segment(id_attr)
                ),
                lookup,
            });
        }

        Ok((filter, slots))
    }
}

fn validate_operand(path: &str, operator: &Operator, operand: &Value) -> PlannerResult<()> {
    match operator {
        Operator::In | Operator::Nin if !operand.is_array() => Err(PlannerError::malformed(
            path,
            format!("{} requires an array", operator),
        )),
        Operator::Regex => {
            let pattern = operand
                .as_str()
                .ok_or_else(|| PlannerError::malformed(path, "$regex requires a string pattern"))?;
            Regex::new(pattern)
                .map(|_| ())
                .map_err(|e| PlannerError::malformed(path, format!("invalid $regex: {}", e)))
        }
        _ => Ok(()),
    }
}
