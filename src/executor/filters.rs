//! Predicate matching for query execution
//!
//! Every candidate record is re-checked against the plan's filter, so the
//! matcher decides correctness; indices only narrow the candidates.
//!
//! Value semantics follow the index key order:
//! - a path resolving to nothing scalar is treated as null
//! - arrays match if any element matches (or the array itself for `$eq`)
//! - range operators compare within one family only (numbers with numbers,
//!   strings with strings); no cross-type coercion
//! - unknown operators never match

use regex::Regex;
use serde_json::{Map, Value};

use crate::index::{collect_values, IndexKey};
use crate::planner::{is_operator_object, join_path};

/// Decides whether a record satisfies criteria
pub trait PredicateMatcher: Send + Sync {
    fn matches(&self, criteria: &Value, record: &Value) -> bool;
}

/// Matcher for the criteria language the planner accepts
#[derive(Debug, Clone, Copy, Default)]
pub struct CriteriaMatcher;

impl CriteriaMatcher {
    pub fn new() -> Self {
        Self
    }

    fn matches_object(&self, criteria: &Map<String, Value>, record: &Value, prefix: &str) -> bool {
        criteria.iter().all(|(key, condition)| match key.as_str() {
            "$and" => condition
                .as_array()
                .map_or(false, |branches| branches.iter().all(|b| self.matches_branch(b, record))),
            "$or" => condition
                .as_array()
                .map_or(false, |branches| branches.iter().any(|b| self.matches_branch(b, record))),
            k if k.starts_with('$') => false,
            field => self.matches_field(&join_path(prefix, field), condition, record),
        })
    }

    fn matches_branch(&self, branch: &Value, record: &Value) -> bool {
        branch
            .as_object()
            .map_or(false, |criteria| self.matches_object(criteria, record, ""))
    }

    fn matches_field(&self, path: &str, condition: &Value, record: &Value) -> bool {
        match condition.as_object() {
            Some(map) if is_operator_object(condition) => {
                let candidates = Candidates::at(record, path);
                map.iter()
                    .all(|(operator, operand)| candidates.test(operator, operand))
            }
            Some(map) if !map.is_empty() => self.matches_object(map, record, path),
            _ => Candidates::at(record, path).equals(condition),
        }
    }
}

impl PredicateMatcher for CriteriaMatcher {
    fn matches(&self, criteria: &Value, record: &Value) -> bool {
        match criteria.as_object() {
            Some(map) => self.matches_object(map, record, ""),
            None => false,
        }
    }
}

/// Values found at one path of one record
struct Candidates<'v> {
    values: Vec<&'v Value>,
    /// Scalar keys; `[Null]` when the path holds no scalar
    keys: Vec<IndexKey>,
}

impl<'v> Candidates<'v> {
    fn at(record: &'v Value, path: &str) -> Self {
        let values = collect_values(record, path);
        let mut keys: Vec<IndexKey> = values.iter().filter_map(|v| IndexKey::from_json(v)).collect();
        if keys.is_empty() {
            keys.push(IndexKey::Null);
        }
        Self { values, keys }
    }

    fn equals(&self, operand: &Value) -> bool {
        match IndexKey::from_json(operand) {
            Some(key) => self.keys.contains(&key),
            None => self.values.iter().any(|v| *v == operand),
        }
    }

    fn compare(&self, operand: &Value, accept: fn(std::cmp::Ordering) -> bool) -> bool {
        let Some(bound) = IndexKey::from_json(operand) else {
            return false;
        };
        self.keys
            .iter()
            .any(|key| key.same_family(&bound) && accept(key.cmp(&bound)))
    }

    fn member_of(&self, operand: &Value) -> bool {
        operand
            .as_array()
            .map_or(false, |items| items.iter().any(|item| self.equals(item)))
    }

    fn test(&self, operator: &str, operand: &Value) -> bool {
        match operator {
            "$eq" => self.equals(operand),
            "$ne" => !self.equals(operand),
            "$gt" => self.compare(operand, |o| o.is_gt()),
            "$gte" => self.compare(operand, |o| o.is_ge()),
            "$lt" => self.compare(operand, |o| o.is_lt()),
            "$lte" => self.compare(operand, |o| o.is_le()),
            "$in" => self.member_of(operand),
            "$nin" => operand.is_array() && !self.member_of(operand),
            "$regex" => {
                let Some(pattern) = operand.as_str() else {
                    return false;
                };
                let Ok(regex) = Regex::new(pattern) else {
                    return false;
                };
                self.values
                    .iter()
                    .filter_map(|v| v.as_str())
                    .any(|s| regex.is_match(s))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn matches(criteria: Value, record: Value) -> bool {
        CriteriaMatcher::new().matches(&criteria, &record)
    }

    #[test]
    fn test_literal_equality() {
        assert!(matches(json!({"age": 30}), json!({"age": 30})));
        assert!(matches(json!({"age": 30}), json!({"age": 30.0})));
        assert!(!matches(json!({"age": 30}), json!({"age": "30"})));
        assert!(matches(json!({}), json!({"age": 1})));
    }

    #[test]
    fn test_missing_matches_null() {
        assert!(matches(json!({"age": null}), json!({"name": "x"})));
        assert!(matches(json!({"age": {"$eq": null}}), json!({"age": null})));
        assert!(!matches(json!({"age": null}), json!({"age": 3})));
        assert!(matches(json!({"age": {"$ne": null}}), json!({"age": 3})));
    }

    #[test]
    fn test_range_same_family_only() {
        assert!(matches(json!({"age": {"$gt": 18, "$lte": 30}}), json!({"age": 30})));
        assert!(!matches(json!({"age": {"$gt": 18}}), json!({"age": "40"})));
        assert!(matches(json!({"name": {"$lt": "b"}}), json!({"name": "alice"})));
        assert!(!matches(json!({"age": {"$lt": 10}}), json!({})));
    }

    #[test]
    fn test_in_and_nin() {
        assert!(matches(json!({"id": {"$in": [1, 2]}}), json!({"id": 2})));
        assert!(!matches(json!({"id": {"$in": []}}), json!({"id": 2})));
        assert!(matches(json!({"id": {"$nin": [1, 3]}}), json!({"id": 2})));
        assert!(!matches(json!({"id": {"$nin": [2]}}), json!({"id": 2})));
    }

    #[test]
    fn test_array_any_element() {
        let record = json!({"tags": ["red", "blue"], "items": [{"qty": 1}, {"qty": 9}]});
        assert!(matches(json!({"tags": "blue"}), record.clone()));
        assert!(matches(json!({"tags": ["red", "blue"]}), record.clone()));
        assert!(matches(json!({"items.qty": {"$gt": 5}}), record.clone()));
        assert!(!matches(json!({"items.qty": {"$gt": 10}}), record));
    }

    #[test]
    fn test_nested_path_object() {
        let record = json!({"address": {"city": "Luanda", "zip": 100}});
        assert!(matches(json!({"address": {"city": "Luanda"}}), record.clone()));
        assert!(matches(json!({"address.zip": {"$gte": 100}}), record.clone()));
        assert!(!matches(json!({"address": {"city": "Lobito"}}), record));
    }

    #[test]
    fn test_regex() {
        assert!(matches(json!({"name": {"$regex": "^Ang"}}), json!({"name": "Angola"})));
        assert!(!matches(json!({"name": {"$regex": "^Ang"}}), json!({"name": 5})));
    }

    #[test]
    fn test_and_or() {
        let record = json!({"a": 1, "b": 2});
        assert!(matches(json!({"$or": [{"a": 5}, {"b": 2}]}), record.clone()));
        assert!(!matches(json!({"$and": [{"a": 1}, {"b": 3}]}), record.clone()));
        assert!(matches(json!({"a": 1, "$and": [{"b": {"$gte": 2}}]}), record));
    }

    #[test]
    fn test_unknown_operator_never_matches() {
        assert!(!matches(json!({"a": {"$near": 1}}), json!({"a": 1})));
        assert!(!matches(json!({"$text": "x"}), json!({"a": 1})));
    }
}
