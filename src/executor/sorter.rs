//! Result sorting for query execution
//!
//! Multi-field, stable. Values order like index keys
//! (null < bool < number < string).
//!
//! A record's key for one field is derived like a range index entry: every
//! scalar reachable at the path (arrays fan out), the smallest for ascending
//! and the largest for descending. A path with no scalar sorts as null. An
//! ordered index traversal therefore yields records in this same order.

use std::cmp::Ordering;

use serde_json::Value;

use crate::index::{collect_values, IndexKey, SortDirection};
use crate::planner::SortSpec;

pub struct ResultSorter;

impl ResultSorter {
    /// Sort records by every spec in turn. Ties keep their input order.
    pub fn sort(records: &mut [Value], specs: &[SortSpec]) {
        if specs.is_empty() {
            return;
        }
        records.sort_by(|a, b| {
            specs
                .iter()
                .map(|spec| {
                    let a = sort_key(a, &spec.field, spec.direction);
                    let b = sort_key(b, &spec.field, spec.direction);
                    match spec.direction {
                        SortDirection::Asc => a.cmp(&b),
                        SortDirection::Desc => b.cmp(&a),
                    }
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });
    }
}

fn sort_key(record: &Value, field: &str, direction: SortDirection) -> IndexKey {
    let keys = collect_values(record, field).into_iter().filter_map(IndexKey::from_json);
    let key = match direction {
        SortDirection::Asc => keys.min(),
        SortDirection::Desc => keys.max(),
    };
    key.unwrap_or(IndexKey::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(records: &[Value]) -> Vec<i64> {
        records.iter().map(|r| r["id"].as_i64().unwrap()).collect()
    }

    #[test]
    fn test_sort_ascending_and_descending() {
        let mut records = vec![
            json!({"id": 1, "age": 30}),
            json!({"id": 2, "age": 20}),
            json!({"id": 3, "age": 25}),
        ];
        ResultSorter::sort(&mut records, &[SortSpec::asc("age")]);
        assert_eq!(ids(&records), vec![2, 3, 1]);

        ResultSorter::sort(&mut records, &[SortSpec::desc("age")]);
        assert_eq!(ids(&records), vec![1, 3, 2]);
    }

    #[test]
    fn test_sort_multi_field_stable() {
        let mut records = vec![
            json!({"id": 1, "city": "b", "age": 3}),
            json!({"id": 2, "city": "a", "age": 3}),
            json!({"id": 3, "city": "b", "age": 1}),
            json!({"id": 4, "city": "a", "age": 3}),
        ];
        ResultSorter::sort(&mut records, &[SortSpec::asc("city"), SortSpec::desc("age")]);
        assert_eq!(ids(&records), vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_missing_sorts_as_null() {
        let mut records = vec![
            json!({"id": 1, "age": 5}),
            json!({"id": 2}),
            json!({"id": 3, "age": null}),
            json!({"id": 4, "age": "x"}),
        ];
        ResultSorter::sort(&mut records, &[SortSpec::asc("age")]);
        assert_eq!(ids(&records), vec![2, 3, 1, 4]);
    }

    #[test]
    fn test_multikey_sorts_by_extreme_scalar() {
        let mut records = vec![
            json!({"id": 1, "score": [1, 100]}),
            json!({"id": 2, "score": 5}),
            json!({"id": 3, "score": 6}),
            json!({"id": 4, "score": []}),
            json!({"id": 5, "score": {"a": 1}}),
        ];
        ResultSorter::sort(&mut records, &[SortSpec::asc("score")]);
        assert_eq!(ids(&records), vec![4, 5, 1, 2, 3]);

        ResultSorter::sort(&mut records, &[SortSpec::desc("score")]);
        assert_eq!(ids(&records), vec![1, 3, 2, 4, 5]);
    }

    #[test]
    fn test_dotted_path_fans_out_through_arrays() {
        let mut records = vec![
            json!({"id": 1, "items": [{"qty": 3}, {"qty": 50}]}),
            json!({"id": 2, "items": [{"qty": 20}]}),
            json!({"id": 3}),
        ];
        ResultSorter::sort(&mut records, &[SortSpec::asc("items.qty")]);
        assert_eq!(ids(&records), vec![3, 1, 2]);

        ResultSorter::sort(&mut records, &[SortSpec::desc("items.qty")]);
        assert_eq!(ids(&records), vec![1, 2, 3]);
    }
}
