//! BTreeMap-based lookup structures
//!
//! Value keys map to sorted, deduplicated record keys. All lookups walk the
//! map in key order so results are deterministic.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ops::Bound;

use serde_json::Value;

use super::contract::{Operator, SortDirection};
use super::errors::{IndexError, IndexResult};
use super::key::IndexKey;

/// Batch size used when a cursor gets no chunk hint
pub const DEFAULT_CHUNK_SIZE: usize = 64;

/// Returns true if an ordered lookup can serve `operator` with `value`
pub fn supports_lookup(operator: &Operator, value: &Value) -> bool {
    let scalar = |v: &Value| IndexKey::from_json(v).is_some();
    match operator {
        Operator::Eq => scalar(value),
        Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => !value.is_null() && scalar(value),
        Operator::In => value
            .as_array()
            .map_or(false, |items| items.iter().all(scalar)),
        _ => false,
    }
}

/// Select the keys of `tree` matching `operator` applied to `value`.
///
/// Range operators stay inside the value's family: `$gt: 5` never returns
/// strings. Keys come back ascending.
pub fn matching_keys<'t, V>(
    tree: &'t BTreeMap<IndexKey, V>,
    index: &str,
    operator: &Operator,
    value: &Value,
) -> IndexResult<Vec<&'t IndexKey>> {
    let scalar = |v: &Value| {
        IndexKey::from_json(v)
            .ok_or_else(|| IndexError::invalid_value(index, format!("{} expects a scalar, got {}", operator, v)))
    };

    let keys = match operator {
        Operator::Eq => {
            let key = scalar(value)?;
            tree.get_key_value(&key).map(|(k, _)| k).into_iter().collect()
        }
        Operator::Gt => {
            let key = scalar(value)?;
            in_family(tree, Bound::Excluded(&key), Bound::Unbounded, &key)
        }
        Operator::Gte => {
            let key = scalar(value)?;
            in_family(tree, Bound::Included(&key), Bound::Unbounded, &key)
        }
        Operator::Lt => {
            let key = scalar(value)?;
            in_family(tree, Bound::Unbounded, Bound::Excluded(&key), &key)
        }
        Operator::Lte => {
            let key = scalar(value)?;
            in_family(tree, Bound::Unbounded, Bound::Included(&key), &key)
        }
        Operator::In => {
            let items = value
                .as_array()
                .ok_or_else(|| IndexError::invalid_value(index, "$in expects an array"))?;
            let wanted = items.iter().map(scalar).collect::<IndexResult<BTreeSet<_>>>()?;
            wanted
                .iter()
                .filter_map(|key| tree.get_key_value(key).map(|(k, _)| k))
                .collect()
        }
        other => return Err(IndexError::unsupported(index, other)),
    };
    Ok(keys)
}

fn in_family<'t, V>(
    tree: &'t BTreeMap<IndexKey, V>,
    lower: Bound<&IndexKey>,
    upper: Bound<&IndexKey>,
    anchor: &IndexKey,
) -> Vec<&'t IndexKey> {
    tree.range::<IndexKey, _>((lower, upper))
        .map(|(k, _)| k)
        .filter(|k| k.same_family(anchor))
        .collect()
}

/// Value key → record keys, for one indexed path
#[derive(Debug, Default)]
pub struct IndexTree {
    tree: BTreeMap<IndexKey, Vec<IndexKey>>,
}

impl IndexTree {
    pub fn new() -> Self {
        Self {
            tree: BTreeMap::new(),
        }
    }

    /// Insert a record key under a value key.
    ///
    /// Record keys stay sorted ascending and unique.
    pub fn insert(&mut self, value: IndexKey, record: IndexKey) {
        let records = self.tree.entry(value).or_default();
        match records.binary_search(&record) {
            Ok(_) => {}
            Err(pos) => records.insert(pos, record),
        }
    }

    /// Remove a record key from under a value key.
    ///
    /// Drops the value key once nothing is left under it.
    pub fn remove(&mut self, value: &IndexKey, record: &IndexKey) {
        if let Some(records) = self.tree.get_mut(value) {
            if let Ok(pos) = records.binary_search(record) {
                records.remove(pos);
            }
            if records.is_empty() {
                self.tree.remove(value);
            }
        }
    }

    /// Record keys for a lookup, ordered by value then record key.
    ///
    /// `direction` orders the values only; record keys under one value stay
    /// ascending, matching a stable sort of records taken in key order.
    ///
    /// A record indexed under several values is returned once, at its first
    /// position in traversal order. `value == None` traverses everything.
    pub fn lookup(
        &self,
        index: &str,
        operator: &Operator,
        value: Option<&Value>,
        direction: SortDirection,
    ) -> IndexResult<Vec<IndexKey>> {
        let mut values: Vec<&IndexKey> = match value {
            Some(value) => matching_keys(&self.tree, index, operator, value)?,
            None => self.tree.keys().collect(),
        };
        if direction.is_desc() {
            values.reverse();
        }

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for value in values {
            let Some(records) = self.tree.get(value) else {
                continue;
            };
            for record in records {
                if seen.insert(record) {
                    out.push(record.clone());
                }
            }
        }
        Ok(out)
    }

    /// Number of distinct value keys
    pub fn key_count(&self) -> usize {
        self.tree.len()
    }

    /// Number of (value, record) entries
    pub fn entry_count(&self) -> usize {
        self.tree.values().map(Vec::len).sum()
    }
}
