//! In-memory primary index
//!
//! Records ordered by primary key. Serves key lookups, full ordered scans and
//! batch hydration for the executor.

use std::collections::BTreeMap;

use serde_json::Value;

use super::btree::{matching_keys, supports_lookup};
use super::contract::{
    batched, failed, CursorOptions, FindFuture, IndexCursor, KeyStream, Operator, PrimaryIndex, Record,
    RecordStream,
};
use super::errors::{IndexError, IndexResult};
use super::key::IndexKey;
use super::path::resolve_path;

/// Extract the primary key of a record.
///
/// The key must be a non-null scalar.
pub fn record_key(record: &Record, id_attr: &str, index: &str) -> IndexResult<IndexKey> {
    resolve_path(record, id_attr)
        .and_then(IndexKey::from_json)
        .filter(|key| *key != IndexKey::Null)
        .ok_or_else(|| IndexError::MissingKey {
            index: index.to_string(),
            path: id_attr.to_string(),
        })
}

/// BTreeMap-backed primary store
#[derive(Debug)]
pub struct MemoryPrimaryIndex {
    name: String,
    id_attr: String,
    records: BTreeMap<IndexKey, Record>,
}

impl MemoryPrimaryIndex {
    pub fn new(id_attr: impl Into<String>) -> Self {
        Self {
            name: "primary".to_string(),
            id_attr: id_attr.into(),
            records: BTreeMap::new(),
        }
    }

    /// Build from records; fails on the first record without a key
    pub fn with_records<I>(id_attr: impl Into<String>, records: I) -> IndexResult<Self>
    where
        I: IntoIterator<Item = Record>,
    {
        let mut index = Self::new(id_attr);
        for record in records {
            index.insert(record)?;
        }
        Ok(index)
    }

    /// Insert or replace a record, returning the previous one
    pub fn insert(&mut self, record: Record) -> IndexResult<Option<Record>> {
        let key = record_key(&record, &self.id_attr, &self.name)?;
        Ok(self.records.insert(key, record))
    }

    pub fn remove(&mut self, key: &IndexKey) -> Option<Record> {
        self.records.remove(key)
    }

    pub fn get(&self, key: &IndexKey) -> Option<&Record> {
        self.records.get(key)
    }

    pub fn id_attr(&self) -> &str {
        &self.id_attr
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records in key order
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    fn select(&self, value: Option<&Value>, options: &CursorOptions) -> IndexResult<Vec<&IndexKey>> {
        let operator = options.operator.clone().unwrap_or(Operator::Eq);
        let mut keys = match value {
            Some(value) => matching_keys(&self.records, &self.name, &operator, value)?,
            None => self.records.keys().collect(),
        };
        if options.sort.map_or(false, |dir| dir.is_desc()) {
            keys.reverse();
        }
        Ok(keys)
    }
}

impl IndexCursor for MemoryPrimaryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn test_indice(&self, operator: &Operator, value: &Value) -> bool {
        supports_lookup(operator, value)
    }

    fn can_sort(&self) -> bool {
        true
    }

    fn cursor<'a>(&'a self, value: Option<&'a Value>, options: CursorOptions) -> KeyStream<'a> {
        match self.select(value, &options) {
            Ok(keys) => batched(keys.into_iter().cloned().collect(), options.chunk_size),
            Err(e) => failed(e),
        }
    }
}

impl PrimaryIndex for MemoryPrimaryIndex {
    fn records<'a>(&'a self, value: Option<&'a Value>, options: CursorOptions) -> RecordStream<'a> {
        match self.select(value, &options) {
            Ok(keys) => {
                let records = keys.into_iter().filter_map(|k| self.records.get(k).cloned()).collect();
                batched(records, options.chunk_size)
            }
            Err(e) => failed(e),
        }
    }

    fn find<'a>(&'a self, keys: &'a [IndexKey]) -> FindFuture<'a> {
        Box::pin(async move { Ok(keys.iter().filter_map(|k| self.records.get(k).cloned()).collect()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SortDirection;
    use futures_util::TryStreamExt;
    use serde_json::json;

    fn people() -> MemoryPrimaryIndex {
        MemoryPrimaryIndex::with_records(
            "id",
            (0..5).map(|i| json!({"id": i, "name": format!("p{}", i)})),
        )
        .unwrap()
    }

    async fn keys_of(stream: KeyStream<'_>) -> Vec<IndexKey> {
        stream.try_concat().await.unwrap()
    }

    #[test]
    fn test_missing_key_rejected() {
        let err = MemoryPrimaryIndex::with_records("id", vec![json!({"name": "x"})]).unwrap_err();
        assert_eq!(err.code(), "AERO_INDEX_MISSING_KEY");
    }

    #[test]
    fn test_insert_replaces() {
        let mut index = people();
        let previous = index.insert(json!({"id": 2, "name": "new"})).unwrap();
        assert_eq!(previous.unwrap()["name"], "p2");
        assert_eq!(index.len(), 5);
    }

    #[tokio::test]
    async fn test_range_cursor() {
        let index = people();
        let value = json!(3);
        let keys = keys_of(index.cursor(Some(&value), CursorOptions::with_operator(Operator::Lt))).await;
        assert_eq!(keys, vec![IndexKey::from_int(0), IndexKey::from_int(1), IndexKey::from_int(2)]);
    }

    #[tokio::test]
    async fn test_full_scan_desc() {
        let index = people();
        let records: Vec<Record> = index
            .records(None, CursorOptions::sorted(SortDirection::Desc).chunk(Some(2)))
            .try_concat()
            .await
            .unwrap();
        let ids: Vec<i64> = records.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![4, 3, 2, 1, 0]);
    }

    #[tokio::test]
    async fn test_find_skips_missing() {
        let index = people();
        let keys = vec![IndexKey::from_int(1), IndexKey::from_int(42)];
        let found = index.find(&keys).await.unwrap();
        assert_eq!(found, vec![json!({"id": 1, "name": "p1"})]);
    }

    #[tokio::test]
    async fn test_bad_value_surfaces_in_stream() {
        let index = people();
        let value = json!({"nested": true});
        let err = index
            .cursor(Some(&value), CursorOptions::with_operator(Operator::Gt))
            .try_concat()
            .await
            .unwrap_err();
        assert_eq!(err.code(), "AERO_INDEX_INVALID_VALUE");
    }
}
