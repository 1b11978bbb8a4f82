//! Secondary index over one record path
//!
//! Multikey: every scalar reachable at the path (array elements included) is
//! indexed. Records with nothing at the path are indexed under `Null`, so an
//! ordered traversal visits every record.

use serde_json::Value;

use super::btree::{supports_lookup, IndexTree};
use super::contract::{batched, failed, CursorOptions, IndexCursor, KeyStream, Operator, Record, SortDirection};
use super::errors::IndexResult;
use super::key::IndexKey;
use super::path::collect_values;
use super::primary::record_key;

#[derive(Debug)]
pub struct RangeIndex {
    name: String,
    path: String,
    id_attr: String,
    tree: IndexTree,
}

impl RangeIndex {
    pub fn new(name: impl Into<String>, path: impl Into<String>, id_attr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            id_attr: id_attr.into(),
            tree: IndexTree::new(),
        }
    }

    /// Build an index over `records`
    pub fn build<'r, I>(
        name: impl Into<String>,
        path: impl Into<String>,
        id_attr: impl Into<String>,
        records: I,
    ) -> IndexResult<Self>
    where
        I: IntoIterator<Item = &'r Record>,
    {
        let mut index = Self::new(name, path, id_attr);
        for record in records {
            index.insert(record)?;
        }
        Ok(index)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn value_keys(&self, record: &Record) -> Vec<IndexKey> {
        let keys: Vec<IndexKey> = collect_values(record, &self.path)
            .into_iter()
            .filter_map(IndexKey::from_json)
            .collect();
        if keys.is_empty() {
            vec![IndexKey::Null]
        } else {
            keys
        }
    }

    pub fn insert(&mut self, record: &Record) -> IndexResult<()> {
        let id = record_key(record, &self.id_attr, &self.name)?;
        for value in self.value_keys(record) {
            self.tree.insert(value, id.clone());
        }
        Ok(())
    }

    pub fn remove(&mut self, record: &Record) -> IndexResult<()> {
        let id = record_key(record, &self.id_attr, &self.name)?;
        for value in self.value_keys(record) {
            self.tree.remove(&value, &id);
        }
        Ok(())
    }

    pub fn key_count(&self) -> usize {
        self.tree.key_count()
    }

    pub fn entry_count(&self) -> usize {
        self.tree.entry_count()
    }
}

impl IndexCursor for RangeIndex {
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
        let operator = options.operator.clone().unwrap_or(Operator::Eq);
        let direction = options.sort.unwrap_or(SortDirection::Asc);
        match self.tree.lookup(&self.name, &operator, value, direction) {
            Ok(keys) => batched(keys, options.chunk_size),
            Err(e) => failed(e),
        }
    }
}
