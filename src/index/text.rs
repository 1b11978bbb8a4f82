//! Fuzzy text index behind a custom operator
//!
//! Wraps the shards of an `InvertedIndex<IndexKey>`. Criteria reach it only
//! through its operator, e.g. `{"$text": "angoli"}`.

use futures_util::StreamExt;
use serde_json::Value;

use super::contract::{failed, CursorOptions, IndexCursor, KeyStream, Operator, Record};
use super::errors::{IndexError, IndexResult};
use super::key::IndexKey;
use super::path::collect_values;
use super::primary::record_key;
use crate::text_index::{cursor_all, InvertedIndex, TextIndexOptions, TokenizerHooks};

#[derive(Debug)]
pub struct TextIndex {
    name: String,
    operator: String,
    shards: Vec<InvertedIndex<IndexKey>>,
}

impl TextIndex {
    /// Wrap existing shards (or a single unsplit, possibly deferred, index)
    pub fn new(name: impl Into<String>, operator: impl Into<String>, shards: Vec<InvertedIndex<IndexKey>>) -> Self {
        Self {
            name: name.into(),
            operator: operator.into(),
            shards,
        }
    }

    /// Index the string values found at `paths` and spread the result into
    /// shards of `chunk_size` entries.
    pub fn build<'r, I>(
        options: TextIndexOptions,
        hooks: TokenizerHooks,
        operator: impl Into<String>,
        id_attr: &str,
        paths: &[&str],
        records: I,
        chunk_size: usize,
    ) -> IndexResult<Self>
    where
        I: IntoIterator<Item = &'r Record>,
    {
        let name = options.id.clone();
        let mut index = InvertedIndex::with_hooks(options, hooks)?;

        for record in records {
            let key = record_key(record, id_attr, &name)?;
            let texts: Vec<&str> = paths
                .iter()
                .flat_map(|path| collect_values(record, path))
                .filter_map(Value::as_str)
                .collect();
            index.add_all(key, texts)?;
        }

        let shards = index.spread(chunk_size)?;
        Ok(Self::new(name, operator, shards))
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn shards(&self) -> &[InvertedIndex<IndexKey>] {
        &self.shards
    }
}

impl IndexCursor for TextIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn test_indice(&self, operator: &Operator, value: &Value) -> bool {
        matches!(operator, Operator::Custom(name) if *name == self.operator) && value.is_string()
    }

    fn cursor<'a>(&'a self, value: Option<&'a Value>, _options: CursorOptions) -> KeyStream<'a> {
        match value.and_then(Value::as_str) {
            Some(text) => cursor_all(&self.shards, text)
                .map(|batch| batch.map_err(IndexError::from))
                .boxed(),
            None => failed(IndexError::invalid_value(
                &self.name,
                format!("{} expects a string", self.operator),
            )),
        }
    }
}
