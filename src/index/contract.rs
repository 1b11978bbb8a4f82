//! Index cursor contract
//!
//! Every index the planner can use implements `IndexCursor`. The primary
//! index additionally implements `PrimaryIndex` so keys can be hydrated into
//! records. The planner and executor only ever see these traits.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::btree::DEFAULT_CHUNK_SIZE;
use super::errors::{IndexError, IndexResult};
use super::key::IndexKey;

/// A stored record
pub type Record = Value;

/// Batches of keys produced by an index cursor
pub type KeyStream<'a> = BoxStream<'a, IndexResult<Vec<IndexKey>>>;

/// Batches of records produced by a primary index
pub type RecordStream<'a> = BoxStream<'a, IndexResult<Vec<Record>>>;

/// Future returned by `PrimaryIndex::find`
pub type FindFuture<'a> = Pin<Box<dyn Future<Output = IndexResult<Vec<Record>>> + Send + 'a>>;

/// Lookup operator handed to an index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Gt,
    Gte,
    In,
    Lt,
    Lte,
    Ne,
    Nin,
    Regex,
    /// Index-specific top-level operator such as `$text`
    Custom(String),
}

impl Operator {
    /// Parse a comparison operator name. Custom operators are never parsed
    /// here; they are known only through schema bindings.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "$eq" => Some(Operator::Eq),
            "$gt" => Some(Operator::Gt),
            "$gte" => Some(Operator::Gte),
            "$in" => Some(Operator::In),
            "$lt" => Some(Operator::Lt),
            "$lte" => Some(Operator::Lte),
            "$ne" => Some(Operator::Ne),
            "$nin" => Some(Operator::Nin),
            "$regex" => Some(Operator::Regex),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Operator::Eq => "$eq",
            Operator::Gt => "$gt",
            Operator::Gte => "$gte",
            Operator::In => "$in",
            Operator::Lt => "$lt",
            Operator::Lte => "$lte",
            Operator::Ne => "$ne",
            Operator::Nin => "$nin",
            Operator::Regex => "$regex",
            Operator::Custom(name) => name,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn is_desc(&self) -> bool {
        matches!(self, SortDirection::Desc)
    }
}

/// Options for opening a cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CursorOptions {
    /// Operator applied to the lookup value (defaults to equality)
    pub operator: Option<Operator>,
    /// Emit keys ordered by the indexed value
    pub sort: Option<SortDirection>,
    /// Preferred batch size
    pub chunk_size: Option<usize>,
}

impl CursorOptions {
    pub fn with_operator(operator: Operator) -> Self {
        Self {
            operator: Some(operator),
            ..Self::default()
        }
    }

    pub fn sorted(direction: SortDirection) -> Self {
        Self {
            sort: Some(direction),
            ..Self::default()
        }
    }

    pub fn chunk(mut self, chunk_size: Option<usize>) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

/// Capability every queryable index provides
pub trait IndexCursor: Send + Sync {
    /// Index name, used in diagnostics
    fn name(&self) -> &str;

    /// Returns true if this index can serve `operator` with `value`.
    ///
    /// Must be pure; the planner may call it any number of times.
    fn test_indice(&self, operator: &Operator, value: &Value) -> bool;

    /// Returns true if a cursor opened without a value can traverse every
    /// record in indexed-value order
    fn can_sort(&self) -> bool {
        false
    }

    /// Open a cursor over matching keys.
    ///
    /// `value == None` means a full traversal (ordered when `options.sort` is
    /// set).
    fn cursor<'a>(&'a self, value: Option<&'a Value>, options: CursorOptions) -> KeyStream<'a>;
}

/// The keyed store of a collection
pub trait PrimaryIndex: IndexCursor {
    /// Stream records matching `value` against the primary key, or every
    /// record when `value` is None
    fn records<'a>(&'a self, value: Option<&'a Value>, options: CursorOptions) -> RecordStream<'a>;

    /// Fetch records for `keys`. Missing keys are skipped.
    fn find<'a>(&'a self, keys: &'a [IndexKey]) -> FindFuture<'a>;
}

/// Split eagerly computed results into a stream of batches
pub fn batched<'a, T: Send + 'a>(items: Vec<T>, chunk_size: Option<usize>) -> BoxStream<'a, IndexResult<Vec<T>>> {
    let size = chunk_size.filter(|n| *n > 0).unwrap_or(DEFAULT_CHUNK_SIZE);
    let mut batches = Vec::new();
    let mut items = items.into_iter();
    loop {
        let batch: Vec<T> = items.by_ref().take(size).collect();
        if batch.is_empty() {
            break;
        }
        batches.push(Ok(batch));
    }
    stream::iter(batches).boxed()
}

/// A stream that yields a single error
pub fn failed<'a, T: Send + 'a>(err: IndexError) -> BoxStream<'a, IndexResult<T>> {
    stream::once(async move { Err(err) }).boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_parse_roundtrip() {
        for name in ["$eq", "$gt", "$gte", "$in", "$lt", "$lte", "$ne", "$nin", "$regex"] {
            assert_eq!(Operator::parse(name).unwrap().as_str(), name);
        }
        assert_eq!(Operator::parse("$text"), None);
        assert_eq!(Operator::Custom("$text".into()).as_str(), "$text");
    }

    #[tokio::test]
    async fn test_batched_splits() {
        let batches: Vec<_> = batched((0..5).collect::<Vec<i32>>(), Some(2)).collect().await;
        let sizes: Vec<usize> = batches.into_iter().map(|b| b.unwrap().len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn test_sort_direction_serde() {
        let dir: SortDirection = serde_json::from_str("\"desc\"").unwrap();
        assert!(dir.is_desc());
    }
}
