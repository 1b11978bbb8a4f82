//! N-gram inverted index
//!
//! Maps token → posting list of record keys. A key appears in a list once per
//! occurrence of the token in any value added under it; nothing is
//! deduplicated, so repeated tokens weigh more at query time.
//!
//! # Lifecycle
//!
//! - Eager: constructed with empty postings, filled through `add`.
//! - Deferred: constructed from a loader; the first query materializes the
//!   postings exactly once. Without a loader every query fails `NotLoaded`.
//!
//! `add` must not run concurrently with queries on the same instance.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;
use std::mem;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::OnceCell;

use super::errors::{TextIndexError, TextIndexResult};
use super::loader::PostingLoader;
use super::options::TextIndexOptions;
use super::snapshot;
use super::tokenizer::{Tokenizer, TokenizerHooks};
use crate::observability::Logger;

/// Token → posting list, ordered by token
pub type PostingMap<K> = BTreeMap<String, Vec<K>>;

/// Bounds every posting key satisfies
pub trait PostingKey: Clone + Eq + Hash + Send + Sync + 'static {}

impl<T: Clone + Eq + Hash + Send + Sync + 'static> PostingKey for T {}

/// Fuzzy n-gram inverted index
pub struct InvertedIndex<K> {
    options: TextIndexOptions,
    tokenizer: Tokenizer,
    postings: OnceCell<PostingMap<K>>,
    loader: Option<Arc<dyn PostingLoader<K>>>,
}

impl<K: PostingKey> InvertedIndex<K> {
    /// Creates an index without tokenizer hooks.
    ///
    /// With `options.is_loaded == false` the index is deferred and has no
    /// loader, so queries fail until data is supplied.
    pub fn new(options: TextIndexOptions) -> TextIndexResult<Self> {
        Self::with_hooks(options, TokenizerHooks::none())
    }

    /// Creates an index with tokenizer hooks.
    pub fn with_hooks(options: TextIndexOptions, hooks: TokenizerHooks) -> TextIndexResult<Self> {
        options.validate()?;
        let postings = if options.is_loaded {
            OnceCell::new_with(Some(PostingMap::new()))
        } else {
            OnceCell::new()
        };

        Ok(Self {
            tokenizer: Tokenizer::from_options(&options, hooks),
            options,
            postings,
            loader: None,
        })
    }

    /// Creates a deferred index whose postings come from `loader`.
    pub fn lazy(
        options: TextIndexOptions,
        hooks: TokenizerHooks,
        loader: Arc<dyn PostingLoader<K>>,
    ) -> TextIndexResult<Self> {
        options.validate()?;
        let options = TextIndexOptions {
            is_loaded: false,
            ..options
        };

        Ok(Self {
            tokenizer: Tokenizer::from_options(&options, hooks),
            options,
            postings: OnceCell::new(),
            loader: Some(loader),
        })
    }

    fn from_postings(options: TextIndexOptions, tokenizer: Tokenizer, postings: PostingMap<K>) -> Self {
        Self {
            options: TextIndexOptions {
                is_loaded: true,
                ..options
            },
            tokenizer,
            postings: OnceCell::new_with(Some(postings)),
            loader: None,
        }
    }

    pub fn options(&self) -> &TextIndexOptions {
        &self.options
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Returns true once postings are materialized
    pub fn is_loaded(&self) -> bool {
        self.postings.initialized()
    }

    fn loaded(&self) -> TextIndexResult<&PostingMap<K>> {
        self.postings
            .get()
            .ok_or_else(|| TextIndexError::not_loaded(&self.options.id))
    }

    /// Materializes the postings if needed.
    ///
    /// Concurrent callers share a single load. A failed load leaves the index
    /// unloaded and the next call tries again.
    pub async fn ensure_loaded(&self) -> TextIndexResult<&PostingMap<K>> {
        if let Some(postings) = self.postings.get() {
            return Ok(postings);
        }

        let loader = self
            .loader
            .as_ref()
            .ok_or_else(|| TextIndexError::not_loaded(&self.options.id))?;

        let postings = self
            .postings
            .get_or_try_init(|| async {
                loader
                    .load()
                    .await
                    .map_err(|reason| TextIndexError::load_failure(&self.options.id, reason))
            })
            .await?;

        let token_count = postings.len().to_string();
        Logger::info(
            "TEXT_INDEX_LOADED",
            &[("index", self.options.id.as_str()), ("tokens", token_count.as_str())],
        );
        Ok(postings)
    }

    /// Indexes one text under `key`.
    pub fn add(&mut self, key: K, text: &str) -> TextIndexResult<()> {
        self.add_all(key, [text])
    }

    /// Indexes a sequence of texts under `key`; tokens accumulate.
    pub fn add_all<I, S>(&mut self, key: K, texts: I) -> TextIndexResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens = self.tokenizer.tokenize_all(texts);
        let id = &self.options.id;
        let postings = self
            .postings
            .get_mut()
            .ok_or_else(|| TextIndexError::not_loaded(id))?;

        for token in tokens {
            postings.entry(token).or_default().push(key.clone());
        }
        Ok(())
    }

    /// All tokens in lexicographic order
    pub fn keys(&self) -> TextIndexResult<Vec<&str>> {
        Ok(self.loaded()?.keys().map(String::as_str).collect())
    }

    /// Total number of posting entries
    pub fn entry_count(&self) -> TextIndexResult<usize> {
        Ok(self.loaded()?.values().map(Vec::len).sum())
    }

    /// Raw per-key hit counts for already tokenized query text.
    pub async fn weights(&self, tokens: &[String]) -> TextIndexResult<HashMap<K, usize>> {
        let postings = self.ensure_loaded().await?;

        let mut weights = HashMap::new();
        for token in tokens {
            if let Some(keys) = postings.get(token) {
                for key in keys {
                    *weights.entry(key.clone()).or_insert(0) += 1;
                }
            }
        }
        Ok(weights)
    }

    /// Fuzzy match: keys whose hit count reaches the threshold.
    pub async fn query(&self, value: &str) -> TextIndexResult<Vec<K>> {
        let tokens = self.tokenizer.tokenize(value);
        let weights = self.weights(&tokens).await?;

        Ok(weights
            .into_iter()
            .filter(|(_, count)| self.options.meets_threshold(*count, tokens.len()))
            .map(|(key, _)| key)
            .collect())
    }

    /// Partitions the postings into shards.
    ///
    /// Tokens are walked in order and packed until the next list would push a
    /// shard past `chunk_size` entries. A list longer than `chunk_size * 10`
    /// is cut into slices of that size, one shard each.
    pub fn spread(&self, chunk_size: usize) -> TextIndexResult<Vec<InvertedIndex<K>>> {
        if chunk_size == 0 {
            return Err(TextIndexError::InvalidChunkSize(chunk_size));
        }
        let postings = self.loaded()?;
        let cap = chunk_size.saturating_mul(10);

        let mut parts: Vec<PostingMap<K>> = Vec::new();
        let mut current = PostingMap::new();
        let mut current_len = 0usize;

        for (token, keys) in postings {
            if keys.len() > cap {
                if !current.is_empty() {
                    parts.push(mem::take(&mut current));
                    current_len = 0;
                }
                for slice in keys.chunks(cap) {
                    let mut single = PostingMap::new();
                    single.insert(token.clone(), slice.to_vec());
                    parts.push(single);
                }
                continue;
            }

            if !current.is_empty() && current_len + keys.len() > chunk_size {
                parts.push(mem::take(&mut current));
                current_len = 0;
            }
            current.insert(token.clone(), keys.clone());
            current_len += keys.len();
        }
        if !current.is_empty() {
            parts.push(current);
        }

        let shard_count = parts.len().to_string();
        Logger::trace(
            "TEXT_INDEX_SPREAD",
            &[("index", self.options.id.as_str()), ("shards", shard_count.as_str())],
        );

        Ok(parts
            .into_iter()
            .enumerate()
            .map(|(n, part)| {
                let options = self.options.renamed(format!("{}:{}", self.options.id, n));
                Self::from_postings(options, self.tokenizer.clone(), part)
            })
            .collect())
    }

    /// Serializes the postings (options are not included).
    pub fn serialize(&self) -> TextIndexResult<Vec<u8>>
    where
        K: Serialize,
    {
        snapshot::encode(self.loaded()?)
    }

    /// Rebuilds an index from `serialize` output and separately kept options.
    pub fn deserialize(data: &[u8], options: TextIndexOptions) -> TextIndexResult<Self>
    where
        K: DeserializeOwned,
    {
        options.validate()?;
        let postings = snapshot::decode(data)?;
        let tokenizer = Tokenizer::from_options(&options, TokenizerHooks::none());
        Ok(Self::from_postings(options, tokenizer, postings))
    }

    /// Replaces the tokenizer hooks, e.g. after `deserialize`.
    pub fn with_tokenizer_hooks(mut self, hooks: TokenizerHooks) -> Self {
        self.tokenizer = Tokenizer::from_options(&self.options, hooks);
        self
    }
}

impl<K> fmt::Debug for InvertedIndex<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvertedIndex")
            .field("options", &self.options)
            .field("loaded", &self.postings.initialized())
            .field("has_loader", &self.loader.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_index::loader::FnLoader;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn continents() -> InvertedIndex<u32> {
        let options = TextIndexOptions::new("continents")
            .with_gram_len(3)
            .with_auto_threshold(true);
        let mut index = InvertedIndex::new(options).unwrap();
        index.add(1, "Angola").unwrap();
        index.add(2, "Africa").unwrap();
        index
    }

    #[tokio::test]
    async fn test_fuzzy_match_angoli() {
        let index = continents();
        let matches = index.query("Angoli").await.unwrap();
        assert_eq!(matches, vec![1]);
    }

    #[tokio::test]
    async fn test_unrelated_text_no_match() {
        let index = continents();
        assert!(index.query("Europe").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_add_accumulates() {
        let options = TextIndexOptions::new("notes").with_actuation_limit(2);
        let mut index = InvertedIndex::new(options).unwrap();
        index.add(9u32, "abc").unwrap();

        // one hit so far, below the fixed threshold
        assert!(index.query("abc").await.unwrap().is_empty());

        index.add(9, "abc").unwrap();
        assert_eq!(index.query("abc").await.unwrap(), vec![9]);
    }

    #[tokio::test]
    async fn test_add_all_multi_value() {
        let options = TextIndexOptions::new("tags").with_actuation_limit(1);
        let mut index = InvertedIndex::new(options).unwrap();
        index.add_all(4u32, ["red", "blue"]).unwrap();

        assert_eq!(index.query("blue").await.unwrap(), vec![4]);
        assert_eq!(index.entry_count().unwrap(), 3);
    }

    #[test]
    fn test_keys_sorted() {
        let index = continents();
        let keys = index.keys().unwrap();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert!(keys.contains(&"ang"));
    }

    #[tokio::test]
    async fn test_deferred_without_loader_fails() {
        let options = TextIndexOptions::new("cold").deferred();
        let index: InvertedIndex<u32> = InvertedIndex::new(options).unwrap();
        let err = index.query("anything").await.unwrap_err();
        assert_eq!(err.code(), "AERO_TEXT_NOT_LOADED");
    }

    #[tokio::test]
    async fn test_lazy_loads_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let loader = FnLoader(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async {
                let mut postings = PostingMap::new();
                postings.insert("abc".to_string(), vec![5u32, 5]);
                Ok::<_, String>(postings)
            }
        });

        let index = InvertedIndex::lazy(
            TextIndexOptions::new("lazy"),
            TokenizerHooks::none(),
            Arc::new(loader),
        )
        .unwrap();
        assert!(!index.is_loaded());

        assert_eq!(index.query("abc").await.unwrap(), vec![5]);
        assert_eq!(index.query("abc").await.unwrap(), vec![5]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(index.is_loaded());
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let loader = FnLoader(move || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    return Err("backend offline".to_string());
                }
                let mut postings = PostingMap::new();
                postings.insert("xyz".to_string(), vec![1u32, 1]);
                Ok(postings)
            }
        });

        let index = InvertedIndex::lazy(
            TextIndexOptions::new("flaky"),
            TokenizerHooks::none(),
            Arc::new(loader),
        )
        .unwrap();

        let err = index.query("xyz").await.unwrap_err();
        assert_eq!(err.code(), "AERO_TEXT_LOAD_FAILED");
        assert!(!index.is_loaded());

        assert_eq!(index.query("xyz").await.unwrap(), vec![1]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_spread_rejects_zero_chunk() {
        let err = continents().spread(0).unwrap_err();
        assert_eq!(err.code(), "AERO_TEXT_INVALID_CHUNK_SIZE");
    }

    #[test]
    fn test_spread_packs_in_token_order() {
        let options = TextIndexOptions::new("packed").with_gram_len(1);
        let mut index = InvertedIndex::new(options).unwrap();
        // tokens a, b, c with one entry each
        index.add(1u32, "a b c").unwrap();

        let shards = index.spread(2).unwrap();
        assert_eq!(shards.len(), 2);
        assert_eq!(shards[0].keys().unwrap(), vec!["a", "b"]);
        assert_eq!(shards[1].keys().unwrap(), vec!["c"]);
        assert_eq!(shards[0].options().id, "packed:0");
        assert_eq!(shards[1].options().id, "packed:1");
    }

    #[test]
    fn test_spread_splits_oversized_list() {
        let options = TextIndexOptions::new("hot").with_gram_len(1);
        let mut index = InvertedIndex::new(options).unwrap();
        for key in 0..25u32 {
            index.add(key, "z").unwrap();
        }

        // cap = 10, the 25-entry list becomes slices of 10, 10, 5
        let shards = index.spread(1).unwrap();
        let sizes: Vec<usize> = shards.iter().map(|s| s.entry_count().unwrap()).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
    }

    #[tokio::test]
    async fn test_shards_keep_hooks() {
        let hooks = TokenizerHooks::none().with_pre(|text| text.replace('_', " "));
        let options = TextIndexOptions::new("hooked").with_actuation_limit(1);
        let mut index = InvertedIndex::with_hooks(options, hooks).unwrap();
        index.add(3u32, "foo_bar").unwrap();

        let shards = index.spread(100).unwrap();
        let found: HashSet<u32> = shards[0].query("bar_baz").await.unwrap().into_iter().collect();
        assert!(found.contains(&3));
    }

    #[tokio::test]
    async fn test_serialize_roundtrip_keeps_behavior() {
        let index = continents();
        let bytes = index.serialize().unwrap();
        let restored: InvertedIndex<u32> =
            InvertedIndex::deserialize(&bytes, index.options().clone()).unwrap();

        assert_eq!(restored.keys().unwrap(), index.keys().unwrap());
        assert_eq!(restored.query("Angoli").await.unwrap(), vec![1]);
    }
}
