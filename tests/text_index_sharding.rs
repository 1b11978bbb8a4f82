//! Text Index Sharding Tests
//!
//! Tests for text index invariants:
//! - Spreading keeps every posting entry and bounds shard size
//! - Querying all shards at once matches streaming them
//! - Streamed keys are never emitted twice
//! - Deferred indices load once, from snapshots or loaders

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use aeroquery::text_index::{
    cursor_all, decode_snapshot, find_all, FileLoader, FnLoader, InvertedIndex, PostingMap, TextIndexOptions, Tokenizer,
    TokenizerHooks,
};
use futures_util::{StreamExt, TryStreamExt};

// =============================================================================
// Helper Functions
// =============================================================================

const WORDS: &[&str] = &[
    "Angola", "Africa", "Argentina", "Armenia", "Austria", "Australia", "Algeria", "Albania", "Andorra",
    "Bolivia", "Botswana", "Brazil", "Bulgaria", "Burundi", "Cambodia", "Cameroon", "Canada", "Chile",
];

fn auto_options(id: &str) -> TextIndexOptions {
    TextIndexOptions::new(id).with_auto_threshold(true)
}

fn build_index() -> InvertedIndex<u32> {
    let mut index = InvertedIndex::new(auto_options("countries")).unwrap();
    for (i, word) in WORDS.iter().enumerate() {
        index.add(i as u32, word).unwrap();
    }
    index
}

/// Merge shard postings back into one map, preserving multiplicities
fn merged_postings(shards: &[InvertedIndex<u32>]) -> PostingMap<u32> {
    let mut merged = PostingMap::new();
    for shard in shards {
        let postings: PostingMap<u32> = decode_snapshot(&shard.serialize().unwrap()).unwrap();
        for (token, keys) in postings {
            merged.entry(token).or_insert_with(Vec::new).extend(keys);
        }
    }
    merged
}

fn sorted(mut keys: Vec<u32>) -> Vec<u32> {
    keys.sort();
    keys
}

// =============================================================================
// Tokenizer Tests
// =============================================================================

/// A word of length n yields n - g + 1 grams, or none when shorter than g.
#[test]
fn test_token_counts() {
    let tokenizer = Tokenizer::new(3, true, TokenizerHooks::none()).unwrap();
    assert_eq!(tokenizer.tokenize("angola").len(), 4);
    assert_eq!(tokenizer.tokenize("abc").len(), 1);
    assert_eq!(tokenizer.tokenize("ab").len(), 0);
    assert_eq!(tokenizer.tokenize("ab angola").len(), 4);
}

// =============================================================================
// Spread Tests
// =============================================================================

/// Union of shard postings equals the original postings.
#[test]
fn test_spread_is_complete() {
    let index = build_index();
    let original: PostingMap<u32> = decode_snapshot(&index.serialize().unwrap()).unwrap();

    for chunk_size in [1, 3, 7, 1000] {
        let shards = index.spread(chunk_size).unwrap();
        let merged = merged_postings(&shards);
        assert_eq!(merged, original, "chunk size {}", chunk_size);
        assert_eq!(
            shards.iter().map(|s| s.entry_count().unwrap()).sum::<usize>(),
            index.entry_count().unwrap()
        );
    }
}

/// No shard exceeds ten times the chunk size.
#[test]
fn test_spread_bounds_shard_size() {
    let mut index = InvertedIndex::new(auto_options("bulk")).unwrap();
    for i in 0..200u32 {
        index.add(i, "common").unwrap();
    }
    index.add(500, "rare").unwrap();

    let shards = index.spread(2).unwrap();
    for shard in &shards {
        assert!(shard.entry_count().unwrap() <= 20);
    }
    assert_eq!(
        shards.iter().map(|s| s.entry_count().unwrap()).sum::<usize>(),
        index.entry_count().unwrap()
    );
}

/// Shards are named after their parent.
#[test]
fn test_shard_ids() {
    let shards = build_index().spread(5).unwrap();
    assert!(shards.len() > 1);
    for (n, shard) in shards.iter().enumerate() {
        assert_eq!(shard.options().id, format!("countries:{}", n));
    }
}

// =============================================================================
// Sharded Query Tests
// =============================================================================

/// Angoli matches Angola only, sharded or not.
#[tokio::test]
async fn test_fuzzy_match_across_shards() {
    let index = build_index();
    assert_eq!(index.query("Angoli").await.unwrap(), vec![0]);

    let shards = index.spread(3).unwrap();
    assert_eq!(find_all(&shards, "Angoli").await.unwrap(), vec![0]);
}

/// find_all and cursor_all return the same key set.
#[tokio::test]
async fn test_find_all_matches_cursor_all() {
    let shards = build_index().spread(4).unwrap();

    for query in ["Angoli", "Austral", "burundi", "ca", "Armenia Albania"] {
        let all = sorted(find_all(&shards, query).await.unwrap());
        let streamed = sorted(cursor_all(&shards, query).try_concat().await.unwrap());
        assert_eq!(all, streamed, "query {}", query);
    }
}

/// cursor_all never yields a key twice and never yields empty batches.
#[tokio::test]
async fn test_cursor_all_emits_once() {
    let shards = build_index().spread(1).unwrap();
    let batches: Vec<Vec<u32>> = cursor_all(&shards, "Australia Austria").try_collect().await.unwrap();

    let mut seen = HashSet::new();
    for batch in &batches {
        assert!(!batch.is_empty());
        for key in batch {
            assert!(seen.insert(*key), "key {} emitted twice", key);
        }
    }
    assert!(seen.contains(&5));
}

/// A higher fixed threshold never matches more keys.
#[tokio::test]
async fn test_threshold_monotonic() {
    let mut previous = usize::MAX;
    for limit in 1..6 {
        let mut index = InvertedIndex::new(TextIndexOptions::new("fixed").with_actuation_limit(limit)).unwrap();
        for (i, word) in WORDS.iter().enumerate() {
            index.add(i as u32, word).unwrap();
        }
        let hits = index.query("Armenia").await.unwrap().len();
        assert!(hits <= previous);
        previous = hits;
    }
}

// =============================================================================
// Lazy Loading Tests
// =============================================================================

/// A deferred index loads from a snapshot file on first query.
#[tokio::test]
async fn test_file_loader_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("countries.snap");
    tokio::fs::write(&path, build_index().serialize().unwrap()).await.unwrap();

    let lazy: InvertedIndex<u32> =
        InvertedIndex::lazy(auto_options("countries"), TokenizerHooks::none(), Arc::new(FileLoader::new(&path)))
            .unwrap();
    assert!(!lazy.is_loaded());
    assert_eq!(lazy.query("Angoli").await.unwrap(), vec![0]);
    assert!(lazy.is_loaded());
}

/// Concurrent first queries share a single load.
#[tokio::test]
async fn test_concurrent_queries_load_once() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = loads.clone();
    let loader = FnLoader(move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            let mut postings = PostingMap::new();
            postings.insert("ang".to_string(), vec![1u32]);
            postings.insert("ngo".to_string(), vec![1u32]);
            Ok::<_, String>(postings)
        }
    });

    let lazy = InvertedIndex::lazy(auto_options("lazy"), TokenizerHooks::none(), Arc::new(loader)).unwrap();
    let queries: Vec<_> = (0..8).map(|_| lazy.query("angola")).collect();
    let results = futures_util::future::join_all(queries).await;

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    for result in results {
        assert_eq!(result.unwrap(), vec![1]);
    }
}

/// A deferred index without loader fails with NotLoaded.
#[tokio::test]
async fn test_deferred_without_loader() {
    let index: InvertedIndex<u32> = InvertedIndex::new(auto_options("later").deferred()).unwrap();
    let err = cursor_all(std::slice::from_ref(&index), "angola")
        .next()
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(err.code(), "AERO_TEXT_NOT_LOADED");
}
