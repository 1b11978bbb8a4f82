//! Multi-shard text queries
//!
//! Shards produced by `InvertedIndex::spread` are queried together. Hit
//! counts are summed across shards before the threshold applies, so a token
//! list split over several shards scores the same as before splitting.
//!
//! The query text is tokenized once with the first shard's tokenizer; all
//! shards of one parent share the same tokenizer configuration.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use futures_util::future::join_all;
use futures_util::stream::{self, BoxStream, FuturesUnordered};
use futures_util::StreamExt;

use super::errors::TextIndexResult;
use super::inverted::{InvertedIndex, PostingKey};
use super::options::TextIndexOptions;

/// Stream of key batches produced while shards complete
pub type TextCursor<'a, K> = BoxStream<'a, TextIndexResult<Vec<K>>>;

/// Queries every shard and returns keys whose combined hit count reaches the
/// threshold. Fails if any shard fails.
pub async fn find_all<K: PostingKey>(shards: &[InvertedIndex<K>], value: &str) -> TextIndexResult<Vec<K>> {
    let Some(first) = shards.first() else {
        return Ok(Vec::new());
    };
    let tokens = first.tokenizer().tokenize(value);

    let partials = join_all(shards.iter().map(|shard| shard.weights(&tokens))).await;

    let mut combined: HashMap<K, usize> = HashMap::new();
    for partial in partials {
        for (key, weight) in partial? {
            *combined.entry(key).or_insert(0) += weight;
        }
    }

    let options = first.options();
    Ok(combined
        .into_iter()
        .filter(|(_, count)| options.meets_threshold(*count, tokens.len()))
        .map(|(key, _)| key)
        .collect())
}

struct MergeState<'a, K, F> {
    pending: FuturesUnordered<F>,
    shard_count: usize,
    completed: usize,
    token_count: usize,
    options: &'a TextIndexOptions,
    running: HashMap<K, usize>,
    emitted: HashSet<K>,
    failed: bool,
}

/// Streams keys as soon as the partial sums of completed shards cross the
/// threshold.
///
/// Shards run concurrently and are merged in completion order. Each key is
/// emitted at most once; a batch lists its keys in reverse order of crossing.
/// After a shard failure the error is yielded and the stream ends.
pub fn cursor_all<'a, K: PostingKey>(shards: &'a [InvertedIndex<K>], value: &str) -> TextCursor<'a, K> {
    let Some(first) = shards.first() else {
        return stream::empty().boxed();
    };
    let tokens = Arc::new(first.tokenizer().tokenize(value));

    let pending: FuturesUnordered<_> = shards
        .iter()
        .map(|shard| {
            let tokens = Arc::clone(&tokens);
            async move { shard.weights(&tokens).await }
        })
        .collect();

    let state = MergeState {
        pending,
        shard_count: shards.len(),
        completed: 0,
        token_count: tokens.len(),
        options: first.options(),
        running: HashMap::new(),
        emitted: HashSet::new(),
        failed: false,
    };

    stream::unfold(state, merge_next).boxed()
}

async fn merge_next<'a, K, F>(mut state: MergeState<'a, K, F>) -> Option<(TextIndexResult<Vec<K>>, MergeState<'a, K, F>)>
where
    K: PostingKey,
    F: Future<Output = TextIndexResult<HashMap<K, usize>>>,
{
    loop {
        if state.failed || state.completed == state.shard_count {
            return None;
        }

        let result = state.pending.next().await?;
        state.completed += 1;

        let partial = match result {
            Ok(partial) => partial,
            Err(e) => {
                state.failed = true;
                return Some((Err(e), state));
            }
        };

        let mut batch = Vec::new();
        for (key, weight) in partial {
            if state.emitted.contains(&key) {
                continue;
            }
            let total = state.running.entry(key.clone()).or_insert(0);
            *total += weight;

            if state.options.meets_threshold(*total, state.token_count) {
                state.running.remove(&key);
                state.emitted.insert(key.clone());
                batch.push(key);
            }
        }

        if batch.is_empty() {
            continue;
        }
        batch.reverse();
        return Some((Ok(batch), state));
    }
}
