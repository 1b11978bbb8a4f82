//! Key stream combinators
//!
//! - `intersect`: keys present in every input, in the order of the first
//!   input (the driver)
//! - `union`: keys present in any input, deduplicated, fan-in order
//! - `distinct`: drops keys already emitted
//!
//! Errors are yielded once and end the stream. Dropping a combined stream
//! drops every input.

use std::collections::{HashSet, VecDeque};

use futures_util::future::join_all;
use futures_util::stream::{self, select_all};
use futures_util::StreamExt;

use crate::index::{IndexKey, IndexResult, KeyStream};

/// Deduplicate keys across batches. Empty batches are skipped.
pub fn distinct<'a>(input: KeyStream<'a>) -> KeyStream<'a> {
    stream::unfold((input, HashSet::new(), false), |(mut input, mut seen, failed)| async move {
        if failed {
            return None;
        }
        loop {
            match input.next().await? {
                Ok(batch) => {
                    let fresh: Vec<IndexKey> = batch.into_iter().filter(|key| seen.insert(key.clone())).collect();
                    if !fresh.is_empty() {
                        return Some((Ok(fresh), (input, seen, false)));
                    }
                }
                Err(e) => return Some((Err(e), (input, seen, true))),
            }
        }
    })
    .boxed()
}

/// Concurrent fan-in of every input, deduplicated
pub fn union<'a>(inputs: Vec<KeyStream<'a>>) -> KeyStream<'a> {
    distinct(select_all(inputs).boxed())
}

struct Input<'a> {
    stream: KeyStream<'a>,
    seen: HashSet<IndexKey>,
    exhausted: bool,
}

struct IntersectState<'a> {
    driver: KeyStream<'a>,
    driver_exhausted: bool,
    others: Vec<Input<'a>>,
    pending: VecDeque<IndexKey>,
    queued: HashSet<IndexKey>,
    failed: bool,
}

/// Keys present in every input, ordered by the first input.
///
/// Driver keys wait in a queue until every other input has produced them.
/// Only inputs that have not yet produced the queue head are pulled. A head
/// missing from an exhausted input is dropped.
pub fn intersect<'a>(mut inputs: Vec<KeyStream<'a>>) -> KeyStream<'a> {
    if inputs.is_empty() {
        return stream::empty().boxed();
    }
    let driver = inputs.remove(0);
    if inputs.is_empty() {
        return distinct(driver);
    }

    let state = IntersectState {
        driver,
        driver_exhausted: false,
        others: inputs
            .into_iter()
            .map(|stream| Input {
                stream,
                seen: HashSet::new(),
                exhausted: false,
            })
            .collect(),
        pending: VecDeque::new(),
        queued: HashSet::new(),
        failed: false,
    };

    stream::unfold(state, intersect_next).boxed()
}

async fn intersect_next<'a>(
    mut state: IntersectState<'a>,
) -> Option<(IndexResult<Vec<IndexKey>>, IntersectState<'a>)> {
    if state.failed {
        return None;
    }

    loop {
        let mut ready = Vec::new();
        while let Some(head) = state.pending.front() {
            if state.others.iter().all(|input| input.seen.contains(head)) {
                if let Some(key) = state.pending.pop_front() {
                    ready.push(key);
                }
            } else if state
                .others
                .iter()
                .any(|input| input.exhausted && !input.seen.contains(head))
            {
                state.pending.pop_front();
            } else {
                break;
            }
        }
        if !ready.is_empty() {
            return Some((Ok(ready), state));
        }

        match state.pending.front().cloned() {
            None => {
                if state.driver_exhausted {
                    return None;
                }
                match state.driver.next().await {
                    Some(Ok(batch)) => {
                        for key in batch {
                            if state.queued.insert(key.clone()) {
                                state.pending.push_back(key);
                            }
                        }
                    }
                    Some(Err(e)) => {
                        state.failed = true;
                        return Some((Err(e), state));
                    }
                    None => state.driver_exhausted = true,
                }
            }
            Some(head) => {
                let mut failure = None;
                {
                    let pulls = state
                        .others
                        .iter_mut()
                        .filter(|input| !input.exhausted && !input.seen.contains(&head))
                        .map(|input| async move {
                            let item = input.stream.next().await;
                            (input, item)
                        });

                    for (input, item) in join_all(pulls).await {
                        match item {
                            Some(Ok(batch)) => input.seen.extend(batch),
                            Some(Err(e)) => failure = Some(e),
                            None => input.exhausted = true,
                        }
                    }
                }
                if let Some(e) = failure {
                    state.failed = true;
                    return Some((Err(e), state));
                }
            }
        }
    }
}
