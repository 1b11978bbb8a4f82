//! Query executor
//!
//! Executes query plans against a schema's indices.
//!
//! Execution flow:
//! 1. Fill membership slots of the filter from their lookups; the plan
//!    later replays those keys instead of running the lookups again
//! 2. Missed plan: stream the primary full scan
//!    Otherwise: drain the merged key stream in batches, taking records
//!    from the per-find cache first and fetching the rest by key
//! 3. Test every record with the matcher
//! 4. Stop at `skip + limit` matches only when the plan is greedy
//! 5. Sort, skip, limit

use std::collections::HashMap;

use futures_util::{StreamExt, TryStreamExt};
use serde_json::Value;

use crate::index::{record_key, CursorOptions, IndexKey};
use crate::planner::{QueryPlan, RecordCache, Schema};

use super::errors::{ExecutorError, ExecutorResult};
use super::filters::PredicateMatcher;
use super::result::ExecutionResult;
use super::sorter::ResultSorter;

/// Batch size when the find has no limit
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Matches collected so far, plus the early-stop rule
struct Collector {
    matches: Vec<Value>,
    window: Option<usize>,
    greedy: bool,
    scanned: usize,
    fetched: usize,
    stopped_early: bool,
}

impl Collector {
    fn new(plan: &QueryPlan) -> Self {
        Self {
            matches: Vec::new(),
            window: plan.options.window(),
            greedy: plan.greedy,
            scanned: 0,
            fetched: 0,
            stopped_early: false,
        }
    }

    /// Test one record; returns true once no more records are needed
    fn offer(&mut self, matcher: &dyn PredicateMatcher, filter: &Value, record: Value) -> bool {
        self.scanned += 1;
        if matcher.matches(filter, &record) {
            self.matches.push(record);
        }
        self.is_full()
    }

    fn is_full(&mut self) -> bool {
        let full = self.greedy && self.window.map_or(false, |w| self.matches.len() >= w);
        if full {
            self.stopped_early = true;
        }
        full
    }
}

pub struct QueryExecutor<'a> {
    schema: &'a Schema,
    matcher: &'a dyn PredicateMatcher,
    batch_size: usize,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(schema: &'a Schema, matcher: &'a dyn PredicateMatcher) -> Self {
        Self {
            schema,
            matcher,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Batch size used when the find sets no limit; zero is ignored
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        if batch_size > 0 {
            self.batch_size = batch_size;
        }
        self
    }

    /// Executes a query plan.
    ///
    /// Any index failure aborts the find; no partial result is returned.
    pub async fn execute(&self, plan: &QueryPlan) -> ExecutorResult<ExecutionResult> {
        let cache = RecordCache::new();
        let (filter, materialized) = self.materialize_filter(plan, &cache).await?;
        let mut collector = Collector::new(plan);

        if plan.missed {
            self.full_scan(&filter, &mut collector).await?;
        } else {
            self.indexed_scan(plan, &filter, &cache, &materialized, &mut collector)
                .await?;
        }

        Ok(Self::finalize(plan, collector))
    }

    fn batch_size(&self, plan: &QueryPlan) -> usize {
        plan.options.window().filter(|w| *w > 0).unwrap_or(self.batch_size)
    }

    /// Replace each membership slot's empty `$in` with the keys its lookup
    /// yields. Returns the filter and the keys per slot.
    async fn materialize_filter(
        &self,
        plan: &QueryPlan,
        cache: &RecordCache,
    ) -> ExecutorResult<(Value, Vec<Vec<IndexKey>>)> {
        let mut filter = plan.filter.clone();
        let mut materialized = Vec::with_capacity(plan.memberships.len());
        for slot in &plan.memberships {
            let keys: Vec<IndexKey> = slot
                .lookup
                .open(self.schema, cache, &[], None)
                .try_concat()
                .await?;
            let target = filter
                .pointer_mut(&slot.pointer)
                .ok_or_else(|| ExecutorError::InvalidPlan(format!("no membership slot at {}", slot.pointer)))?;
            *target = Value::Array(keys.iter().map(IndexKey::to_json).collect());
            materialized.push(keys);
        }
        Ok((filter, materialized))
    }

    async fn full_scan(&self, filter: &Value, collector: &mut Collector) -> ExecutorResult<()> {
        let options = CursorOptions::default().chunk(Some(self.batch_size));
        let mut records = self.schema.primary().records(None, options);

        while let Some(batch) = records.next().await {
            for record in batch? {
                if collector.offer(self.matcher, filter, record) {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    async fn indexed_scan(
        &self,
        plan: &QueryPlan,
        filter: &Value,
        cache: &RecordCache,
        materialized: &[Vec<IndexKey>],
        collector: &mut Collector,
    ) -> ExecutorResult<()> {
        let batch_size = self.batch_size(plan);
        let mut keys = plan
            .open(self.schema, cache, materialized, Some(batch_size))
            .ok_or_else(|| ExecutorError::InvalidPlan("plan has no key source".to_string()))?;

        while let Some(batch) = keys.next().await {
            let batch = batch?;
            for chunk in batch.chunks(batch_size) {
                if self.process_chunk(chunk, filter, cache, collector).await? {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// Returns true once the collector is full
    async fn process_chunk(
        &self,
        keys: &[IndexKey],
        filter: &Value,
        cache: &RecordCache,
        collector: &mut Collector,
    ) -> ExecutorResult<bool> {
        let mut found: HashMap<IndexKey, Value> = HashMap::with_capacity(keys.len());
        let mut missing = Vec::new();
        for key in keys {
            match cache.get(key) {
                Some(record) => {
                    found.insert(key.clone(), record);
                }
                None => missing.push(key.clone()),
            }
        }

        if !missing.is_empty() {
            let primary = self.schema.primary();
            let fetched = primary.find(&missing).await?;
            collector.fetched += fetched.len();
            for record in fetched {
                let key = record_key(&record, self.schema.id_attr(), primary.name())?;
                found.insert(key, record);
            }
        }

        for key in keys {
            if let Some(record) = found.remove(key) {
                if collector.offer(self.matcher, filter, record) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn finalize(plan: &QueryPlan, collector: Collector) -> ExecutionResult {
        let Collector {
            mut matches,
            scanned,
            fetched,
            stopped_early,
            ..
        } = collector;
        let options = &plan.options;

        // Stable, so an index-ordered greedy result is left as is
        ResultSorter::sort(&mut matches, &options.sort);

        let available = matches.len().saturating_sub(options.skip);
        let records: Vec<Value> = matches
            .into_iter()
            .skip(options.skip)
            .take(options.limit.unwrap_or(usize::MAX))
            .collect();
        let limit_applied = options
            .limit
            .map_or(false, |limit| available > limit || (stopped_early && records.len() == limit));

        ExecutionResult {
            returned_count: records.len(),
            records,
            diagnostics: plan.diagnostics.clone(),
            scanned_count: scanned,
            fetched_count: fetched,
            limit_applied,
        }
    }
}
