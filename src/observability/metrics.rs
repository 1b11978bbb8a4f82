//! Query metrics
//!
//! - Counters only, monotonic
//! - Relaxed atomics; values are exact once queries have finished

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for one collection
#[derive(Debug, Default)]
pub struct QueryMetrics {
    queries_executed: AtomicU64,
    queries_failed: AtomicU64,
    full_scans: AtomicU64,
    greedy_plans: AtomicU64,
    records_fetched: AtomicU64,
    records_matched: AtomicU64,
}

impl QueryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_queries_executed(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_failed(&self) {
        self.queries_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_full_scans(&self) {
        self.full_scans.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_greedy_plans(&self) {
        self.greedy_plans.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_records_fetched(&self, count: u64) {
        self.records_fetched.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_records_matched(&self, count: u64) {
        self.records_matched.fetch_add(count, Ordering::Relaxed);
    }

    pub fn queries_executed(&self) -> u64 {
        self.queries_executed.load(Ordering::Relaxed)
    }

    pub fn queries_failed(&self) -> u64 {
        self.queries_failed.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            queries_failed: self.queries_failed.load(Ordering::Relaxed),
            full_scans: self.full_scans.load(Ordering::Relaxed),
            greedy_plans: self.greedy_plans.load(Ordering::Relaxed),
            records_fetched: self.records_fetched.load(Ordering::Relaxed),
            records_matched: self.records_matched.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub queries_executed: u64,
    pub queries_failed: u64,
    pub full_scans: u64,
    pub greedy_plans: u64,
    pub records_fetched: u64,
    pub records_matched: u64,
}
