//! Per-find record cache
//!
//! Primary-bound plan stages already hold full records; they park them here
//! so the executor does not fetch them again. Stages insert, nothing removes.
//! The lock is never contended; it only keeps plan streams `Send`.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::index::{IndexKey, Record};

#[derive(Debug, Default)]
pub struct RecordCache {
    records: RwLock<HashMap<IndexKey, Record>>,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: IndexKey, record: Record) {
        let mut records = self.records.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        records.insert(key, record);
    }

    pub fn get(&self, key: &IndexKey) -> Option<Record> {
        let records = self.records.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        records.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
