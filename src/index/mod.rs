//! Index subsystem for aeroquery
//!
//! Defines the cursor contract every index implements and ships the
//! reference in-memory indices.
//!
//! # Design Principles
//!
//! - The planner sees only `IndexCursor` / `PrimaryIndex` trait objects
//! - Deterministic: BTreeMap iteration order, sorted record keys
//! - Cursors stream batches of keys; errors travel inside the stream
//!
//! # Invariants
//!
//! - `test_indice` is pure
//! - A cursor opened without a value on a sortable index visits every record

mod btree;
mod contract;
mod errors;
mod key;
mod path;
mod primary;
mod range;
mod text;

pub use btree::{matching_keys, supports_lookup, IndexTree, DEFAULT_CHUNK_SIZE};
pub use contract::{
    batched, failed, CursorOptions, FindFuture, IndexCursor, KeyStream, Operator, PrimaryIndex, Record,
    RecordStream, SortDirection,
};
pub use errors::{IndexError, IndexResult};
pub use key::IndexKey;
pub use path::{collect_values, resolve_path};
pub use primary::{record_key, MemoryPrimaryIndex};
pub use range::RangeIndex;
pub use text::TextIndex;
