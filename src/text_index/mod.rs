//! Fuzzy n-gram text indexing
//!
//! # Design
//!
//! - Text is cut into fixed-length character n-grams
//! - Postings keep one entry per token occurrence
//! - A record matches when enough query tokens hit it (fixed or automatic
//!   threshold)
//! - Large indices are spread into shards that are queried together
//! - Deferred indices materialize their postings on first query

mod errors;
mod inverted;
mod loader;
mod options;
mod shards;
mod snapshot;
mod tokenizer;

pub use errors::{TextIndexError, TextIndexResult};
pub use inverted::{InvertedIndex, PostingKey, PostingMap};
pub use loader::{FileLoader, FnLoader, LoadFuture, PostingLoader};
pub use options::{TextIndexOptions, AUTO_THRESHOLD_PERCENT};
pub use shards::{cursor_all, find_all, TextCursor};
pub use snapshot::{decode as decode_snapshot, encode as encode_snapshot};
pub use tokenizer::{PostHook, PreHook, Tokenizer, TokenizerHooks};
