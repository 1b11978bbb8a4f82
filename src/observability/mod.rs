//! Observability for aeroquery
//!
//! - Structured JSON logging with a process-wide minimum severity
//! - Begin/complete scopes around queries
//! - Per-collection query counters
//!
//! Observability is read-only: nothing here affects query results.
//!
//! ```ignore
//! use aeroquery::observability::{Logger, ObservationScope};
//!
//! Logger::info("TEXT_INDEX_LOADED", &[("index", "names")]);
//!
//! let scope = ObservationScope::new("FIND");
//! // ... run the query ...
//! scope.complete();
//! ```

mod logger;
mod metrics;
mod scope;

pub use logger::{Logger, Severity};
pub use metrics::{MetricsSnapshot, QueryMetrics};
pub use scope::ObservationScope;
