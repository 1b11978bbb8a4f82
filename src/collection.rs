//! Queryable collection
//!
//! Ties a schema, a predicate matcher and configuration together and runs
//! `find` / `explain` with logging and metrics.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::{ConfigError, QueryConfig};
use crate::executor::{CriteriaMatcher, ExecutionResult, ExecutorError, PredicateMatcher, QueryExecutor};
use crate::index::{IndexError, MemoryPrimaryIndex, RangeIndex, Record, TextIndex};
use crate::observability::{MetricsSnapshot, ObservationScope, QueryMetrics};
use crate::planner::{ExplainPlan, FindOptions, PlannerError, QueryPlanner, Schema};
use crate::text_index::{TextIndexOptions, TokenizerHooks};

pub type QueryResult<T> = Result<T, QueryError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl QueryError {
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::Planner(e) => e.code(),
            QueryError::Executor(e) => e.code(),
            QueryError::Index(e) => e.code(),
            QueryError::Config(e) => e.code(),
        }
    }
}

/// Declarative index registration, as read from a schema file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IndexSpec {
    /// Ordered index on one dotted path
    Range { name: String, path: String },
    /// Fuzzy text index over string paths, reached through `operator`
    Text {
        operator: String,
        paths: Vec<String>,
        options: TextIndexOptions,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSpec {
    #[serde(default = "default_id_attr")]
    pub id_attr: String,
    #[serde(default)]
    pub indices: Vec<IndexSpec>,
}

fn default_id_attr() -> String {
    "id".to_string()
}

pub struct Collection {
    schema: Schema,
    matcher: Arc<dyn PredicateMatcher>,
    config: QueryConfig,
    metrics: QueryMetrics,
}

impl Collection {
    pub fn new(schema: Schema, config: QueryConfig) -> QueryResult<Self> {
        config.validate()?;
        Ok(Self {
            schema,
            matcher: Arc::new(CriteriaMatcher::new()),
            config,
            metrics: QueryMetrics::new(),
        })
    }

    /// Build in-memory indices over `records` as `spec` describes
    pub fn build(spec: &CollectionSpec, records: Vec<Record>, config: QueryConfig) -> QueryResult<Self> {
        config.validate()?;
        let primary = Arc::new(MemoryPrimaryIndex::with_records(&spec.id_attr, records.iter().cloned())?);
        let mut schema = Schema::new(&spec.id_attr, primary);

        for index in &spec.indices {
            schema = match index {
                IndexSpec::Range { name, path } => {
                    let range = RangeIndex::build(name.as_str(), path.as_str(), &spec.id_attr, &records)?;
                    schema.bind_path(path.as_str(), Arc::new(range))
                }
                IndexSpec::Text {
                    operator,
                    paths,
                    options,
                } => {
                    let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
                    let text = TextIndex::build(
                        options.clone(),
                        TokenizerHooks::none(),
                        operator.as_str(),
                        &spec.id_attr,
                        &paths,
                        &records,
                        config.shard_chunk_size,
                    )?;
                    schema.bind_operator(operator.as_str(), Arc::new(text))
                }
            };
        }

        Self::new(schema, config)
    }

    /// Replace the predicate matcher
    pub fn with_matcher(mut self, matcher: Arc<dyn PredicateMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Plan and execute a find.
    ///
    /// Fails as a whole: an index error or malformed criteria yield no
    /// partial result.
    pub async fn find(&self, criteria: &Value, options: &FindOptions) -> QueryResult<ExecutionResult> {
        let scope = ObservationScope::new("FIND");

        match self.run(criteria, options).await {
            Ok(result) => {
                self.record(&result);
                let returned = result.returned_count.to_string();
                let scanned = result.scanned_count.to_string();
                scope.complete_with_fields(&[
                    ("greedy", if result.diagnostics.greedy { "true" } else { "false" }),
                    ("returned", returned.as_str()),
                    ("scanned", scanned.as_str()),
                ]);
                Ok(result)
            }
            Err(err) => {
                self.metrics.increment_queries_failed();
                scope.fail(err.code(), &err.to_string());
                Err(err)
            }
        }
    }

    /// Plan without executing
    pub fn explain(&self, criteria: &Value, options: &FindOptions) -> ExplainPlan {
        match QueryPlanner::new(&self.schema).plan(criteria, options) {
            Ok(plan) => ExplainPlan::from_plan(&plan),
            Err(err) => ExplainPlan::from_error(&err),
        }
    }

    async fn run(&self, criteria: &Value, options: &FindOptions) -> QueryResult<ExecutionResult> {
        let plan = QueryPlanner::new(&self.schema).plan(criteria, options)?;
        let executor = QueryExecutor::new(&self.schema, self.matcher.as_ref())
            .with_batch_size(self.config.default_batch_size);
        Ok(executor.execute(&plan).await?)
    }

    fn record(&self, result: &ExecutionResult) {
        self.metrics.increment_queries_executed();
        if result.diagnostics.missed {
            self.metrics.increment_full_scans();
        }
        if result.diagnostics.greedy {
            self.metrics.increment_greedy_plans();
        }
        self.metrics.add_records_fetched(result.fetched_count as u64);
        self.metrics.add_records_matched(result.returned_count as u64);
    }
}
