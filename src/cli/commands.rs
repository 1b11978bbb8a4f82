//! CLI command implementations
//!
//! Both commands load the data file into an in-memory collection built from
//! the schema file, then run a find or an explain.

use serde_json::{json, Value};

use crate::collection::{Collection, CollectionSpec};
use crate::config::QueryConfig;
use crate::observability::{Logger, Severity};

use super::args::{Command, QueryArgs};
use super::errors::{CliError, CliResult};
use super::io::{read_json_file, read_records, write_response};

/// Dispatch a parsed command
pub async fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Query(args) => query(&args).await,
        Command::Explain(args) => explain(&args),
    }
}

/// Run a find and write the records with execution stats
pub async fn query(args: &QueryArgs) -> CliResult<()> {
    let (collection, criteria) = prepare(args)?;
    let result = collection.find(&criteria, &args.find_options()).await?;

    write_response(json!({
        "records": result.records,
        "returned": result.returned_count,
        "scanned": result.scanned_count,
        "limit_applied": result.limit_applied,
        "diagnostics": result.diagnostics,
    }))
}

/// Write the plan for a find; a rejected query is reported, not an error
pub fn explain(args: &QueryArgs) -> CliResult<()> {
    let (collection, criteria) = prepare(args)?;
    let explain = collection.explain(&criteria, &args.find_options());

    write_response(json!({
        "plan": explain,
        "text": explain.to_string(),
    }))
}

fn prepare(args: &QueryArgs) -> CliResult<(Collection, Value)> {
    let config = load_config(args)?;
    Logger::set_min_severity(config.severity()?);

    let criteria: Value = serde_json::from_str(&args.criteria)
        .map_err(|e| CliError::InvalidArgument(format!("--criteria: {}", e)))?;
    let spec: CollectionSpec = read_json_file(&args.schema)?;
    let records = read_records(&args.data)?;

    let collection = Collection::build(&spec, records, config)?;
    Ok((collection, criteria))
}

fn load_config(args: &QueryArgs) -> CliResult<QueryConfig> {
    let mut config = match &args.config {
        Some(path) => QueryConfig::load(path)?,
        None => QueryConfig {
            log_level: Severity::Warn.as_str().to_ascii_lowercase(),
            ..QueryConfig::default()
        },
    };
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
        config.validate()?;
    }
    Ok(config)
}
