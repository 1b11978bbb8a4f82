//! CLI argument definitions using clap
//!
//! Commands:
//! - aeroquery query --data <jsonl> --schema <json> --criteria <json>
//! - aeroquery explain --data <jsonl> --schema <json> --criteria <json>

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::planner::{FindOptions, SortSpec};

/// aeroquery - query JSON records through pluggable indices
#[derive(Parser, Debug)]
#[command(name = "aeroquery")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a find and print the matching records
    Query(QueryArgs),

    /// Print the plan a find would use
    Explain(QueryArgs),
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Records, one JSON object per line
    #[arg(long)]
    pub data: PathBuf,

    /// Collection schema (id attribute and indices)
    #[arg(long)]
    pub schema: PathBuf,

    /// Criteria as a JSON object
    #[arg(long, default_value = "{}")]
    pub criteria: String,

    /// Sort field, as `field`, `field:asc` or `field:desc`; repeatable
    #[arg(long)]
    pub sort: Vec<SortSpec>,

    #[arg(long, default_value_t = 0)]
    pub skip: usize,

    #[arg(long)]
    pub limit: Option<usize>,

    /// Engine configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Overrides the configured log level
    #[arg(long)]
    pub log_level: Option<String>,
}

impl QueryArgs {
    pub fn find_options(&self) -> FindOptions {
        FindOptions {
            sort: self.sort.clone(),
            skip: self.skip,
            limit: self.limit,
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
