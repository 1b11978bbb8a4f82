//! CLI module for aeroquery
//!
//! Provides command-line interface for:
//! - query: one-shot find over a JSON lines file
//! - explain: one-shot plan of the same find

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, QueryArgs};
pub use commands::{explain, query, run_command};
pub use errors::{CliError, CliResult};
pub use io::{read_json_file, read_records, write_error, write_response};
