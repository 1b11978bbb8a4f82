//! aeroquery CLI entry point
//!
//! Parses arguments, dispatches to the CLI module, and reports failures as
//! a JSON error on stdout with a non-zero exit code.

use aeroquery::cli::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    if let Err(e) = cli::run_command(cli.command).await {
        if cli::write_error(e.code(), &e.to_string()).is_err() {
            eprintln!("{}: {}", e.code(), e);
        }
        std::process::exit(1);
    }
}
