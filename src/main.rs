//! # Scoped Repository CLI
//!
//! This is the binary entry point for the `scoped-repo` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Setting up logging for the library's diagnostic output.
//! - Executing the appropriate command based on the parsed arguments.
//!
//! The repository itself lives in the library crate; the binary only runs
//! scenario files against it and renders the results.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
