//! # Validate Command Implementation
//!
//! This module implements the `validate` subcommand, which parses a scenario
//! file and reports its steps without touching a repository.

use anyhow::{bail, Result};
use clap::Args;
use std::path::PathBuf;

use scoped_repo::output::{emoji, OutputConfig};
use scoped_repo::scenario;

/// Parse a scenario file without executing it
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the scenario YAML file.
    #[arg(value_name = "FILE")]
    pub scenario: PathBuf,

    /// List every parsed step.
    #[arg(long, short)]
    pub verbose: bool,
}

/// Execute the `validate` command.
pub fn execute(args: ValidateArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let path = &args.scenario;

    match scenario::from_file(path) {
        Ok(steps) => {
            println!(
                "{} {} is valid ({} step(s))",
                emoji(&out, "✅", "[OK]"),
                path.display(),
                steps.len()
            );
            if args.verbose {
                for (index, step) in steps.iter().enumerate() {
                    println!("  {:>3}. {}", index + 1, step.describe());
                }
            }
            Ok(())
        }
        Err(e) => {
            println!(
                "{} {} is invalid: {}",
                emoji(&out, "❌", "[ERR]"),
                path.display(),
                e
            );
            bail!("Scenario validation failed");
        }
    }
}
