//! # CLI Command Implementations
//!
//! Each subcommand of the `scoped-repo` tool lives in its own file and
//! provides:
//! - An `Args` struct that defines the command-specific arguments, derived
//!   using `clap`.
//! - An `execute` function that takes the parsed `Args` and calls into the
//!   `scoped_repo` library.

pub mod completions;
pub mod run;
pub mod validate;
