//! # Run Command Implementation
//!
//! This module implements the `run` subcommand, which executes a scenario
//! file against a fresh repository and reports the outcome of every step.
//!
//! ## Output
//!
//! - **Default**: one line per step with a PASS/FAIL marker and detail.
//! - **`--json`**: the step report and the final store contents as JSON.
//! - **`--tree`**: the final store rendered as a scope/category/item tree.
//!
//! The command exits with an error when any step fails.

use anyhow::{bail, Context, Result};
use clap::Args;
use ptree::{print_tree, TreeItem};
use serde::Serialize;
use std::borrow::Cow;
use std::path::PathBuf;

use scoped_repo::output::{dim, emoji, status, OutputConfig};
use scoped_repo::repository::Repository;
use scoped_repo::scenario::{self, Dump, Report, Runner};

/// Execute a scenario file and report each step
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the scenario YAML file.
    #[arg(value_name = "FILE")]
    pub scenario: PathBuf,

    /// Print the report and final store as JSON.
    #[arg(long, conflicts_with = "tree")]
    pub json: bool,

    /// Print the final store as a tree after the step report.
    #[arg(long)]
    pub tree: bool,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    passed: bool,
    report: &'a Report,
    store: &'a Dump,
}

/// Execute the `run` command.
///
/// # Arguments
/// * `args` - The command arguments
/// * `color_flag` - The value of the global --color flag ("always", "never", or "auto")
pub fn execute(args: RunArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let steps = scenario::from_file(&args.scenario)
        .with_context(|| format!("Failed to load scenario from {}", args.scenario.display()))?;

    let repo = Repository::new();
    let mut runner = Runner::new(&repo);
    let report = runner.run(&steps);
    let dump = runner.dump();

    if args.json {
        let output = JsonOutput {
            passed: report.passed(),
            report: &report,
            store: &dump,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "{} Running scenario: {}",
            emoji(&out, "▶️", "[RUN]"),
            args.scenario.display()
        );
        for outcome in &report.outcomes {
            println!(
                "  {} {:>3}. {}  {}",
                status(&out, outcome.passed),
                outcome.index,
                outcome.step,
                dim(&out, &outcome.detail)
            );
        }
        if args.tree {
            print_tree(&build_tree(&dump)).context("Failed to display store tree")?;
        }
    }

    let failed = report.failures().count();
    if failed > 0 {
        bail!("{} of {} step(s) failed", failed, report.outcomes.len());
    }
    if !args.json {
        println!(
            "{} All {} step(s) passed",
            emoji(&out, "✅", "[OK]"),
            report.outcomes.len()
        );
    }
    Ok(())
}

/// Build the scope -> category -> item tree for display
fn build_tree(dump: &Dump) -> TreeNode {
    let scopes = dump
        .iter()
        .map(|(scope, categories)| TreeNode {
            label: scope.clone(),
            children: categories
                .iter()
                .map(|(category, items)| TreeNode {
                    label: category.clone(),
                    children: items
                        .iter()
                        .map(|(item, value)| TreeNode::leaf(format!("{} = {}", item, value)))
                        .collect(),
                })
                .collect(),
        })
        .collect();
    TreeNode {
        label: "store".to_string(),
        children: scopes,
    }
}

/// Tree node structure for ptree visualization
#[derive(Clone)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeNode {
    fn leaf(label: String) -> Self {
        Self {
            label,
            children: vec![],
        }
    }
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: std::io::Write>(
        &self,
        f: &mut W,
        _style: &ptree::Style,
    ) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        Cow::Borrowed(&self.children)
    }
}
