//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_scenario(scenarios::PASSING);
//!     fixture.command().arg("run").arg(fixture.scenario_path()).assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
#[allow(unused_imports)]
pub mod prelude {
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    pub use super::scenarios;
    pub use super::TestFixture;
}

/// Scenario YAML snippets for testing.
#[allow(dead_code)]
pub mod scenarios {
    /// Every step passes.
    pub const PASSING: &str = r#"
- set: { scope: global, category: Login, item: user, value: alice }
- set: { scope: global, category: Login, item: port, value: "8080" }
- clone: { from: global, to: worker-a }
- get: { scope: worker-a, category: Login, item: port, as: int, expect: 8080 }
- get: { scope: worker-b, category: Login, item: user, expect-error: scope-not-found }
"#;

    /// The second step fails its expectation.
    pub const FAILING: &str = r#"
- set: { item: greeting, value: hello }
- get: { item: greeting, as: int }
"#;

    /// Not a scenario at all.
    pub const INVALID_YAML: &str = "invalid: yaml: content:";

    /// Well-formed YAML with an unknown step.
    pub const UNKNOWN_STEP: &str = "- frobnicate: { item: a }\n";
}

/// A temporary directory holding a scenario file.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write `scenario.yaml` with the given content.
    pub fn with_scenario(self, content: &str) -> Self {
        self.temp_dir
            .child("scenario.yaml")
            .write_str(content)
            .expect("Failed to write scenario file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path to the scenario file.
    pub fn scenario_path(&self) -> PathBuf {
        self.temp_dir.path().join("scenario.yaml")
    }

    /// Create a command running in this fixture's directory, colors off.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("scoped-repo");
        cmd.current_dir(self.path()).arg("--color=never");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
