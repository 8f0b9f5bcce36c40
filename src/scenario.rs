//! # Scenario Files
//!
//! A scenario is a YAML list of repository operations executed in order
//! against a [`Repository`]. Scenarios let test suites describe fixture data
//! and the checks run against it without writing Rust, and back the
//! `scoped-repo run` command.
//!
//! ## Format
//!
//! Each step is a single-key mapping naming the operation:
//!
//! ```yaml
//! - set: { scope: global, category: Login, item: user, value: alice }
//! - set: { scope: global, category: Login, item: port, value: "8080" }
//! - clone: { from: global, to: worker-a, overwrite: false }
//! - get: { scope: worker-a, category: Login, item: port, as: int, expect: 8080 }
//! - get: { scope: worker-b, category: Login, item: user, expect-error: scope-not-found }
//! - load: { scope: local, category: Env, items: { host: localhost, debug: true } }
//! - has: { scope: local, category: Env, expect: true }
//! - remove: { scope: local, category: Env, item: debug }
//! - clear: all
//! ```
//!
//! Scope strings are `global`, `local` (the thread running the scenario) or
//! any other name. Each distinct name gets its own owner handle, which makes
//! it easy to model several isolated workers in one file.
//!
//! Steps that read or mutate may carry `expect-error: <kind>` and `try: true`.
//! With `try` the step goes through the non-failing API and the failure is
//! read back from the scope's last error.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind, Result};
use crate::repository::{Items, Repository};
use crate::scope::{OwnerId, OwnerKey, Scope};
use crate::value::Value;

/// A scope as written in a scenario file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum ScopeRef {
    Global,
    #[default]
    Local,
    Named(String),
}

impl From<String> for ScopeRef {
    fn from(name: String) -> Self {
        match name.as_str() {
            "global" => ScopeRef::Global,
            "local" => ScopeRef::Local,
            _ => ScopeRef::Named(name),
        }
    }
}

impl fmt::Display for ScopeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeRef::Global => f.write_str("global"),
            ScopeRef::Local => f.write_str("local"),
            ScopeRef::Named(name) => f.write_str(name),
        }
    }
}

/// Target of a `clear` step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ClearTarget {
    All,
    Scope(ScopeRef),
}

impl From<String> for ClearTarget {
    fn from(name: String) -> Self {
        if name == "all" {
            ClearTarget::All
        } else {
            ClearTarget::Scope(ScopeRef::from(name))
        }
    }
}

/// A scalar written in a scenario file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Bool(b) => Value::Bool(b),
            Literal::Int(i) => Value::Int(i),
            Literal::Float(x) => Value::Float(x),
            Literal::Str(s) => Value::Str(s),
        }
    }
}

/// Target type of a typed `get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Int,
    Float,
    Bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SetStep {
    #[serde(default)]
    pub scope: ScopeRef,
    pub category: Option<String>,
    pub item: String,
    pub value: Literal,
    #[serde(default)]
    pub expect_error: Option<ErrorKind>,
    #[serde(default, rename = "try")]
    pub use_try: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct GetStep {
    #[serde(default)]
    pub scope: ScopeRef,
    pub category: Option<String>,
    pub item: String,
    #[serde(default, rename = "as")]
    pub as_type: Option<ValueType>,
    #[serde(default)]
    pub expect: Option<Literal>,
    #[serde(default)]
    pub expect_error: Option<ErrorKind>,
    #[serde(default, rename = "try")]
    pub use_try: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct LoadStep {
    #[serde(default)]
    pub scope: ScopeRef,
    pub category: String,
    pub items: BTreeMap<String, Literal>,
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub expect_error: Option<ErrorKind>,
    #[serde(default, rename = "try")]
    pub use_try: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CloneStep {
    pub from: ScopeRef,
    pub to: ScopeRef,
    pub category: Option<String>,
    pub item: Option<String>,
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub expect_error: Option<ErrorKind>,
    #[serde(default, rename = "try")]
    pub use_try: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct HasStep {
    #[serde(default)]
    pub scope: ScopeRef,
    pub category: String,
    pub item: Option<String>,
    pub expect: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RemoveStep {
    #[serde(default)]
    pub scope: ScopeRef,
    pub category: Option<String>,
    pub item: String,
    #[serde(default)]
    pub expect_error: Option<ErrorKind>,
}

/// One operation of a scenario.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Step {
    /// Store a single value.
    Set { set: SetStep },
    /// Read a value, optionally typed, and compare it.
    Get { get: GetStep },
    /// Bulk-load a category.
    Load { load: LoadStep },
    /// Copy a scope, a category or an item between scopes.
    Clone { clone: CloneStep },
    /// Check category or item existence.
    Has { has: HasStep },
    /// Remove one item.
    Remove { remove: RemoveStep },
    /// Clear one scope, or everything.
    Clear { clear: ClearTarget },
}

impl Step {
    /// Short human-readable description used in reports.
    pub fn describe(&self) -> String {
        match self {
            Step::Set { set } => format!(
                "set {}:{}/{}",
                set.scope,
                category_label(set.category.as_deref()),
                set.item
            ),
            Step::Get { get } => format!(
                "get {}:{}/{}",
                get.scope,
                category_label(get.category.as_deref()),
                get.item
            ),
            Step::Load { load } => format!(
                "load {} item(s) into {}:{}",
                load.items.len(),
                load.scope,
                load.category
            ),
            Step::Clone { clone } => {
                let what = match (&clone.category, &clone.item) {
                    (_, Some(item)) => {
                        format!("{}/{}", category_label(clone.category.as_deref()), item)
                    }
                    (Some(category), None) => category.clone(),
                    (None, None) => "scope".to_string(),
                };
                format!("clone {} {} -> {}", what, clone.from, clone.to)
            }
            Step::Has { has } => match &has.item {
                Some(item) => format!("has {}:{}/{}", has.scope, has.category, item),
                None => format!("has {}:{}", has.scope, has.category),
            },
            Step::Remove { remove } => format!(
                "remove {}:{}/{}",
                remove.scope,
                category_label(remove.category.as_deref()),
                remove.item
            ),
            Step::Clear { clear } => match clear {
                ClearTarget::All => "clear all".to_string(),
                ClearTarget::Scope(scope) => format!("clear {}", scope),
            },
        }
    }
}

fn category_label(category: Option<&str>) -> &str {
    category.unwrap_or(crate::repository::DEFAULT_CATEGORY)
}

/// The complete scenario, executed in file order.
pub type Scenario = Vec<Step>;

/// Parses a YAML string into a `Scenario`.
pub fn parse(yaml_content: &str) -> Result<Scenario> {
    let scenario: Scenario = serde_yaml::from_str(yaml_content)?;
    validate(&scenario)?;
    Ok(scenario)
}

/// Parse a Scenario from a YAML file path
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Scenario> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

fn validate(scenario: &Scenario) -> Result<()> {
    for (index, step) in scenario.iter().enumerate() {
        if let Step::Get { get } = step {
            if get.expect.is_some() && get.expect_error.is_some() {
                return Err(Error::Scenario {
                    message: format!(
                        "step {}: 'expect' and 'expect-error' are mutually exclusive",
                        index + 1
                    ),
                });
            }
        }
        if let Step::Load { load } = step {
            if load.category.is_empty() {
                return Err(Error::Scenario {
                    message: format!("step {}: 'load' needs a category name", index + 1),
                });
            }
        }
    }
    Ok(())
}

/// Result of one executed step.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub step: String,
    pub passed: bool,
    /// Value read, items copied, or the failure message.
    pub detail: String,
}

/// Outcomes of every step of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub outcomes: Vec<StepOutcome>,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.passed)
    }
}

/// Final store contents keyed by scope label, then category.
pub type Dump = BTreeMap<String, BTreeMap<String, Items>>;

/// Executes scenarios against a repository, remembering the owner handle
/// assigned to each named scope.
pub struct Runner<'a> {
    repo: &'a Repository,
    named: HashMap<String, OwnerId>,
}

impl<'a> Runner<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self {
            repo,
            named: HashMap::new(),
        }
    }

    /// Runs every step. A failing step is reported and the run continues.
    pub fn run(&mut self, scenario: &Scenario) -> Report {
        let mut report = Report::default();
        for (index, step) in scenario.iter().enumerate() {
            let (passed, detail) = match self.execute(step) {
                Ok(detail) => (true, detail),
                Err(message) => (false, message),
            };
            debug!("step {} {}: {}", index + 1, if passed { "passed" } else { "failed" }, detail);
            report.outcomes.push(StepOutcome {
                index: index + 1,
                step: step.describe(),
                passed,
                detail,
            });
        }
        report
    }

    /// Snapshot of every scope, labelled by its scenario name where known.
    pub fn dump(&self) -> Dump {
        let mut dump = Dump::new();
        for owner in self.repo.owners() {
            let scope = Scope::from(owner);
            let mut categories = BTreeMap::new();
            for name in self.repo.category_names(scope) {
                if let Ok(items) = self.repo.get_category(scope, &name) {
                    categories.insert(name, items);
                }
            }
            dump.insert(self.label(owner), categories);
        }
        dump
    }

    /// Scenario name of an owner, falling back to its display form.
    pub fn label(&self, owner: OwnerKey) -> String {
        match owner {
            OwnerKey::Global => "global".to_string(),
            OwnerKey::Owner(id) if id == OwnerId::current() => "local".to_string(),
            OwnerKey::Owner(id) => self
                .named
                .iter()
                .find(|(_, named)| **named == id)
                .map(|(name, _)| name.clone())
                .unwrap_or_else(|| owner.to_string()),
        }
    }

    fn scope(&mut self, scope: &ScopeRef) -> Scope {
        match scope {
            ScopeRef::Global => Scope::Global,
            ScopeRef::Local => Scope::Local,
            ScopeRef::Named(name) => Scope::Owner(
                *self
                    .named
                    .entry(name.clone())
                    .or_insert_with(OwnerId::allocate),
            ),
        }
    }

    fn execute(&mut self, step: &Step) -> std::result::Result<String, String> {
        match step {
            Step::Set { set } => {
                let scope = self.scope(&set.scope);
                let category = set.category.as_deref();
                let value = Value::from(set.value.clone());
                let result = if set.use_try {
                    self.tried(scope, self.repo.try_set(scope, category, &set.item, value).then_some(()))
                } else {
                    self.repo.set(scope, category, &set.item, value)
                };
                check(result, set.expect_error, |_| Ok("stored".to_string()))
            }
            Step::Get { get } => {
                let scope = self.scope(&get.scope);
                let result = self.read(scope, get);
                let expected = get.expect.clone().map(Value::from);
                check(result, get.expect_error, |value| match &expected {
                    Some(expected) if expected != value => Err(format!(
                        "expected {} ({}), got {} ({})",
                        expected,
                        expected.type_name(),
                        value,
                        value.type_name()
                    )),
                    _ => Ok(value.to_string()),
                })
            }
            Step::Load { load } => {
                let scope = self.scope(&load.scope);
                let items = load
                    .items
                    .iter()
                    .map(|(name, literal)| (name.clone(), Value::from(literal.clone())));
                let result = if load.use_try {
                    let ok = self
                        .repo
                        .try_set_category(scope, &load.category, items, load.overwrite);
                    self.tried(scope, ok.then_some(()))
                } else {
                    self.repo
                        .set_category(scope, &load.category, items, load.overwrite)
                };
                let count = load.items.len();
                check(result, load.expect_error, |_| Ok(format!("loaded {} item(s)", count)))
            }
            Step::Clone { clone } => {
                let from = self.scope(&clone.from);
                let to = self.scope(&clone.to);
                let result = self.clone_between(from, to, clone);
                check(result, clone.expect_error, |report| {
                    let mut detail = format!(
                        "copied {} item(s): {} by value, {} deep",
                        report.total(),
                        report.by_value,
                        report.deep
                    );
                    if !report.by_reference.is_empty() {
                        detail.push_str(&format!(
                            ", by reference: {}",
                            report.by_reference.join(", ")
                        ));
                    }
                    Ok(detail)
                })
            }
            Step::Has { has } => {
                let scope = self.scope(&has.scope);
                let found = match &has.item {
                    Some(item) => self.repo.has_item(scope, Some(&has.category), item),
                    None => self.repo.has_category(scope, &has.category),
                };
                if found == has.expect {
                    Ok(format!("{}", found))
                } else {
                    Err(format!("expected {}, got {}", has.expect, found))
                }
            }
            Step::Remove { remove } => {
                let scope = self.scope(&remove.scope);
                let result = self
                    .repo
                    .remove_item(scope, remove.category.as_deref(), &remove.item);
                check(result, remove.expect_error, |value| {
                    Ok(format!("removed {}", value))
                })
            }
            Step::Clear { clear } => {
                match clear {
                    ClearTarget::All => self.repo.clear_all(),
                    ClearTarget::Scope(scope) => {
                        let scope = self.scope(scope);
                        self.repo.clear_owner(scope);
                    }
                }
                Ok("cleared".to_string())
            }
        }
    }

    fn read(&self, scope: Scope, get: &GetStep) -> Result<Value> {
        let category = get.category.as_deref();
        let item = get.item.as_str();
        let repo = self.repo;
        if get.use_try {
            let value = match get.as_type {
                None => repo.try_get(scope, category, item),
                Some(ValueType::String) => repo.try_get_typed::<String>(scope, category, item).map(Value::from),
                Some(ValueType::Int) => repo.try_get_typed::<i64>(scope, category, item).map(Value::from),
                Some(ValueType::Float) => repo.try_get_typed::<f64>(scope, category, item).map(Value::from),
                Some(ValueType::Bool) => repo.try_get_typed::<bool>(scope, category, item).map(Value::from),
            };
            return self.tried(scope, value);
        }
        match get.as_type {
            None => repo.get(scope, category, item),
            Some(ValueType::String) => repo.get_typed::<String>(scope, category, item).map(Value::from),
            Some(ValueType::Int) => repo.get_typed::<i64>(scope, category, item).map(Value::from),
            Some(ValueType::Float) => repo.get_typed::<f64>(scope, category, item).map(Value::from),
            Some(ValueType::Bool) => repo.get_typed::<bool>(scope, category, item).map(Value::from),
        }
    }

    fn clone_between(
        &self,
        from: Scope,
        to: Scope,
        clone: &CloneStep,
    ) -> Result<crate::repository::CloneReport> {
        let repo = self.repo;
        let category = clone.category.as_deref();
        if clone.use_try {
            let report = match (&clone.item, category) {
                (Some(item), _) => repo.try_clone_item(from, to, category, item, clone.overwrite),
                (None, Some(category)) => {
                    repo.try_clone_category(from, to, category, clone.overwrite)
                }
                (None, None) => repo.try_clone_scope(from, to, clone.overwrite),
            };
            return self.tried(to, report);
        }
        match (&clone.item, category) {
            (Some(item), _) => repo.clone_item(from, to, category, item, clone.overwrite),
            (None, Some(category)) => repo.clone_category(from, to, category, clone.overwrite),
            (None, None) => repo.clone_scope(from, to, clone.overwrite),
        }
    }

    /// Turns a `try_` outcome back into a `Result` using the recorded error.
    fn tried<T>(&self, scope: Scope, outcome: Option<T>) -> Result<T> {
        outcome.ok_or_else(|| {
            self.repo.last_error(scope).unwrap_or_else(|| Error::Scenario {
                message: "try call failed without recording an error".to_string(),
            })
        })
    }
}

/// Matches a step result against its `expect-error` clause.
fn check<T>(
    result: Result<T>,
    expect_error: Option<ErrorKind>,
    on_success: impl FnOnce(&T) -> std::result::Result<String, String>,
) -> std::result::Result<String, String> {
    match (result, expect_error) {
        (Ok(value), None) => on_success(&value),
        (Ok(_), Some(kind)) => Err(format!("expected {} error, but the step succeeded", kind)),
        (Err(err), Some(kind)) if err.kind() == kind => Ok(format!("failed as expected: {}", err)),
        (Err(err), _) => Err(err.to_string()),
    }
}
