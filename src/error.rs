//! # Error Handling
//!
//! This module defines the classified errors raised by the [`Repository`] and
//! the scenario layer built on top of it. It uses the `thiserror` library to
//! derive a single `Error` enum whose variants map one-to-one onto the failure
//! modes callers are expected to distinguish.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Each variant carries enough context (scope,
//!   category, item, type names) to produce a self-explaining message.
//!
//! - **`ErrorKind`**: A fieldless mirror of `Error` used where only the
//!   classification matters, such as `expect-error:` clauses in scenarios.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! `Error` is `Clone` so that the last error recorded for an owner can be
//! handed out repeatedly without being consumed. Foreign errors (I/O, YAML)
//! are therefore captured as strings rather than wrapped.
//!
//! [`Repository`]: crate::repository::Repository

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for repository operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A category or item name was empty where a name is required.
    #[error("Invalid {what} name: name must not be empty")]
    InvalidName {
        /// Which name was rejected (`category` or `item`).
        what: &'static str,
    },

    /// The referenced owner scope has never been written to, or was cleared.
    #[error("Scope not found: {scope} has no data")]
    ScopeNotFound { scope: String },

    /// The scope exists but does not hold the named category.
    #[error("Category not found: '{category}' does not exist in {scope}")]
    CategoryNotFound { scope: String, category: String },

    /// The category exists but does not hold the named item.
    #[error("Item not found: '{item}' does not exist in category '{category}' of {scope}")]
    ItemNotFound {
        scope: String,
        category: String,
        item: String,
    },

    /// A typed read found a value of a different type.
    #[error("Type mismatch for '{item}' in category '{category}': expected {expected}, found {actual}")]
    TypeMismatch {
        category: String,
        item: String,
        expected: String,
        actual: String,
    },

    /// A merge or clone would have overwritten an existing item.
    #[error("Collision: item '{item}' already exists in category '{category}' of {scope} and overwrite is disabled")]
    Collision {
        scope: String,
        category: String,
        item: String,
    },

    /// A scenario file could not be parsed or is structurally invalid.
    #[error("Scenario error: {message}")]
    Scenario { message: String },

    /// An I/O error, captured as its message.
    #[error("I/O error: {0}")]
    Io(String),

    /// A YAML parsing error, captured as its message.
    #[error("YAML parsing error: {0}")]
    Yaml(String),
}

impl Error {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidName { .. } => ErrorKind::InvalidName,
            Error::ScopeNotFound { .. } => ErrorKind::ScopeNotFound,
            Error::CategoryNotFound { .. } => ErrorKind::CategoryNotFound,
            Error::ItemNotFound { .. } => ErrorKind::ItemNotFound,
            Error::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Error::Collision { .. } => ErrorKind::Collision,
            Error::Scenario { .. } => ErrorKind::Scenario,
            Error::Io(_) => ErrorKind::Io,
            Error::Yaml(_) => ErrorKind::Yaml,
        }
    }

    /// True for the three "something is absent" classifications.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ScopeNotFound | ErrorKind::CategoryNotFound | ErrorKind::ItemNotFound
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Yaml(err.to_string())
    }
}

/// Fieldless classification of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    InvalidName,
    ScopeNotFound,
    CategoryNotFound,
    ItemNotFound,
    TypeMismatch,
    Collision,
    Scenario,
    Io,
    Yaml,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::InvalidName => "invalid-name",
            ErrorKind::ScopeNotFound => "scope-not-found",
            ErrorKind::CategoryNotFound => "category-not-found",
            ErrorKind::ItemNotFound => "item-not-found",
            ErrorKind::TypeMismatch => "type-mismatch",
            ErrorKind::Collision => "collision",
            ErrorKind::Scenario => "scenario",
            ErrorKind::Io => "io",
            ErrorKind::Yaml => "yaml",
        };
        f.write_str(name)
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
