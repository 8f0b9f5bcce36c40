//! # Scoped Repository Library
//!
//! This library provides a thread-aware, two-tier key/value store for test
//! automation code. Test steps running on different threads keep their data
//! apart in owner-local scopes, while fixture data shared by every step lives
//! in a single global scope.
//!
//! ## Quick Example
//!
//! ```
//! use scoped_repo::repository::Repository;
//! use scoped_repo::scope::Scope;
//! use scoped_repo::value::Value;
//!
//! let repo = Repository::new();
//!
//! // Shared fixture data
//! repo.set(Scope::Global, Some("Login"), "user", "alice").unwrap();
//! repo.set(Scope::Global, Some("Login"), "port", "8080").unwrap();
//!
//! // Give this thread its own copy to modify
//! repo.clone_scope(Scope::Global, Scope::Local, false).unwrap();
//! repo.set(Scope::Local, Some("Login"), "user", "bob").unwrap();
//!
//! assert_eq!(repo.get(Scope::Global, Some("Login"), "user").unwrap(), Value::from("alice"));
//! assert_eq!(repo.get_typed::<u32>(Scope::Local, Some("Login"), "port").unwrap(), 8080);
//!
//! // Non-failing access records the error instead of returning it
//! assert!(repo.try_get(Scope::Local, Some("Login"), "password").is_none());
//! assert!(repo.last_error(Scope::Local).is_some());
//! ```
//!
//! ## Core Concepts
//!
//! - **Scopes (`scope`)**: `Global`, the calling thread's `Local` scope, or an
//!   explicit `Owner` handle for work that hops between threads.
//! - **Values (`value`)**: A closed set of scalar types plus cloneable
//!   objects and shared references, with typed extraction.
//! - **Repository (`repository`)**: The store itself, addressed by
//!   scope, category and item, with bulk category loads and cross-scope
//!   cloning.
//! - **Scenarios (`scenario`)**: YAML scripts of repository operations with
//!   expectations, used by the `scoped-repo` command-line tool.

pub mod error;
pub mod output;
pub mod repository;
pub mod scenario;
pub mod scope;
pub mod value;

#[cfg(test)]
mod repository_proptest;
