//! # Scoped Data Repository
//!
//! This module provides the `Repository`, a concurrency-safe key/value store
//! partitioned into two tiers: one shared global scope and any number of
//! owner-local scopes (one per thread, or per explicit [`OwnerId`] handle).
//!
//! ## Addressing
//!
//! Every value lives at `(owner, category, item)`. Owners and categories are
//! created implicitly on first write and removed only by the clear
//! operations. Omitting a category selects [`DEFAULT_CATEGORY`], which is an
//! ordinary category name in every other respect: a caller naming it
//! explicitly addresses the same items.
//!
//! Lookups validate in a fixed order and the first failing check decides the
//! error: scope exists, category name non-empty, category exists, item name
//! non-empty, item exists.
//!
//! ## Failure Handling
//!
//! Plain operations return a classified [`Error`]. Each has a `try_` variant
//! that returns `Option`/`bool` instead and records the error as the owner's
//! last error, retrievable through [`Repository::last_error`]. A `try_` call
//! clears that slot before it runs.
//!
//! ## Bulk Operations
//!
//! `set_category` and the clone family apply items one at a time, in item
//! name order for clones and in the caller's order for `set_category`. A
//! collision aborts the operation, but items applied before it stay applied:
//! these operations are atomic with respect to other callers (one lock is held
//! throughout) but not all-or-nothing.
//!
//! ## Cloning
//!
//! Values are duplicated according to their [`CloneKind`]: scalars by value,
//! objects through [`DeepClone`], and shared payloads by reference. Every
//! reference fallback is traced and listed in the returned [`CloneReport`].
//!
//! [`OwnerId`]: crate::scope::OwnerId
//! [`DeepClone`]: crate::value::DeepClone

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use log::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::scope::{OwnerKey, Scope};
use crate::value::{CloneKind, FromValue, Value};

/// Category used when a caller does not name one.
pub const DEFAULT_CATEGORY: &str = "Default";

/// Items of one category, keyed by item name.
pub type Items = BTreeMap<String, Value>;

type Categories = BTreeMap<String, Items>;
type Store = HashMap<OwnerKey, Categories>;

/// Summary of what a clone operation copied and how.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneReport {
    /// Scalars copied by value.
    pub by_value: usize,
    /// Objects duplicated through their clone contract.
    pub deep: usize,
    /// `category/item` paths of shared payloads copied by reference.
    pub by_reference: Vec<String>,
}

impl CloneReport {
    /// Total number of items written to the destination.
    pub fn total(&self) -> usize {
        self.by_value + self.deep + self.by_reference.len()
    }

    fn record(&mut self, kind: CloneKind, category: &str, item: &str) {
        match kind {
            CloneKind::Value => self.by_value += 1,
            CloneKind::Deep => self.deep += 1,
            CloneKind::Reference => self.by_reference.push(format!("{}/{}", category, item)),
        }
    }
}

/// Two-tier, thread-aware key/value store.
#[derive(Debug, Default)]
pub struct Repository {
    store: Mutex<Store>,
    last_errors: Mutex<HashMap<OwnerKey, Error>>,
}

impl Repository {
    /// Create a new, empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// A process-wide instance for hosts that want a single shared store.
    pub fn global() -> &'static Repository {
        static INSTANCE: OnceLock<Repository> = OnceLock::new();
        INSTANCE.get_or_init(Repository::new)
    }

    // ------------------------------------------------------------------
    // Single items
    // ------------------------------------------------------------------

    /// Returns a copy of the stored value.
    pub fn get(&self, scope: Scope, category: Option<&str>, item: &str) -> Result<Value> {
        let category = category.unwrap_or(DEFAULT_CATEGORY);
        let store = self.lock_store();
        find_item(&store, scope.resolve(), category, item).cloned()
    }

    /// Returns the stored value converted to `T`.
    ///
    /// Integer and float targets accept string values that parse; any other
    /// mismatch fails with [`Error::TypeMismatch`].
    pub fn get_typed<T: FromValue>(
        &self,
        scope: Scope,
        category: Option<&str>,
        item: &str,
    ) -> Result<T> {
        let category = category.unwrap_or(DEFAULT_CATEGORY);
        let store = self.lock_store();
        let value = find_item(&store, scope.resolve(), category, item)?;
        T::from_value(value).ok_or_else(|| {
            type_mismatch(category, item, T::type_name(), value.type_name())
        })
    }

    /// Returns a clone of an `Object` or `Shared` payload of type `T`.
    pub fn get_object<T: Any + Clone>(
        &self,
        scope: Scope,
        category: Option<&str>,
        item: &str,
    ) -> Result<T> {
        let category = category.unwrap_or(DEFAULT_CATEGORY);
        let store = self.lock_store();
        let value = find_item(&store, scope.resolve(), category, item)?;
        value.downcast_ref::<T>().cloned().ok_or_else(|| {
            type_mismatch(
                category,
                item,
                std::any::type_name::<T>(),
                value.type_name(),
            )
        })
    }

    /// Returns the `Arc` behind a `Shared` payload of type `T`.
    pub fn get_shared<T: Any + Send + Sync>(
        &self,
        scope: Scope,
        category: Option<&str>,
        item: &str,
    ) -> Result<Arc<T>> {
        let category = category.unwrap_or(DEFAULT_CATEGORY);
        let store = self.lock_store();
        let value = find_item(&store, scope.resolve(), category, item)?;
        let shared = match value {
            Value::Shared(shared) => shared.downcast::<T>(),
            _ => None,
        };
        shared.ok_or_else(|| {
            type_mismatch(
                category,
                item,
                std::any::type_name::<T>(),
                value.type_name(),
            )
        })
    }

    /// Stores a value, creating the scope and category on demand.
    pub fn set(
        &self,
        scope: Scope,
        category: Option<&str>,
        item: &str,
        value: impl Into<Value>,
    ) -> Result<()> {
        let category = category.unwrap_or(DEFAULT_CATEGORY);
        validate_name("category", category)?;
        validate_name("item", item)?;
        let value = value.into();

        let owner = scope.resolve();
        let mut store = self.lock_store();
        category_entry(&mut store, owner, category).insert(item.to_string(), value);
        Ok(())
    }

    /// Removes an item and returns its value.
    pub fn remove_item(&self, scope: Scope, category: Option<&str>, item: &str) -> Result<Value> {
        let category = category.unwrap_or(DEFAULT_CATEGORY);
        let owner = scope.resolve();
        let mut store = self.lock_store();
        find_item(&store, owner, category, item)?;
        let removed = store
            .get_mut(&owner)
            .and_then(|categories| categories.get_mut(category))
            .and_then(|items| items.remove(item));
        removed.ok_or_else(|| item_not_found(owner, category, item))
    }

    /// True when the item exists. Never fails.
    pub fn has_item(&self, scope: Scope, category: Option<&str>, item: &str) -> bool {
        let category = category.unwrap_or(DEFAULT_CATEGORY);
        let store = self.lock_store();
        find_item(&store, scope.resolve(), category, item).is_ok()
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    /// True when the category exists in the scope. Never fails.
    pub fn has_category(&self, scope: Scope, category: &str) -> bool {
        let store = self.lock_store();
        store
            .get(&scope.resolve())
            .is_some_and(|categories| categories.contains_key(category))
    }

    /// Returns a copy of every item in the category.
    pub fn get_category(&self, scope: Scope, category: &str) -> Result<Items> {
        let store = self.lock_store();
        find_category(&store, scope.resolve(), category).cloned()
    }

    /// Loads `items` into the category, merging with what is already there.
    ///
    /// With `overwrite` disabled the first incoming name that already exists
    /// fails the call with [`Error::Collision`]; items inserted before it are
    /// kept.
    pub fn set_category<I, K, V>(
        &self,
        scope: Scope,
        category: &str,
        items: I,
        overwrite: bool,
    ) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        validate_name("category", category)?;
        let owner = scope.resolve();

        let items: Vec<(String, Value)> = items
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        for (name, _) in &items {
            validate_name("item", name)?;
        }

        let mut store = self.lock_store();
        let existing = category_entry(&mut store, owner, category);
        let mut loaded = 0usize;
        for (name, value) in items {
            if !overwrite && existing.contains_key(&name) {
                return Err(Error::Collision {
                    scope: owner.to_string(),
                    category: category.to_string(),
                    item: name,
                });
            }
            existing.insert(name, value);
            loaded += 1;
        }
        debug!("Loaded {} item(s) into category '{}' of {}", loaded, category, owner);
        Ok(())
    }

    /// Names of all categories in the scope, in order. Empty if the scope has
    /// no data.
    pub fn category_names(&self, scope: Scope) -> Vec<String> {
        let store = self.lock_store();
        store
            .get(&scope.resolve())
            .map(|categories| categories.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of items across all categories of the scope.
    pub fn item_count(&self, scope: Scope) -> usize {
        let store = self.lock_store();
        store
            .get(&scope.resolve())
            .map(|categories| categories.values().map(BTreeMap::len).sum())
            .unwrap_or(0)
    }

    /// Every owner key currently present, global first.
    pub fn owners(&self) -> Vec<OwnerKey> {
        let store = self.lock_store();
        let mut owners: Vec<OwnerKey> = store.keys().copied().collect();
        owners.sort();
        owners
    }

    // ------------------------------------------------------------------
    // Clearing
    // ------------------------------------------------------------------

    /// Empties the scope's categories. The scope itself is kept.
    pub fn clear_owner(&self, scope: Scope) {
        let owner = scope.resolve();
        let mut store = self.lock_store();
        if let Some(categories) = store.get_mut(&owner) {
            trace!("Clearing {} ({} categories)", owner, categories.len());
            categories.clear();
        }
    }

    pub fn clear_global(&self) {
        self.clear_owner(Scope::Global);
    }

    /// Drops every scope and every recorded last error.
    pub fn clear_all(&self) {
        let mut store = self.lock_store();
        trace!("Clearing all {} scope(s)", store.len());
        store.clear();
        drop(store);
        self.lock_errors().clear();
    }

    // ------------------------------------------------------------------
    // Cloning
    // ------------------------------------------------------------------

    /// Copies every category of `from` into `to`.
    pub fn clone_scope(&self, from: Scope, to: Scope, overwrite: bool) -> Result<CloneReport> {
        let (from, to) = (from.resolve(), to.resolve());
        let mut store = self.lock_store();
        if from == to && overwrite {
            return Ok(CloneReport::default());
        }

        let source = store.get(&from).ok_or_else(|| Error::ScopeNotFound {
            scope: from.to_string(),
        })?;
        let staged: Vec<StagedCategory> = source
            .iter()
            .map(|(name, items)| StagedCategory::copy_of(name, items))
            .collect();

        let report = apply_clone(&mut store, to, staged, overwrite)?;
        debug!("Cloned {} item(s) from {} to {}", report.total(), from, to);
        Ok(report)
    }

    /// Copies one category of `from` into `to`.
    pub fn clone_category(
        &self,
        from: Scope,
        to: Scope,
        category: &str,
        overwrite: bool,
    ) -> Result<CloneReport> {
        let (from, to) = (from.resolve(), to.resolve());
        let mut store = self.lock_store();
        let items = find_category(&store, from, category)?;
        if from == to && overwrite {
            return Ok(CloneReport::default());
        }

        let staged = vec![StagedCategory::copy_of(category, items)];
        apply_clone(&mut store, to, staged, overwrite)
    }

    /// Copies one item of `from` into `to`.
    pub fn clone_item(
        &self,
        from: Scope,
        to: Scope,
        category: Option<&str>,
        item: &str,
        overwrite: bool,
    ) -> Result<CloneReport> {
        let category = category.unwrap_or(DEFAULT_CATEGORY);
        let (from, to) = (from.resolve(), to.resolve());
        let mut store = self.lock_store();
        let value = find_item(&store, from, category, item)?;
        if from == to && overwrite {
            return Ok(CloneReport::default());
        }

        let staged = vec![StagedCategory {
            name: category.to_string(),
            items: vec![(item.to_string(), value.clone())],
        }];
        apply_clone(&mut store, to, staged, overwrite)
    }

    // ------------------------------------------------------------------
    // Non-failing variants
    // ------------------------------------------------------------------

    pub fn try_get(&self, scope: Scope, category: Option<&str>, item: &str) -> Option<Value> {
        self.attempt(scope, || self.get(scope, category, item))
    }

    pub fn try_get_typed<T: FromValue>(
        &self,
        scope: Scope,
        category: Option<&str>,
        item: &str,
    ) -> Option<T> {
        self.attempt(scope, || self.get_typed(scope, category, item))
    }

    pub fn try_get_object<T: Any + Clone>(
        &self,
        scope: Scope,
        category: Option<&str>,
        item: &str,
    ) -> Option<T> {
        self.attempt(scope, || self.get_object(scope, category, item))
    }

    pub fn try_set(
        &self,
        scope: Scope,
        category: Option<&str>,
        item: &str,
        value: impl Into<Value>,
    ) -> bool {
        self.attempt(scope, || self.set(scope, category, item, value))
            .is_some()
    }

    pub fn try_get_category(&self, scope: Scope, category: &str) -> Option<Items> {
        self.attempt(scope, || self.get_category(scope, category))
    }

    pub fn try_set_category<I, K, V>(
        &self,
        scope: Scope,
        category: &str,
        items: I,
        overwrite: bool,
    ) -> bool
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.attempt(scope, || self.set_category(scope, category, items, overwrite))
            .is_some()
    }

    /// Errors are recorded against the destination scope.
    pub fn try_clone_scope(&self, from: Scope, to: Scope, overwrite: bool) -> Option<CloneReport> {
        self.attempt(to, || self.clone_scope(from, to, overwrite))
    }

    pub fn try_clone_category(
        &self,
        from: Scope,
        to: Scope,
        category: &str,
        overwrite: bool,
    ) -> Option<CloneReport> {
        self.attempt(to, || self.clone_category(from, to, category, overwrite))
    }

    pub fn try_clone_item(
        &self,
        from: Scope,
        to: Scope,
        category: Option<&str>,
        item: &str,
        overwrite: bool,
    ) -> Option<CloneReport> {
        self.attempt(to, || self.clone_item(from, to, category, item, overwrite))
    }

    /// The error recorded by the scope's most recent failed `try_` call, if
    /// no `try_` call has run for it since. Reading does not clear it.
    pub fn last_error(&self, scope: Scope) -> Option<Error> {
        self.lock_errors().get(&scope.resolve()).cloned()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn attempt<T>(&self, scope: Scope, op: impl FnOnce() -> Result<T>) -> Option<T> {
        let owner = scope.resolve();
        self.lock_errors().remove(&owner);
        match op() {
            Ok(value) => Some(value),
            Err(err) => {
                debug!("Recording last error for {}: {}", owner, err);
                self.lock_errors().insert(owner, err);
                None
            }
        }
    }

    fn lock_store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|poisoned| {
            warn!("Repository store lock was poisoned; continuing with current contents");
            poisoned.into_inner()
        })
    }

    fn lock_errors(&self) -> MutexGuard<'_, HashMap<OwnerKey, Error>> {
        self.last_errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// A category's items, already duplicated and ready to be written.
struct StagedCategory {
    name: String,
    items: Vec<(String, Value)>,
}

impl StagedCategory {
    fn copy_of(name: &str, items: &Items) -> Self {
        Self {
            name: name.to_string(),
            items: items
                .iter()
                .map(|(item, value)| (item.clone(), value.clone()))
                .collect(),
        }
    }
}

fn apply_clone(
    store: &mut Store,
    to: OwnerKey,
    staged: Vec<StagedCategory>,
    overwrite: bool,
) -> Result<CloneReport> {
    let mut report = CloneReport::default();
    for category in staged {
        let destination = category_entry(store, to, &category.name);
        for (item, value) in category.items {
            if !overwrite && destination.contains_key(&item) {
                return Err(Error::Collision {
                    scope: to.to_string(),
                    category: category.name,
                    item,
                });
            }
            let kind = value.clone_kind();
            if kind == CloneKind::Reference {
                trace!(
                    "'{}/{}' of type {} has no clone contract; copying by reference into {}",
                    category.name,
                    item,
                    value.type_name(),
                    to
                );
            }
            report.record(kind, &category.name, &item);
            destination.insert(item, value);
        }
    }
    Ok(report)
}

fn category_entry<'a>(store: &'a mut Store, owner: OwnerKey, category: &str) -> &'a mut Items {
    let categories = store.entry(owner).or_insert_with(|| {
        trace!("Creating {}", owner);
        Categories::new()
    });
    categories.entry(category.to_string()).or_insert_with(|| {
        trace!("Creating category '{}' in {}", category, owner);
        Items::new()
    })
}

fn find_category<'a>(store: &'a Store, owner: OwnerKey, category: &str) -> Result<&'a Items> {
    let categories = store.get(&owner).ok_or_else(|| Error::ScopeNotFound {
        scope: owner.to_string(),
    })?;
    validate_name("category", category)?;
    categories
        .get(category)
        .ok_or_else(|| Error::CategoryNotFound {
            scope: owner.to_string(),
            category: category.to_string(),
        })
}

fn find_item<'a>(
    store: &'a Store,
    owner: OwnerKey,
    category: &str,
    item: &str,
) -> Result<&'a Value> {
    let items = find_category(store, owner, category)?;
    validate_name("item", item)?;
    items
        .get(item)
        .ok_or_else(|| item_not_found(owner, category, item))
}

fn validate_name(what: &'static str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidName { what });
    }
    Ok(())
}

fn item_not_found(owner: OwnerKey, category: &str, item: &str) -> Error {
    Error::ItemNotFound {
        scope: owner.to_string(),
        category: category.to_string(),
        item: item.to_string(),
    }
}

fn type_mismatch(category: &str, item: &str, expected: &str, actual: &str) -> Error {
    Error::TypeMismatch {
        category: category.to_string(),
        item: item.to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::scope::OwnerId;
    use std::sync::Mutex as StdMutex;
    use std::thread;

    #[derive(Debug, Clone, PartialEq)]
    struct Account {
        name: String,
        balance: i64,
    }

    fn kind<T: std::fmt::Debug>(result: Result<T>) -> ErrorKind {
        result.unwrap_err().kind()
    }

    #[test]
    fn test_set_then_get_round_trips() {
        let repo = Repository::new();
        repo.set(Scope::Local, Some("Login"), "user", "alice").unwrap();
        assert_eq!(
            repo.get(Scope::Local, Some("Login"), "user").unwrap(),
            Value::from("alice")
        );
    }

    #[test]
    fn test_omitted_category_uses_default() {
        let repo = Repository::new();
        repo.set(Scope::Global, None, "timeout", 30).unwrap();
        assert!(repo.has_category(Scope::Global, DEFAULT_CATEGORY));
        assert_eq!(
            repo.get(Scope::Global, Some(DEFAULT_CATEGORY), "timeout")
                .unwrap(),
            Value::Int(30)
        );
    }

    #[test]
    fn test_overwrite_keeps_only_latest_value() {
        let repo = Repository::new();
        repo.set(Scope::Local, Some("c"), "i", "first").unwrap();
        repo.set(Scope::Local, Some("c"), "i", 2).unwrap();
        assert_eq!(repo.get(Scope::Local, Some("c"), "i").unwrap(), Value::Int(2));
        assert_eq!(repo.item_count(Scope::Local), 1);
    }

    #[test]
    fn test_local_scopes_are_isolated() {
        let repo = Arc::new(Repository::new());
        repo.set(Scope::Local, Some("c"), "mine", "x").unwrap();

        let other = Arc::clone(&repo);
        let seen = thread::spawn(move || other.get(Scope::Local, Some("c"), "mine"))
            .join()
            .unwrap();
        assert_eq!(seen.unwrap_err().kind(), ErrorKind::ScopeNotFound);
    }

    #[test]
    fn test_global_scope_visible_to_every_thread() {
        let repo = Arc::new(Repository::new());
        repo.set(Scope::Global, Some("env"), "url", "http://localhost")
            .unwrap();

        let other = Arc::clone(&repo);
        let seen = thread::spawn(move || other.get(Scope::Global, Some("env"), "url"))
            .join()
            .unwrap();
        assert_eq!(seen.unwrap(), Value::from("http://localhost"));
    }

    #[test]
    fn test_explicit_owner_handle_is_its_own_scope() {
        let repo = Repository::new();
        let worker = OwnerId::allocate();
        repo.set(Scope::Owner(worker), Some("c"), "i", 1).unwrap();
        assert!(repo.has_item(Scope::Owner(worker), Some("c"), "i"));
        assert!(!repo.has_item(Scope::Local, Some("c"), "i"));
    }

    #[test]
    fn test_lookup_order_scope_first() {
        let repo = Repository::new();
        assert_eq!(kind(repo.get(Scope::Local, Some(""), "")), ErrorKind::ScopeNotFound);
    }

    #[test]
    fn test_lookup_order_category_name_before_existence() {
        let repo = Repository::new();
        repo.set(Scope::Local, Some("c"), "i", 1).unwrap();
        assert_eq!(kind(repo.get(Scope::Local, Some(""), "i")), ErrorKind::InvalidName);
        assert_eq!(
            kind(repo.get(Scope::Local, Some("missing"), "")),
            ErrorKind::CategoryNotFound
        );
        assert_eq!(kind(repo.get(Scope::Local, Some("c"), "")), ErrorKind::InvalidName);
        assert_eq!(kind(repo.get(Scope::Local, Some("c"), "nope")), ErrorKind::ItemNotFound);
    }

    #[test]
    fn test_missing_category_message_names_category_and_scope() {
        let repo = Repository::new();
        repo.set(Scope::Global, Some("c"), "i", 1).unwrap();
        let err = repo
            .get(Scope::Global, Some("NeverCreated"), "i")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CategoryNotFound);
        let message = err.to_string();
        assert!(message.contains("NeverCreated"));
        assert!(message.contains("global scope"));
    }

    #[test]
    fn test_set_rejects_empty_names() {
        let repo = Repository::new();
        assert_eq!(kind(repo.set(Scope::Local, Some(""), "i", 1)), ErrorKind::InvalidName);
        assert_eq!(kind(repo.set(Scope::Local, Some("c"), "", 1)), ErrorKind::InvalidName);
        assert!(repo.owners().is_empty());
    }

    #[test]
    fn test_get_typed_mismatch_names_both_types() {
        let repo = Repository::new();
        repo.set(Scope::Local, Some("c"), "greeting", "hello").unwrap();
        let err = repo
            .get_typed::<i64>(Scope::Local, Some("c"), "greeting")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        let message = err.to_string();
        assert!(message.contains("i64"));
        assert!(message.contains("String"));
    }

    #[test]
    fn test_get_typed_coerces_numeric_strings() {
        let repo = Repository::new();
        repo.set(Scope::Local, Some("c"), "port", "42").unwrap();
        repo.set(Scope::Local, Some("c"), "ratio", "0.25").unwrap();
        assert_eq!(repo.get_typed::<i32>(Scope::Local, Some("c"), "port").unwrap(), 42);
        assert_eq!(repo.get_typed::<f64>(Scope::Local, Some("c"), "ratio").unwrap(), 0.25);
        assert_eq!(
            repo.get_typed::<String>(Scope::Local, Some("c"), "port")
                .unwrap(),
            "42"
        );
    }

    #[test]
    fn test_get_typed_does_not_coerce_to_bool() {
        let repo = Repository::new();
        repo.set(Scope::Local, Some("c"), "flag", "true").unwrap();
        assert_eq!(
            kind(repo.get_typed::<bool>(Scope::Local, Some("c"), "flag")),
            ErrorKind::TypeMismatch
        );
    }

    #[test]
    fn test_get_object_and_shared() {
        let repo = Repository::new();
        let account = Account {
            name: "ops".to_string(),
            balance: 10,
        };
        repo.set(Scope::Local, Some("c"), "account", Value::object(account.clone()))
            .unwrap();
        repo.set(Scope::Local, Some("c"), "counter", Value::shared(StdMutex::new(0u32)))
            .unwrap();

        assert_eq!(
            repo.get_object::<Account>(Scope::Local, Some("c"), "account")
                .unwrap(),
            account
        );
        let counter = repo
            .get_shared::<StdMutex<u32>>(Scope::Local, Some("c"), "counter")
            .unwrap();
        *counter.lock().unwrap() += 1;
        let again = repo
            .get_shared::<StdMutex<u32>>(Scope::Local, Some("c"), "counter")
            .unwrap();
        assert_eq!(*again.lock().unwrap(), 1);
        assert_eq!(
            kind(repo.get_object::<String>(Scope::Local, Some("c"), "account")),
            ErrorKind::TypeMismatch
        );
    }

    #[test]
    fn test_remove_item() {
        let repo = Repository::new();
        repo.set(Scope::Local, Some("c"), "i", "v").unwrap();
        assert_eq!(
            repo.remove_item(Scope::Local, Some("c"), "i").unwrap(),
            Value::from("v")
        );
        assert_eq!(
            kind(repo.remove_item(Scope::Local, Some("c"), "i")),
            ErrorKind::ItemNotFound
        );
        assert!(repo.has_category(Scope::Local, "c"));
    }

    #[test]
    fn test_get_category_returns_all_items() {
        let repo = Repository::new();
        repo.set(Scope::Local, Some("env"), "a", 1).unwrap();
        repo.set(Scope::Local, Some("env"), "b", "two").unwrap();
        let items = repo.get_category(Scope::Local, "env").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items["b"], Value::from("two"));
        assert_eq!(
            kind(repo.get_category(Scope::Local, "other")),
            ErrorKind::CategoryNotFound
        );
    }

    #[test]
    fn test_set_category_merges() {
        let repo = Repository::new();
        repo.set(Scope::Local, Some("env"), "a", 1).unwrap();
        repo.set_category(Scope::Local, "env", [("b", 2), ("c", 3)], false)
            .unwrap();
        assert_eq!(repo.get_category(Scope::Local, "env").unwrap().len(), 3);
    }

    #[test]
    fn test_set_category_collision_is_partial() {
        let repo = Repository::new();
        repo.set(Scope::Local, Some("env"), "b", "old").unwrap();
        let err = repo
            .set_category(Scope::Local, "env", [("a", "new"), ("b", "new"), ("c", "new")], false)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Collision);

        // "a" was applied before the collision, "c" never was.
        assert!(repo.has_item(Scope::Local, Some("env"), "a"));
        assert_eq!(
            repo.get(Scope::Local, Some("env"), "b").unwrap(),
            Value::from("old")
        );
        assert!(!repo.has_item(Scope::Local, Some("env"), "c"));
    }

    #[test]
    fn test_set_category_invalid_name_creates_nothing() {
        let repo = Repository::new();
        let err = repo
            .set_category(Scope::Local, "env", [("a", "1"), ("", "2")], false)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName);
        assert!(!repo.has_category(Scope::Local, "env"));
        assert!(repo.owners().is_empty());
    }

    #[test]
    fn test_set_category_overwrite() {
        let repo = Repository::new();
        repo.set(Scope::Local, Some("env"), "b", "old").unwrap();
        repo.set_category(Scope::Local, "env", [("b", "new")], true)
            .unwrap();
        assert_eq!(
            repo.get(Scope::Local, Some("env"), "b").unwrap(),
            Value::from("new")
        );
    }

    #[test]
    fn test_clear_owner_is_idempotent() {
        let repo = Repository::new();
        repo.set(Scope::Local, Some("c"), "i", 1).unwrap();
        repo.clear_owner(Scope::Local);
        repo.clear_owner(Scope::Local);
        assert!(repo.category_names(Scope::Local).is_empty());
        assert!(repo.get(Scope::Local, Some("c"), "i").unwrap_err().is_not_found());
    }

    #[test]
    fn test_clear_global_leaves_locals() {
        let repo = Repository::new();
        repo.set(Scope::Global, Some("c"), "g", 1).unwrap();
        repo.set(Scope::Local, Some("c"), "l", 1).unwrap();
        repo.clear_global();
        assert!(!repo.has_item(Scope::Global, Some("c"), "g"));
        assert!(repo.has_item(Scope::Local, Some("c"), "l"));
    }

    #[test]
    fn test_clear_all_drops_every_scope() {
        let repo = Repository::new();
        repo.set(Scope::Global, Some("c"), "g", 1).unwrap();
        repo.set(Scope::Local, Some("c"), "l", 1).unwrap();
        repo.try_get(Scope::Local, Some("c"), "missing");
        repo.clear_all();
        assert!(repo.owners().is_empty());
        assert!(repo.last_error(Scope::Local).is_none());
        assert_eq!(
            kind(repo.get(Scope::Global, Some("c"), "g")),
            ErrorKind::ScopeNotFound
        );
    }

    #[test]
    fn test_clone_values_diverge_afterwards() {
        let repo = Repository::new();
        repo.set(Scope::Global, Some("c"), "i", "A").unwrap();
        repo.clone_scope(Scope::Global, Scope::Local, true).unwrap();
        repo.set(Scope::Global, Some("c"), "i", "B").unwrap();

        assert_eq!(repo.get(Scope::Local, Some("c"), "i").unwrap(), Value::from("A"));
        assert_eq!(repo.get(Scope::Global, Some("c"), "i").unwrap(), Value::from("B"));
    }

    #[test]
    fn test_clone_collision_leaves_destination_unchanged() {
        let repo = Repository::new();
        repo.set(Scope::Global, Some("c"), "i", "global").unwrap();
        repo.set(Scope::Local, Some("c"), "i", "local").unwrap();

        let err = repo
            .clone_scope(Scope::Global, Scope::Local, false)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Collision);
        assert_eq!(
            repo.get(Scope::Local, Some("c"), "i").unwrap(),
            Value::from("local")
        );
    }

    #[test]
    fn test_clone_report_classifies_items() {
        let repo = Repository::new();
        repo.set(Scope::Global, Some("c"), "n", 1).unwrap();
        repo.set(
            Scope::Global,
            Some("c"),
            "acct",
            Value::object(Account {
                name: "a".to_string(),
                balance: 0,
            }),
        )
        .unwrap();
        repo.set(Scope::Global, Some("c"), "lock", Value::shared(StdMutex::new(())))
            .unwrap();

        let report = repo.clone_scope(Scope::Global, Scope::Local, false).unwrap();
        assert_eq!(report.by_value, 1);
        assert_eq!(report.deep, 1);
        assert_eq!(report.by_reference, vec!["c/lock".to_string()]);
        assert_eq!(report.total(), 3);
    }

    #[test]
    fn test_clone_shared_copies_reference() {
        let repo = Repository::new();
        repo.set(Scope::Global, Some("c"), "log", Value::shared(StdMutex::new(Vec::<String>::new())))
            .unwrap();
        repo.clone_item(Scope::Global, Scope::Local, Some("c"), "log", false)
            .unwrap();

        repo.get_shared::<StdMutex<Vec<String>>>(Scope::Local, Some("c"), "log")
            .unwrap()
            .lock()
            .unwrap()
            .push("entry".to_string());
        let global = repo
            .get_shared::<StdMutex<Vec<String>>>(Scope::Global, Some("c"), "log")
            .unwrap();
        assert_eq!(global.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_clone_reference_fallback_is_traced() {
        testing_logger::setup();
        let repo = Repository::new();
        repo.set(Scope::Global, Some("c"), "lock", Value::shared(StdMutex::new(())))
            .unwrap();
        repo.clone_scope(Scope::Global, Scope::Local, true).unwrap();

        testing_logger::validate(|captured_logs| {
            assert!(captured_logs.iter().any(|log| {
                log.level == log::Level::Trace
                    && log.body.contains("c/lock")
                    && log.body.contains("copying by reference")
            }));
        });
    }

    #[test]
    fn test_clone_category_and_missing_sources() {
        let repo = Repository::new();
        repo.set(Scope::Global, Some("a"), "x", 1).unwrap();
        repo.set(Scope::Global, Some("b"), "y", 2).unwrap();

        repo.clone_category(Scope::Global, Scope::Local, "a", false)
            .unwrap();
        assert!(repo.has_category(Scope::Local, "a"));
        assert!(!repo.has_category(Scope::Local, "b"));

        assert_eq!(
            kind(repo.clone_category(Scope::Global, Scope::Local, "zzz", false)),
            ErrorKind::CategoryNotFound
        );
        let empty = OwnerId::allocate();
        assert_eq!(
            kind(repo.clone_scope(Scope::Owner(empty), Scope::Local, false)),
            ErrorKind::ScopeNotFound
        );
        assert_eq!(
            kind(repo.clone_item(Scope::Global, Scope::Local, Some("b"), "nope", false)),
            ErrorKind::ItemNotFound
        );
    }

    #[test]
    fn test_clone_copies_empty_categories() {
        let repo = Repository::new();
        repo.set_category(Scope::Global, "empty", Vec::<(String, Value)>::new(), false)
            .unwrap();
        repo.clone_scope(Scope::Global, Scope::Local, false).unwrap();
        assert!(repo.has_category(Scope::Local, "empty"));
    }

    #[test]
    fn test_clone_onto_itself() {
        let repo = Repository::new();
        repo.set(Scope::Local, Some("c"), "i", 1).unwrap();
        assert_eq!(
            repo.clone_scope(Scope::Local, Scope::Local, true).unwrap(),
            CloneReport::default()
        );
        assert_eq!(
            kind(repo.clone_scope(Scope::Local, Scope::Local, false)),
            ErrorKind::Collision
        );
    }

    #[test]
    fn test_try_get_records_last_error() {
        let repo = Repository::new();
        assert!(repo.try_get(Scope::Local, Some("c"), "i").is_none());
        let err = repo.last_error(Scope::Local).unwrap();
        assert_eq!(err.kind(), ErrorKind::ScopeNotFound);

        // Reading does not clear.
        assert!(repo.last_error(Scope::Local).is_some());
    }

    #[test]
    fn test_try_call_clears_previous_error() {
        let repo = Repository::new();
        repo.try_get_typed::<i64>(Scope::Local, Some("c"), "i");
        assert!(repo.last_error(Scope::Local).is_some());

        assert!(repo.try_set(Scope::Local, Some("c"), "i", "7"));
        assert!(repo.last_error(Scope::Local).is_none());
        assert_eq!(repo.try_get_typed::<i64>(Scope::Local, Some("c"), "i"), Some(7));
    }

    #[test]
    fn test_last_error_is_per_owner() {
        let repo = Repository::new();
        let worker = OwnerId::allocate();
        repo.try_get(Scope::Owner(worker), Some("c"), "i");
        assert!(repo.last_error(Scope::Owner(worker)).is_some());
        assert!(repo.last_error(Scope::Local).is_none());
        assert!(repo.last_error(Scope::Global).is_none());
    }

    #[test]
    fn test_try_set_category_and_clone_record_errors() {
        let repo = Repository::new();
        repo.set(Scope::Global, Some("c"), "i", 1).unwrap();
        repo.set(Scope::Local, Some("c"), "i", 2).unwrap();

        assert!(!repo.try_set_category(Scope::Local, "c", [("i", 3)], false));
        assert_eq!(
            repo.last_error(Scope::Local).unwrap().kind(),
            ErrorKind::Collision
        );

        assert!(repo
            .try_clone_scope(Scope::Global, Scope::Local, false)
            .is_none());
        assert_eq!(
            repo.last_error(Scope::Local).unwrap().kind(),
            ErrorKind::Collision
        );

        assert!(repo
            .try_clone_item(Scope::Global, Scope::Local, Some("c"), "i", true)
            .is_some());
        assert!(repo.last_error(Scope::Local).is_none());
        assert!(repo.try_get_category(Scope::Local, "c").is_some());
        assert!(repo
            .try_clone_category(Scope::Global, Scope::Local, "nope", true)
            .is_none());
    }

    #[test]
    fn test_owners_lists_global_first() {
        let repo = Repository::new();
        repo.set(Scope::Local, Some("c"), "i", 1).unwrap();
        repo.set(Scope::Global, Some("c"), "i", 1).unwrap();
        let owners = repo.owners();
        assert_eq!(owners.len(), 2);
        assert!(owners[0].is_global());
    }
}
