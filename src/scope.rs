//! Scope addressing for the repository
//!
//! Data lives in exactly two tiers: one shared global scope and any number of
//! owner-local scopes. Callers name a tier with [`Scope`]; the repository
//! resolves it to an [`OwnerKey`] at the moment of the call.
//!
//! `Scope::Local` follows the calling thread: every thread is lazily assigned
//! an [`OwnerId`] the first time it asks for one. Work that does not stay on a
//! single thread (async tasks, pooled workers) should allocate an explicit
//! handle with [`OwnerId::allocate`] and pass `Scope::Owner(id)` instead.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_OWNER_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_OWNER: OwnerId = OwnerId::allocate();
}

/// Opaque identifier of one owner-local scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(u64);

impl OwnerId {
    /// Allocates a fresh id. Ids are never reused within a process.
    pub fn allocate() -> Self {
        OwnerId(NEXT_OWNER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The id bound to the calling thread, allocated on first use.
    pub fn current() -> Self {
        THREAD_OWNER.with(|id| *id)
    }

    /// The raw numeric value of this id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The scope a caller addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// The single shared scope visible to every owner.
    Global,
    /// The calling thread's own scope.
    Local,
    /// An explicitly handed-out owner scope.
    Owner(OwnerId),
}

impl Scope {
    /// Resolves this scope to the key under which its data is stored.
    pub fn resolve(self) -> OwnerKey {
        match self {
            Scope::Global => OwnerKey::Global,
            Scope::Local => OwnerKey::Owner(OwnerId::current()),
            Scope::Owner(id) => OwnerKey::Owner(id),
        }
    }
}

impl From<OwnerId> for Scope {
    fn from(id: OwnerId) -> Self {
        Scope::Owner(id)
    }
}

impl From<OwnerKey> for Scope {
    fn from(key: OwnerKey) -> Self {
        match key {
            OwnerKey::Global => Scope::Global,
            OwnerKey::Owner(id) => Scope::Owner(id),
        }
    }
}

/// Resolved storage key: the global sentinel or a concrete owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OwnerKey {
    Global,
    Owner(OwnerId),
}

impl OwnerKey {
    pub fn is_global(&self) -> bool {
        matches!(self, OwnerKey::Global)
    }
}

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnerKey::Global => f.write_str("global scope"),
            OwnerKey::Owner(id) => write!(f, "local scope {}", id),
        }
    }
}
