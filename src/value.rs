//! Dynamically typed payloads stored in the repository
//!
//! A [`Value`] is a closed tagged union over the scalar types test code passes
//! around most (strings, integers, floats, booleans) plus two opaque variants:
//!
//! - **`Object`**: any `Clone` type boxed behind the [`DeepClone`] capability.
//!   Copying it between scopes produces an independent duplicate.
//! - **`Shared`**: any `Send + Sync` type held by `Arc`. It has no clone
//!   contract, so copying it between scopes shares the same allocation.
//!
//! Typed reads go through [`FromValue`], which also implements the one
//! coercion the repository allows: numeric targets parse string payloads.

use serde::{Serialize, Serializer};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Capability to produce an independent duplicate of a boxed value.
///
/// Every `Clone + Debug + Send + Sync` type gets this for free.
pub trait DeepClone: Any + Send + Sync + fmt::Debug {
    fn deep_clone(&self) -> Box<dyn DeepClone>;
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T> DeepClone for T
where
    T: Any + Clone + Send + Sync + fmt::Debug,
{
    fn deep_clone(&self) -> Box<dyn DeepClone> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A reference-counted payload without a clone contract.
#[derive(Clone)]
pub struct SharedRef {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl SharedRef {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Downcasts to the concrete `Arc<T>`, sharing the allocation.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok()
    }

    /// True when both handles point at the same allocation.
    pub fn ptr_eq(&self, other: &SharedRef) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for SharedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedRef<{}>", self.type_name)
    }
}

/// How a value is duplicated when copied from one scope to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneKind {
    /// Scalars, copied by value.
    Value,
    /// Objects, duplicated through [`DeepClone`].
    Deep,
    /// Shared payloads, copied by reference.
    Reference,
}

/// A value stored in the repository.
#[derive(Debug)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Object(Box<dyn DeepClone>),
    Shared(SharedRef),
}

impl Value {
    /// Wraps a cloneable value so that scope-to-scope copies are independent.
    pub fn object<T: DeepClone>(value: T) -> Self {
        Value::Object(Box::new(value))
    }

    /// Wraps a value that is copied by reference between scopes.
    pub fn shared<T: Any + Send + Sync>(value: T) -> Self {
        Self::shared_arc(Arc::new(value))
    }

    /// Like [`Value::shared`], for a value the caller already holds in an `Arc`.
    pub fn shared_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Value::Shared(SharedRef {
            type_name: std::any::type_name::<T>(),
            inner: value,
        })
    }

    /// Name of the payload's runtime type, as reported in type mismatches.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "String",
            Value::Int(_) => "i64",
            Value::Float(_) => "f64",
            Value::Bool(_) => "bool",
            Value::Object(obj) => (**obj).type_name(),
            Value::Shared(shared) => shared.type_name(),
        }
    }

    pub fn clone_kind(&self) -> CloneKind {
        match self {
            Value::Str(_) | Value::Int(_) | Value::Float(_) | Value::Bool(_) => CloneKind::Value,
            Value::Object(_) => CloneKind::Deep,
            Value::Shared(_) => CloneKind::Reference,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrows an `Object` or `Shared` payload as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Object(obj) => (**obj).as_any().downcast_ref::<T>(),
            Value::Shared(shared) => shared.inner.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        match self {
            Value::Str(s) => Value::Str(s.clone()),
            Value::Int(i) => Value::Int(*i),
            Value::Float(f) => Value::Float(*f),
            Value::Bool(b) => Value::Bool(*b),
            Value::Object(obj) => Value::Object((**obj).deep_clone()),
            Value::Shared(shared) => Value::Shared(shared.clone()),
        }
    }
}

/// Scalars compare by value and shared payloads by identity. Objects have no
/// equality contract and never compare equal. A stored NaN equals NaN so that
/// a float reads back equal to what was written.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Shared(a), Value::Shared(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Object(obj) => write!(f, "<{}>", (**obj).type_name()),
            Value::Shared(shared) => write!(f, "<shared {}>", shared.type_name()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Str(s) => serializer.serialize_str(s),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Bool(b) => serializer.serialize_bool(*b),
            opaque => serializer.serialize_str(&opaque.to_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Float(f64::from(x))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Extraction of a concrete Rust type from a stored [`Value`].
pub trait FromValue: Sized {
    /// Name reported as the expected type when extraction fails.
    fn type_name() -> &'static str;

    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for String {
    fn type_name() -> &'static str {
        "String"
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromValue for bool {
    fn type_name() -> &'static str {
        "bool"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

// Integer targets accept stored integers that fit, and strings that parse.
macro_rules! impl_from_value_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn type_name() -> &'static str {
                    stringify!($ty)
                }

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::Int(i) => <$ty>::try_from(*i).ok(),
                        Value::Str(s) => s.trim().parse::<$ty>().ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_from_value_int!(i64, i32, u32, u64);

impl FromValue for f64 {
    fn type_name() -> &'static str {
        "f64"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(x) => Some(*x),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FromValue for f32 {
    fn type_name() -> &'static str {
        "f32"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(x) => narrow_f32(*x),
            Value::Str(s) => s.trim().parse::<f64>().ok().and_then(narrow_f32),
            _ => None,
        }
    }
}

/// Narrows to `f32`, rejecting finite values outside its range.
fn narrow_f32(x: f64) -> Option<f32> {
    let narrowed = x as f32;
    (narrowed.is_finite() || !x.is_finite()).then_some(narrowed)
}
