// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Values stored in a [`Namespace`]: data, callables, class handles, and opaque objects.
//!
//! ## Overview
//!
//! [`Value`] is the leaf type of the configuration tree. Besides plain data it
//! carries three kinds of behavior:
//!
//! - [`Callable`]: a named closure with an explicit [`Signature`]. Callables are
//!   "deferred" values; [`evaluate`](crate::evaluate) resolves them against a context.
//! - [`ClassRef`]: a constructor handle. It is invoked through a namespace
//!   `call_target` and is never resolved by evaluation.
//! - [`Object`]: an opaque shared payload compared by identity, used for
//!   component nodes and transport objects that ride along in configuration.

use core::any::Any;
use core::fmt;
use std::collections::BTreeSet;
use std::sync::Arc;

use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::error::BoxError;
use crate::namespace::Namespace;

/// Result returned by user callables.
pub type CallResult = Result<Value, BoxError>;

/// Sentinel markers with special meaning during merge and ordering.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Marker {
    /// "Ensure this key exists as an empty nested namespace."
    ///
    /// Assigning `Empty` over an existing namespace keeps it; over nothing it
    /// creates an empty namespace.
    Empty,
    /// Order an entry after every other entry (see `after`).
    Last,
}

/// Shorthand for [`Marker::Empty`] as a value.
pub const EMPTY: Value = Value::Marker(Marker::Empty);

/// Shorthand for [`Marker::Last`] as a value.
pub const LAST: Value = Value::Marker(Marker::Last);

/// A configuration value.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// String.
    Str(String),
    /// Ordered list.
    List(Vec<Self>),
    /// Nested namespace.
    Namespace(Namespace),
    /// Deferred computation.
    Callable(Callable),
    /// Constructor handle.
    Class(ClassRef),
    /// Opaque payload compared by identity.
    Object(Object),
    /// Merge or ordering marker.
    Marker(Marker),
}

impl Value {
    /// Short human-readable name of the variant, used in diagnostics.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Namespace(_) => "Namespace",
            Self::Callable(_) => "callable",
            Self::Class(_) => "class",
            Self::Object(o) => o.type_name(),
            Self::Marker(_) => "marker",
        }
    }

    /// Returns true for values that can be promoted into `{call_target: ...}`.
    ///
    /// Both callables and classes count; only callables are resolved by evaluation.
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Callable(_) | Self::Class(_))
    }

    /// Returns true if this value is a deferred computation awaiting evaluation.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Callable(_))
    }

    /// Returns true for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Truthiness, used to gate `include`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::List(l) => !l.is_empty(),
            Self::Namespace(ns) => !ns.is_empty(),
            Self::Callable(_) | Self::Class(_) | Self::Object(_) | Self::Marker(_) => true,
        }
    }

    /// Borrow the string payload.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer payload.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Boolean payload.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow the nested namespace.
    pub fn as_namespace(&self) -> Option<&Namespace> {
        match self {
            Self::Namespace(ns) => Some(ns),
            _ => None,
        }
    }

    /// Borrow the callable.
    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Self::Callable(c) => Some(c),
            _ => None,
        }
    }

    /// Borrow the opaque object.
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Downcast an [`Object`] payload.
    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.as_object().and_then(Object::downcast_ref)
    }

    /// Wrap any shareable payload as an [`Object`] value.
    pub fn object<T: Any + Send + Sync>(payload: T) -> Self {
        Self::Object(Object::new(payload))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Namespace(a), Self::Namespace(b)) => a == b,
            (Self::Callable(a), Self::Callable(b)) => a == b,
            (Self::Class(a), Self::Class(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Marker(a), Self::Marker(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::List(l) => f.debug_list().entries(l).finish(),
            Self::Namespace(ns) => write!(f, "{ns}"),
            Self::Callable(c) => write!(f, "{c:?}"),
            Self::Class(c) => write!(f, "{c:?}"),
            Self::Object(o) => write!(f, "{o:?}"),
            Self::Marker(m) => write!(f, "{m:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<Self>> for Value {
    fn from(v: Vec<Self>) -> Self {
        Self::List(v)
    }
}

impl From<Namespace> for Value {
    fn from(v: Namespace) -> Self {
        Self::Namespace(v)
    }
}

impl From<Callable> for Value {
    fn from(v: Callable) -> Self {
        Self::Callable(v)
    }
}

impl From<ClassRef> for Value {
    fn from(v: ClassRef) -> Self {
        Self::Class(v)
    }
}

impl From<Object> for Value {
    fn from(v: Object) -> Self {
        Self::Object(v)
    }
}

impl From<Marker> for Value {
    fn from(v: Marker) -> Self {
        Self::Marker(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(x) => serializer.serialize_f64(*x),
            Self::Str(s) => serializer.serialize_str(s),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Namespace(ns) => {
                let mut map = serializer.serialize_map(Some(ns.len()))?;
                for (k, v) in ns.iter() {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            other => Err(S::Error::custom(format_args!(
                "{} values are not serializable: {other:?}",
                other.type_name()
            ))),
        }
    }
}

/// Parameter names a [`Callable`] accepts.
///
/// Rust closures cannot be introspected, so signatures are declared up front.
/// A callable is invoked with the subset of the context it accepts: every
/// required and optional name present in the context, or the whole context
/// when the signature has a wildcard.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Signature {
    required: BTreeSet<String>,
    optional: BTreeSet<String>,
    wildcard: bool,
}

impl Signature {
    /// A signature that accepts nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// A signature that accepts everything and requires nothing.
    pub fn any() -> Self {
        Self::new().wildcard()
    }

    /// Add required parameter names.
    #[must_use]
    pub fn required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(names.into_iter().map(Into::into));
        self
    }

    /// Add optional parameter names.
    #[must_use]
    pub fn optional<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optional.extend(names.into_iter().map(Into::into));
        self
    }

    /// Accept any additional names.
    #[must_use]
    pub fn wildcard(mut self) -> Self {
        self.wildcard = true;
        self
    }

    /// Returns true if every required name is present in `available`.
    pub fn is_satisfied_by(&self, mut available: impl FnMut(&str) -> bool) -> bool {
        self.required.iter().all(|name| available(name))
    }

    /// Returns true if the callable accepts a parameter called `name`.
    pub fn accepts(&self, name: &str) -> bool {
        self.wildcard || self.required.contains(name) || self.optional.contains(name)
    }

    /// Formal parameter names, required first, each group sorted; `..` marks a wildcard.
    pub fn parameter_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.required.iter().cloned().collect();
        names.extend(self.optional.iter().cloned());
        if self.wildcard {
            names.push("..".to_owned());
        }
        names
    }
}

type CallFn = dyn Fn(&Namespace) -> CallResult + Send + Sync;

/// A named closure with a declared [`Signature`].
#[derive(Clone)]
pub struct Callable {
    name: Arc<str>,
    signature: Arc<Signature>,
    func: Arc<CallFn>,
}

impl Callable {
    /// Create a callable.
    pub fn new<F>(name: impl Into<String>, signature: Signature, func: F) -> Self
    where
        F: Fn(&Namespace) -> CallResult + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name.into()),
            signature: Arc::new(signature),
            func: Arc::new(func),
        }
    }

    /// Create a callable that ignores its arguments and returns `value`.
    pub fn constant(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        Self::new(name, Signature::any(), move |_| Ok(value.clone()))
    }

    /// Name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameters.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Invoke with exactly the given keyword arguments.
    pub fn call(&self, args: &Namespace) -> CallResult {
        (self.func)(args)
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<callable {}>", self.name)
    }
}

/// A constructor: something a namespace `call_target` can instantiate.
///
/// Implemented by component classes. A class may also expose named
/// shortcuts, reached through `call_target__attribute`.
pub trait Construct: Send + Sync {
    /// Class name used in diagnostics.
    fn class_name(&self) -> &str;

    /// Build an instance from keyword arguments.
    fn construct(&self, args: &Namespace) -> CallResult;

    /// Look up a named shortcut.
    fn shortcut(&self, _name: &str) -> Option<Callable> {
        None
    }
}

/// Shared handle to a [`Construct`] implementation.
#[derive(Clone)]
pub struct ClassRef(Arc<dyn Construct>);

impl ClassRef {
    /// Wrap a constructor.
    pub fn new(class: Arc<dyn Construct>) -> Self {
        Self(class)
    }

    /// Class name.
    pub fn name(&self) -> &str {
        self.0.class_name()
    }

    /// Build an instance.
    pub fn construct(&self, args: &Namespace) -> CallResult {
        self.0.construct(args)
    }

    /// Look up a named shortcut.
    pub fn shortcut(&self, name: &str) -> Option<Callable> {
        self.0.shortcut(name)
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class {}>", self.0.class_name())
    }
}

/// Opaque shared payload compared by identity.
#[derive(Clone)]
pub struct Object {
    type_name: &'static str,
    payload: Arc<dyn Any + Send + Sync>,
}

impl Object {
    /// Wrap a payload.
    pub fn new<T: Any + Send + Sync>(payload: T) -> Self {
        Self {
            type_name: short_type_name::<T>(),
            payload: Arc::new(payload),
        }
    }

    /// Name of the payload type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Downcast the payload.
    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// Returns true if the payload has type `T`.
    pub fn is<T: Any + Send + Sync>(&self) -> bool {
        self.payload.is::<T>()
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.payload, &other.payload)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} object>", self.type_name)
    }
}

fn short_type_name<T>() -> &'static str {
    let full = core::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
