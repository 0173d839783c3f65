// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`Namespace`] type: path assignment, deep merge, defaults, and calls.
//!
//! ## Merge rules
//!
//! Assigning `value` at a key that already holds `existing`:
//!
//! | existing   | value      | result                                         |
//! |------------|------------|------------------------------------------------|
//! | absent     | any        | `value`                                        |
//! | namespace  | namespace  | recursive merge, `value` wins per leaf         |
//! | namespace  | callable   | `existing` with `call_target = value`          |
//! | namespace  | other      | `value` (the mapping is discarded)             |
//! | callable   | namespace  | `{call_target: existing}` merged with `value`  |
//! | other      | any        | `value`                                        |
//!
//! The empty marker is turned into an empty namespace before these rules
//! apply, so it never discards an existing mapping.
//!
//! When the path has more segments, intermediate namespaces are created on
//! demand; a callable in the way is promoted to `{call_target: ...}` and any
//! other plain value in the way is replaced.

use core::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::flatten::flatten;
use crate::value::{Marker, Value};

/// Separator between segments of a configuration path.
pub const PATH_SEPARATOR: &str = "__";

/// Key holding the function or class a namespace calls.
pub const CALL_TARGET: &str = "call_target";

/// An ordered, path-addressable configuration mapping.
///
/// Cloning is cheap: entries live behind an [`Arc`] and are copied on the
/// first mutation of a shared namespace. Equality ignores insertion order.
#[derive(Clone, Default)]
pub struct Namespace {
    entries: Arc<IndexMap<String, Value>>,
}

impl Namespace {
    /// Create an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a namespace by assigning each `(path, value)` pair in order.
    pub fn from_paths<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut ns = Self::new();
        for (path, value) in pairs {
            ns.set_path(path.as_ref(), value);
        }
        ns
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top-level lookup.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns true if `key` is present at the top level.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Top-level keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Top-level entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Insert a value at a top-level key without path splitting or merging.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries_mut().insert(key.into(), value.into())
    }

    /// Remove a top-level key, preserving the order of the remaining keys.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        if !self.entries.contains_key(key) {
            return None;
        }
        self.entries_mut().shift_remove(key)
    }

    /// Identity of the shared entry storage, used for cycle detection.
    pub(crate) fn identity(&self) -> *const () {
        Arc::as_ptr(&self.entries).cast()
    }

    fn entries_mut(&mut self) -> &mut IndexMap<String, Value> {
        Arc::make_mut(&mut self.entries)
    }

    /// Assign `value` at a `__`-separated path, applying the merge rules.
    pub fn set_path(&mut self, path: &str, value: impl Into<Value>) {
        let mut value = value.into();
        if matches!(value, Value::Marker(Marker::Empty)) {
            value = Value::Namespace(Self::new());
        }
        let (key, rest) = match path.split_once(PATH_SEPARATOR) {
            Some((key, rest)) => (key, Some(rest)),
            None => (path, None),
        };
        let existing = self.entries.get(key);

        let merged = match rest {
            Some(rest) => {
                let mut nested = match existing {
                    Some(Value::Namespace(ns)) => ns.clone(),
                    Some(callable) if callable.is_callable() => {
                        let mut ns = Self::new();
                        ns.insert(CALL_TARGET, callable.clone());
                        ns
                    }
                    // Unable to promote, overwrite.
                    _ => Self::new(),
                };
                nested.set_path(rest, value);
                Value::Namespace(nested)
            }
            None => match (existing, value) {
                (None, value) => value,
                (Some(Value::Namespace(existing)), Value::Namespace(value)) => {
                    Value::Namespace(existing.merged(&value))
                }
                (Some(Value::Namespace(existing)), value) if value.is_callable() => {
                    let mut ns = existing.clone();
                    ns.set_path(CALL_TARGET, value);
                    Value::Namespace(ns)
                }
                (Some(callable), Value::Namespace(value)) if callable.is_callable() => {
                    let mut ns = Self::new();
                    ns.insert(CALL_TARGET, callable.clone());
                    Value::Namespace(ns.merged(&value))
                }
                (Some(_), value) => value,
            },
        };
        self.entries_mut().insert(key.to_owned(), merged);
    }

    /// Return a new namespace with `other` merged on top of `self`.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let mut out = self.clone();
        for (key, value) in other.iter() {
            out.set_path(key, value.clone());
        }
        out
    }

    /// Merge `sources` left to right.
    pub fn merge_all<'a>(sources: impl IntoIterator<Item = &'a Self>) -> Self {
        sources
            .into_iter()
            .fold(Self::new(), |acc, next| acc.merged(next))
    }

    /// Merge `defaults` underneath `self`: existing values win.
    pub fn setdefaults(&mut self, defaults: &Self) {
        *self = defaults.merged(self);
    }

    /// Invoke the namespace as a function.
    ///
    /// `call_target` is called with every other key (merged with `args`) as
    /// keyword arguments. A nested `call_target` namespace may name a class
    /// (`cls`) and one of its shortcuts (`attribute`); a nested
    /// `call_target__call_target` overrides both.
    pub fn call(&self, args: &Self) -> Result<Value> {
        let mut params = self.merged(args);
        let Some(target) = params.remove(CALL_TARGET) else {
            return Err(Error::MissingCallTarget {
                namespace: self.to_string(),
            });
        };
        match target {
            Value::Callable(callable) => callable.call(&params).map_err(|source| Error::Call {
                callable: callable.name().to_owned(),
                source,
            }),
            Value::Class(class) => class.construct(&params).map_err(|source| Error::Call {
                callable: class.name().to_owned(),
                source,
            }),
            Value::Namespace(mut target) => {
                if target.contains_key(CALL_TARGET) {
                    // Override of the default.
                    target.remove("attribute");
                    target.remove("cls");
                    return target.call(&params);
                }
                let class = match target.get("cls") {
                    Some(Value::Class(class)) => class.clone(),
                    Some(other) => {
                        return Err(Error::NotCallable {
                            found: format!("{other:?}"),
                        });
                    }
                    None => {
                        return Err(Error::MissingCallTarget {
                            namespace: target.to_string(),
                        });
                    }
                };
                match target.get("attribute") {
                    Some(Value::Str(attribute)) => {
                        let shortcut =
                            class
                                .shortcut(attribute)
                                .ok_or_else(|| Error::UnknownShortcut {
                                    class: class.name().to_owned(),
                                    shortcut: attribute.clone(),
                                })?;
                        shortcut.call(&params).map_err(|source| Error::Call {
                            callable: format!("{}.{attribute}", class.name()),
                            source,
                        })
                    }
                    Some(Value::Null) | None => {
                        class.construct(&params).map_err(|source| Error::Call {
                            callable: class.name().to_owned(),
                            source,
                        })
                    }
                    Some(other) => Err(Error::NotCallable {
                        found: format!("{other:?}"),
                    }),
                }
            }
            other => Err(Error::NotCallable {
                found: format!("{other:?}"),
            }),
        }
    }
}

impl PartialEq for Namespace {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries) || *self.entries == *other.entries
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut items: Vec<(String, Value)> = flatten(self).into_iter().collect();
        items.sort_by(|a, b| a.0.cmp(&b.0));
        f.write_str("Namespace(")?;
        for (i, (k, v)) in items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}={v:?}")?;
        }
        f.write_str(")")
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for Namespace {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_paths(iter)
    }
}

/// Build a [`Namespace`] from keyword-style paths.
///
/// ```
/// use understory_namespace::{namespace, Value};
///
/// let ns = namespace! { columns__name__after = 0, title = "Artists" };
/// assert_eq!(
///     understory_namespace::get_path(&ns, "columns__name__after").unwrap(),
///     Value::Int(0),
/// );
/// ```
#[macro_export]
macro_rules! namespace {
    () => {
        $crate::Namespace::new()
    };
    ($($key:ident = $value:expr),+ $(,)?) => {{
        let mut ns = $crate::Namespace::new();
        $( ns.set_path(stringify!($key), $value); )+
        ns
    }};
}
