// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Attribute-path lookup over namespaces and other attribute-bearing objects.

use crate::error::{Error, Result};
use crate::namespace::{Namespace, PATH_SEPARATOR};
use crate::value::Value;

/// Something whose named attributes can be walked by [`get_path`].
///
/// Implemented here for [`Namespace`] and [`Value`]; component types in
/// downstream crates implement it to expose their configured attributes.
pub trait AttributePath {
    /// Type name used in "no attribute path" diagnostics.
    fn type_name(&self) -> &str;

    /// Look up one attribute.
    fn attribute(&self, name: &str) -> Option<Value>;

    /// The object itself as a value, returned for the empty path.
    fn to_value(&self) -> Value;
}

impl AttributePath for Namespace {
    fn type_name(&self) -> &str {
        "Namespace"
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }

    fn to_value(&self) -> Value {
        Value::Namespace(self.clone())
    }
}

impl AttributePath for Value {
    fn type_name(&self) -> &str {
        Self::type_name(self)
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        match self {
            Self::Namespace(ns) => ns.get(name).cloned(),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        self.clone()
    }
}

enum Lookup {
    Found(Value),
    Missing { segment: String, segment_type: String },
}

fn walk<T: AttributePath + ?Sized>(obj: &T, path: &str) -> Lookup {
    if path.is_empty() {
        return Lookup::Found(obj.to_value());
    }
    let mut segments = path.split(PATH_SEPARATOR);
    let Some(first) = segments.next() else {
        return Lookup::Found(obj.to_value());
    };
    let mut current = match obj.attribute(first) {
        Some(value) => value,
        None => {
            return Lookup::Missing {
                segment: first.to_owned(),
                segment_type: obj.type_name().to_owned(),
            };
        }
    };
    for segment in segments {
        if current.is_null() {
            return Lookup::Found(Value::Null);
        }
        current = match AttributePath::attribute(&current, segment) {
            Some(value) => value,
            None => {
                return Lookup::Missing {
                    segment: segment.to_owned(),
                    segment_type: Value::type_name(&current).to_owned(),
                };
            }
        };
    }
    Lookup::Found(current)
}

/// Follow a `__`-separated attribute path.
///
/// A `Null` anywhere along the way short-circuits to `Null`. A missing
/// attribute is an [`Error::NoAttributePath`] naming both the full path and
/// the failing segment.
pub fn get_path<T: AttributePath + ?Sized>(obj: &T, path: &str) -> Result<Value> {
    match walk(obj, path) {
        Lookup::Found(value) => Ok(value),
        Lookup::Missing {
            segment,
            segment_type,
        } => Err(Error::NoAttributePath {
            type_name: obj.type_name().to_owned(),
            path: path.to_owned(),
            segment,
            segment_type,
        }),
    }
}

/// Like [`get_path`], but returns `default` when an attribute is missing.
pub fn get_path_or<T: AttributePath + ?Sized>(obj: &T, path: &str, default: Value) -> Value {
    match walk(obj, path) {
        Lookup::Found(value) => value,
        Lookup::Missing { .. } => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace;

    #[test]
    fn set_then_get_round_trips() {
        let mut ns = Namespace::new();
        ns.set_path("a__b__c", 5);
        assert_eq!(get_path(&ns, "a__b__c").unwrap(), Value::Int(5));
    }

    #[test]
    fn empty_path_returns_object() {
        let ns = namespace! { a = 1 };
        assert_eq!(get_path(&ns, "").unwrap(), Value::Namespace(ns.clone()));
    }

    #[test]
    fn missing_attribute_names_path_and_segment() {
        let ns = namespace! { a__b = 1 };
        let err = get_path(&ns, "a__c__d").unwrap_err();
        assert_eq!(
            err.to_string(),
            "'Namespace' object has no attribute path 'a__c__d', since 'Namespace' object has no attribute 'c'"
        );
        let err = get_path(&ns, "a__b__d").unwrap_err();
        assert!(err.to_string().contains("'int' object has no attribute 'd'"));
    }

    #[test]
    fn default_is_returned_for_missing_chain() {
        let ns = namespace! { a = 1 };
        assert_eq!(get_path_or(&ns, "missing", Value::Int(42)), Value::Int(42));
        assert_eq!(get_path_or(&ns, "a__b", Value::Int(42)), Value::Int(42));
        assert_eq!(get_path_or(&Value::Int(3), "x", Value::Int(42)), Value::Int(42));
    }

    #[test]
    fn null_short_circuits() {
        let ns = namespace! { a = Value::Null };
        assert_eq!(get_path(&ns, "a__b__c").unwrap(), Value::Null);
    }
}
