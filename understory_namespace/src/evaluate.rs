// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resolving deferred values against an evaluation context.
//!
//! A context is a [`Namespace`] of named parameters (`request`, `form`,
//! `row`, ...). A [`Callable`] receives the subset of the context its
//! [`Signature`](crate::Signature) accepts; a wildcard signature receives the
//! whole context. Missing optional parameters are simply not passed.

use crate::error::{Error, Result};
use crate::namespace::Namespace;
use crate::value::{Callable, Value};

/// Invoke `callable` with the parameters of `context` it accepts.
///
/// Does not check required parameters; see [`evaluate`] for that.
pub fn call_with_context(callable: &Callable, context: &Namespace) -> Result<Value> {
    let signature = callable.signature();
    let mut args = Namespace::new();
    for (name, value) in context.iter().filter(|(name, _)| signature.accepts(name)) {
        args.insert(name, value.clone());
    }
    callable.call(&args).map_err(|source| Error::Call {
        callable: callable.name().to_owned(),
        source,
    })
}

fn matches(callable: &Callable, context: &Namespace) -> bool {
    callable
        .signature()
        .is_satisfied_by(|name| context.contains_key(name))
}

/// Resolve `value` against `context`, failing if a callable cannot be called.
///
/// Non-callables, including classes, are returned unchanged. A callable
/// whose required parameters are not all in `context` is an
/// [`Error::SignatureMismatch`] listing both sides.
pub fn evaluate(value: &Value, context: &Namespace) -> Result<Value> {
    match value {
        Value::Callable(callable) => {
            if matches(callable, context) {
                call_with_context(callable, context)
            } else {
                Err(signature_mismatch(callable, context))
            }
        }
        other => Ok(other.clone()),
    }
}

/// Like [`evaluate`], but a callable that cannot be called is returned as is.
///
/// Used where a later stage decides whether an unresolved callable is an
/// error.
pub fn evaluate_lenient(value: &Value, context: &Namespace) -> Result<Value> {
    match value {
        Value::Callable(callable) if matches(callable, context) => {
            call_with_context(callable, context)
        }
        other => Ok(other.clone()),
    }
}

/// Strictly evaluate every entry of `ns`, descending into nested namespaces.
pub fn evaluate_recursively(ns: &Namespace, context: &Namespace) -> Result<Namespace> {
    let mut out = Namespace::new();
    for (key, value) in ns.iter() {
        let resolved = match value {
            Value::Namespace(nested) => Value::Namespace(evaluate_recursively(nested, context)?),
            other => evaluate(other, context)?,
        };
        out.insert(key, resolved);
    }
    Ok(out)
}

/// Strictly evaluate the top-level entries of `ns`.
pub fn evaluate_entries(ns: &Namespace, context: &Namespace) -> Result<Namespace> {
    let mut out = Namespace::new();
    for (key, value) in ns.iter() {
        out.insert(key, evaluate(value, context)?);
    }
    Ok(out)
}

/// The "signature doesn't match" diagnostic for `callable` in `context`.
pub fn signature_mismatch(callable: &Callable, context: &Namespace) -> Error {
    Error::SignatureMismatch {
        callable: callable.name().to_owned(),
        available: context.keys().map(str::to_owned).collect(),
        parameters: callable.signature().parameter_names(),
    }
}
