// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_namespace --heading-base-level=0

//! Understory Namespace: ordered, path-addressable configuration with deep merge.
//!
//! ## Overview
//!
//! A [`Namespace`] is the configuration currency of the declarative layer.
//! Keys may be written as `__`-separated paths (`columns__name__after`),
//! which expand into nested namespaces. Assigning over an existing key
//! follows a small set of merge rules (see [`namespace`](crate::namespace)):
//! nested namespaces merge recursively, callables are promoted into
//! `{call_target: ...}` when configuration is attached to them, and the
//! [`EMPTY`] marker ensures a nested namespace exists without discarding it.
//!
//! ## Evaluation
//!
//! Values may be deferred [`Callable`]s. [`evaluate`] resolves a value
//! against a context namespace, passing each callable only the parameters
//! its [`Signature`] accepts.
//!
//! ## Example
//!
//! ```
//! use understory_namespace::{namespace, flatten, Callable, Value};
//!
//! let render = Callable::constant("render", "<td/>");
//! let defaults = namespace! { cell = render.clone(), title = "Artists" };
//! let config = defaults.merged(&namespace! { cell__attrs__class__wide = true });
//!
//! // `cell` was promoted: the callable moved into `call_target`.
//! let flat = flatten(&config);
//! assert_eq!(flat["cell__call_target"], Value::Callable(render));
//! assert_eq!(flat["cell__attrs__class__wide"], Value::Bool(true));
//! ```

mod error;
mod evaluate;
mod flatten;
pub mod namespace;
mod path;
mod value;

pub use error::{BoxError, Error, Result};
pub use evaluate::{
    call_with_context, evaluate, evaluate_entries, evaluate_lenient, evaluate_recursively,
    signature_mismatch,
};
pub use flatten::flatten;
pub use namespace::{CALL_TARGET, Namespace, PATH_SEPARATOR};
pub use path::{AttributePath, get_path, get_path_or};
pub use value::{
    CallResult, Callable, ClassRef, Construct, EMPTY, LAST, Marker, Object, Signature, Value,
};
