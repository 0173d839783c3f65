// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for namespace operations and evaluation.

use thiserror::Error;

/// Boxed error returned by user callables.
///
/// Errors raised inside a [`Callable`](crate::Callable) are carried through
/// unchanged inside [`Error::Call`].
pub type BoxError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// Errors produced by namespace lookups, calls, and evaluation.
#[derive(Debug, Error)]
pub enum Error {
    /// An attribute path could not be followed.
    #[error(
        "'{type_name}' object has no attribute path '{path}', since '{segment_type}' object has no attribute '{segment}'"
    )]
    NoAttributePath {
        /// Type of the object the lookup started from.
        type_name: String,
        /// The full path that was requested.
        path: String,
        /// The segment that failed.
        segment: String,
        /// Type of the object the failing segment was looked up on.
        segment_type: String,
    },

    /// A namespace was called without a `call_target`.
    #[error(
        "Namespace was used as a function, but no call_target was specified. The namespace is: {namespace}"
    )]
    MissingCallTarget {
        /// Rendering of the namespace that was called.
        namespace: String,
    },

    /// A `call_target` resolved to something that cannot be invoked.
    #[error("call_target {found} is not callable")]
    NotCallable {
        /// Description of the value found in `call_target`.
        found: String,
    },

    /// A `call_target__attribute` named a shortcut the class does not have.
    #[error("{class} has no shortcut named '{shortcut}'")]
    UnknownShortcut {
        /// Class name.
        class: String,
        /// The requested shortcut.
        shortcut: String,
    },

    /// A callable's required parameters are not available in the context.
    #[error(
        "Evaluating {callable} didn't resolve it into a value but strict mode was active. The signature doesn't match the given parameters.\n\n    Possible inputs:\n        {}\n\n    Function inputs:\n        {}\n",
        available.join("\n        "),
        parameters.join("\n        ")
    )]
    SignatureMismatch {
        /// Description of the callable.
        callable: String,
        /// Names available in the evaluation context.
        available: Vec<String>,
        /// Formal parameter names of the callable.
        parameters: Vec<String>,
    },

    /// A user callable returned an error.
    #[error("calling {callable} failed: {source}")]
    Call {
        /// Description of the callable.
        callable: String,
        /// The error returned by the callable.
        #[source]
        source: BoxError,
    },
}

/// Result type for namespace operations.
pub type Result<T> = core::result::Result<T, Error>;
