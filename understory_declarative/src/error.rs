// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for declaring, refining, and binding components.

use thiserror::Error;

/// Errors raised while declaring, refining, or binding components.
///
/// Apart from [`Error::PathNotFound`], every variant is a configuration bug
/// in the declaring code and is meant to be fixed, not handled.
#[derive(Debug, Error)]
pub enum Error {
    /// A namespace operation or user callable failed.
    #[error(transparent)]
    Namespace(#[from] understory_namespace::Error),

    /// Configuration named attributes the class does not declare.
    #[error(
        "{class} object has no refinable attribute(s): {}.\nAvailable attributes:\n    {}\n",
        quoted(names),
        available.join("\n    ")
    )]
    UnknownRefinable {
        /// Class name.
        class: String,
        /// Offending names, sorted.
        names: Vec<String>,
        /// Declared refinable names, sorted.
        available: Vec<String>,
    },

    /// Member names collide with names reserved by the component protocol.
    #[error("The names {} are reserved, please pick other names", names.join(", "))]
    ReservedNames {
        /// Offending names, sorted.
        names: Vec<String>,
    },

    /// `refine`, `refine_defaults` or `refine_done` on a finished node.
    #[error("refine_done() already invoked on {node}")]
    AlreadyRefineDone {
        /// Description of the node.
        node: String,
    },

    /// A member collection entry is neither a component nor configuration.
    #[error(
        "I got {found} when creating a {class}.{name}, but I was expecting a component or a namespace"
    )]
    UnexpectedMember {
        /// Default class of the collection.
        class: String,
        /// Member name.
        name: String,
        /// Type of the offending value.
        found: String,
    },

    /// `after` referenced names that are not in the collection.
    #[error(
        "Tried to order {direction} {} but {} not exist.\nAvailable names:\n    {}",
        missing.join(", "),
        if missing.len() == 1 { "that key does" } else { "those keys do" },
        available.join("\n    ")
    )]
    SortAfter {
        /// `"after"` or `"before"`.
        direction: &'static str,
        /// Names that were not found, sorted.
        missing: Vec<String>,
        /// Names in the collection, sorted.
        available: Vec<String>,
    },

    /// `after` held something other than an index, a name, or `LAST`.
    #[error("after for {name} must be an integer, a name, or LAST, got {found}")]
    InvalidAfter {
        /// Member name.
        name: String,
        /// Rendering of the value found.
        found: String,
    },

    /// An evaluated attribute still held a callable after evaluation.
    #[error(
        "Evaluating {attribute} on {path} resolved to a callable. Check the parameter names.\n\n    Available parameters:\n        {}\n\n    Callable parameters:\n        {}\n",
        available.join("\n        "),
        parameters.join("\n        ")
    )]
    StillCallable {
        /// Attribute name.
        attribute: String,
        /// Dunder path of the node.
        path: String,
        /// Names in the evaluation context.
        available: Vec<String>,
        /// Formal parameters of the callable.
        parameters: Vec<String>,
    },

    /// A node was attached under a parent that is not part of a bound tree.
    #[error("parent {parent} is not bound")]
    ParentNotBound {
        /// Debug rendering of the parent id.
        parent: String,
    },

    /// No unique short path is left for a node.
    #[error(
        "Ran out of names... Any suitable short name for {long_path} already taken.\n\nResult so far:\n{}",
        so_far.iter().map(|(short, long)| format!("{short}   ->   {long}")).collect::<Vec<_>>().join("\n")
    )]
    PathsExhausted {
        /// Long path of the node that could not be placed.
        long_path: String,
        /// Short to long paths claimed before the failure.
        so_far: Vec<(String, String)>,
    },

    /// A node's long path is not in the path index.
    #[error("Path not found(!) (Searched for {long_path} among the following:\n{})", candidates.join("\n"))]
    PathNotFound {
        /// The long path searched for.
        long_path: String,
        /// Long paths in the index.
        candidates: Vec<String>,
    },

    /// A style name is not registered.
    #[error("No registered style {name}. Available styles:\n    {}", available.join("\n    "))]
    UnknownStyle {
        /// The requested style.
        name: String,
        /// Registered style names, sorted.
        available: Vec<String>,
    },

    /// The process-wide style registry was initialised twice.
    #[error("the style registry is already initialised")]
    StylesAlreadyInitialized,

    /// An `attrs` value cannot be rendered.
    #[error("{message}")]
    InvalidAttrs {
        /// Description of the offending value.
        message: String,
    },
}

fn quoted(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("\"{n}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for declarative operations.
pub type Result<T> = core::result::Result<T, Error>;
