// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for dispatch, responses, and settings.

use thiserror::Error;

/// Errors raised while dispatching a request to a bound tree.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Declaring, refining, or binding failed.
    #[error(transparent)]
    Declarative(#[from] understory_declarative::Error),

    /// A handler could not be called or returned an error.
    #[error(transparent)]
    Namespace(#[from] understory_namespace::Error),

    /// A dispatch path does not name any component of the tree.
    #[error(
        "Given path {path} not found.\n    Short alternatives:\n        {}\n    Long alternatives:\n        {}",
        format_paths(short),
        format_paths(long)
    )]
    InvalidEndpointPath {
        /// The path as received.
        path: String,
        /// Short paths of the tree, sorted.
        short: Vec<String>,
        /// Long paths of the tree, sorted.
        long: Vec<String>,
    },

    /// A known path whose component is not part of this bound tree.
    #[error("Failed to traverse long path '{long_path}' (No bound value for '{segment}')")]
    NotBound {
        /// Long path being followed.
        long_path: String,
        /// First segment without a bound node.
        segment: String,
    },

    /// The target of an AJAX dispatch is not an endpoint with a `func`.
    #[error("Target {target} is not a valid endpoint handler")]
    NotAnEndpoint {
        /// Description of the target.
        target: String,
    },

    /// The target of a POST dispatch has no `post_handler`.
    #[error(
        "Target {target} has no registered post_handler.\n    Path: {path}\n    Parents:\n        {}",
        parents.join("\n        ")
    )]
    MissingPostHandler {
        /// Description of the target.
        target: String,
        /// The dispatch path.
        path: String,
        /// Descriptions of the components above the target, root first.
        parents: Vec<String>,
    },

    /// More than one dispatch key in one request.
    #[error("You can only have one or no dispatch commands, got: {}", commands.join(", "))]
    MultipleCommands {
        /// The dispatch keys found.
        commands: Vec<String>,
    },

    /// A POST carried no dispatch key.
    #[error("This request was a POST, but there was no dispatch command present.")]
    PostWithoutCommand,

    /// Only GET and POST are supported.
    #[error("unsupported request method {method}")]
    UnsupportedMethod {
        /// The method received.
        method: String,
    },

    /// An environment setting could not be parsed.
    #[error("invalid value {value:?} for setting {name}")]
    InvalidSetting {
        /// Variable name.
        name: String,
        /// Value found.
        value: String,
    },

    /// JSON encoding or decoding failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl DispatchError {
    /// Returns true for errors about the dispatch path rather than the tree.
    ///
    /// Outside debug mode these are answered with a generic JSON error.
    pub fn is_invalid_path(&self) -> bool {
        matches!(
            self,
            Self::InvalidEndpointPath { .. }
                | Self::NotBound { .. }
                | Self::NotAnEndpoint { .. }
                | Self::MissingPostHandler { .. }
        )
    }
}

fn format_paths(paths: &[String]) -> String {
    paths
        .iter()
        .map(|p| if p.is_empty() { "''" } else { p.as_str() })
        .collect::<Vec<_>>()
        .join("\n        ")
}

/// Result type for dispatch operations.
pub type Result<T> = core::result::Result<T, DispatchError>;
