// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_declarative --heading-base-level=0

//! Understory Declarative: configurable component templates and request-bound trees.
//!
//! Components are declared once, configured from the outside through
//! [`Namespace`](understory_namespace::Namespace) paths, and bound for each
//! request into a fresh tree.
//!
//! ## Lifecycle
//!
//! - [`Class`]: a runtime descriptor listing refinable attributes, evaluated
//!   attributes, member collections, defaults, shortcuts and hooks.
//! - [`Declared`]: an immutable template. [`Declared::refine`] and
//!   [`Declared::refine_defaults`] derive new templates;
//!   [`Declared::refine_done`] applies the [`Style`] overlay and builds the
//!   member collections, ordered by `after`.
//! - [`BoundTree`]: the result of binding a finished template. Evaluated
//!   attributes are resolved against the request parameters and whatever the
//!   classes contribute; excluded components are absent.
//!
//! ## Addressing
//!
//! Every bound component has a long path (`fields/name`) and a unique short
//! path (`name`) assigned by the [`PathIndex`]. Short paths are what
//! dispatch keys carry.
//!
//! ## Example
//!
//! ```
//! use understory_declarative::{BoundTree, Class, MemberSpec, StyleRegistry};
//! use understory_namespace::{namespace, Namespace, Value};
//!
//! let field = Class::builder("Field").evaluated("initial").build();
//! let form = Class::builder("Form")
//!     .members("fields", MemberSpec::new(&field))
//!     .build();
//!
//! let declared = form
//!     .declare(&namespace! { fields__name__initial = "Ada", fields__age = Namespace::new() })
//!     .unwrap();
//! let tree = BoundTree::bind_with_styles(&declared, &Namespace::new(), &StyleRegistry::new())
//!     .unwrap()
//!     .unwrap();
//!
//! let name = tree.member(tree.root(), "fields", "name").unwrap();
//! assert_eq!(tree.attribute(name, "initial"), Some(&Value::from("Ada")));
//! assert_eq!(tree.long_path(name).unwrap(), "fields/name");
//! assert_eq!(tree.path(name).unwrap(), "name");
//! ```

mod attrs;
mod class;
mod declared;
mod error;
mod path;
mod render;
mod sort_after;
mod style;
mod tree;
mod types;

pub use attrs::{evaluate_attrs, render_attrs};
pub use class::{
    Class, ClassBuilder, EvaluateParameters, MemberSpec, OnBind, RefinableKind, Render,
};
pub use declared::{Collection, Declared, MemberEntry, RESERVED_NAMES};
pub use error::{Error, Result};
pub use path::{PathIndex, SEPARATOR, build_long_path, build_long_path_by_path};
pub use render::escape_html;
pub use sort_after::{After, sort_after};
pub use style::{BASE_STYLE, Style, StyleRegistry, init as init_styles, registry as styles};
pub use tree::{BoundTree, Child, NodeKind, RequestParameters};
pub use types::{CollectionFlags, NodeId};
