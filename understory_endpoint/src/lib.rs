// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_endpoint --heading-base-level=0

//! Understory Endpoint: built-in parts and path-addressed dispatch.
//!
//! This crate sits between a transport (an HTTP server, a test harness) and
//! the declarative layer:
//!
//! - [`Request`]: method, query or form data, user, and view parameters. It
//!   seeds the root evaluation context with `request`, `user` and `params`.
//! - Built-in classes: [`part`], [`endpoint`], [`fragment`], [`page`],
//!   [`form`], [`field`] and [`action`].
//! - Dispatch: [`find_target`] resolves a short or long path to a bound
//!   component; [`perform_dispatch`] answers the single dispatch key of a
//!   request; [`render_to_response`] binds, dispatches, and renders.
//! - [`Settings`]: debug mode and the default style, from JSON or the
//!   environment.
//!
//! ## Example
//!
//! ```
//! use understory_endpoint::{Request, Settings, page, render_to_response};
//! use understory_namespace::{namespace, Callable, Signature, Value};
//!
//! let echo = Callable::new("echo", Signature::new().required(["value"]), |args| {
//!     Ok(args.get("value").cloned().unwrap_or_default())
//! });
//! let view = page().declare(&namespace! { endpoints__echo__func = echo }).unwrap();
//!
//! let request = Request::get([("/echo", "hello")]);
//! let response = render_to_response(&view, &request, &Settings::default()).unwrap();
//! assert_eq!(response.body(), "\"hello\"");
//! ```

mod dispatch;
mod error;
mod parts;
mod request;
mod response;
mod settings;

pub use dispatch::{
    Target, dispatch_response, find_target, perform_ajax_dispatch, perform_dispatch,
    perform_post_dispatch, render_to_response, tree_of,
};
pub use error::{DispatchError, Result};
pub use parts::{action, endpoint, field, form, fragment, html, page, part, render_root, title};
pub use request::{DISPATCH_PREFIX, Method, POST_PREFIX, Request, request_of};
pub use response::{HTML, JSON, Response};
pub use settings::{DEBUG_VAR, STYLE_VAR, Settings};
