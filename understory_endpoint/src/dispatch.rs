// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Path-addressed dispatch.
//!
//! A GET whose data holds a key starting with `/` is an AJAX call: the key is
//! the short path of an [`endpoint`](crate::endpoint) and its `func` answers
//! with the key's value. A POST must hold a key starting with `-`: the key is
//! the short path of a component with a `post_handler`.
//!
//! Handlers are [`Callable`]s evaluated against the target's evaluation
//! context extended with:
//!
//! - `value`: the dispatch value,
//! - `root`: the [`NodeId`] of the root,
//! - `tree`: the bound tree, see [`tree_of`].
//!
//! What a handler returns decides the response: `Null` means no dispatch
//! response, a [`Response`] is passed through, a [`Declared`] component is
//! bound and rendered as a document, and anything else is sent as JSON.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};
use understory_declarative::{BoundTree, Declared, NodeId, NodeKind};
use understory_namespace::{Callable, Namespace, Value, evaluate};

use crate::error::{DispatchError, Result};
use crate::parts::render_root;
use crate::request::{DISPATCH_PREFIX, Method, POST_PREFIX, Request};
use crate::response::Response;
use crate::settings::Settings;

/// A resolved dispatch target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    /// The addressed component.
    pub node: NodeId,
    /// Components from the root down to the target's parent.
    pub ancestors: Vec<NodeId>,
}

/// The bound tree passed to handlers as `tree`.
pub fn tree_of(args: &Namespace) -> Option<&BoundTree> {
    args.get("tree")?
        .downcast_ref::<Arc<BoundTree>>()
        .map(Arc::as_ref)
}

fn describe(tree: &BoundTree, id: NodeId) -> String {
    let class = tree.class(id).map_or("?", |c| c.name());
    let name = tree.name(id).unwrap_or_default();
    format!("<{class} {name}>")
}

fn sorted_unique<'a>(paths: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut paths: Vec<String> = paths.map(str::to_owned).collect();
    paths.sort();
    paths.dedup();
    paths
}

fn invalid_path(tree: &BoundTree, path: &str) -> Result<DispatchError> {
    let index = tree.path_index()?;
    Ok(DispatchError::InvalidEndpointPath {
        path: path.to_owned(),
        short: sorted_unique(index.short_paths()),
        long: sorted_unique(index.long_paths()),
    })
}

/// Resolve a dispatch path such as `/name` to a bound component.
///
/// The path is looked up as a short path first, then as a long path.
pub fn find_target(tree: &BoundTree, path: &str) -> Result<Target> {
    let Some(p) = path.strip_prefix(DISPATCH_PREFIX) else {
        return Err(invalid_path(tree, path)?);
    };
    let index = tree.path_index()?;
    let long_path = match index.long_path(p) {
        Some(long_path) => long_path.to_owned(),
        None if index.short_path(p).is_some() => p.to_owned(),
        None => return Err(invalid_path(tree, path)?),
    };

    let mut node = tree.root();
    let mut ancestors = Vec::new();
    for segment in long_path.split(DISPATCH_PREFIX).filter(|s| !s.is_empty()) {
        let Some(next) = tree.child(node, segment) else {
            return Err(DispatchError::NotBound {
                long_path: long_path.clone(),
                segment: segment.to_owned(),
            });
        };
        if tree.kind(node) == Some(NodeKind::Component) {
            ancestors.push(node);
        }
        node = next;
    }
    Ok(Target { node, ancestors })
}

fn handler_context(tree: &Arc<BoundTree>, target: NodeId, value: &str) -> Namespace {
    let mut context = tree.evaluate_parameters(target).cloned().unwrap_or_default();
    context.insert("root", Value::object(tree.root()));
    context.insert("tree", Value::object(Arc::clone(tree)));
    context.insert("value", value);
    context
}

fn call(handler: &Callable, context: &Namespace) -> Result<Value> {
    Ok(evaluate(&Value::Callable(handler.clone()), context)?)
}

/// Call the `func` of the endpoint at `path` with `value`.
pub fn perform_ajax_dispatch(tree: &Arc<BoundTree>, path: &str, value: &str) -> Result<Value> {
    let target = find_target(tree, path)?;
    let is_endpoint = tree.class(target.node).is_some_and(|c| c.is_a("Endpoint"));
    let func = match tree.attribute(target.node, "func") {
        Some(Value::Callable(func)) if is_endpoint => func,
        _ => {
            return Err(DispatchError::NotAnEndpoint {
                target: describe(tree, target.node),
            });
        }
    };
    debug!(path, "ajax dispatch");
    call(func, &handler_context(tree, target.node, value))
}

/// Call the `post_handler` of the component at `path` with `value`.
///
/// `path` may use either prefix; `-name` and `/name` address the same
/// component.
pub fn perform_post_dispatch(tree: &Arc<BoundTree>, path: &str, value: &str) -> Result<Value> {
    let rest = path
        .strip_prefix(POST_PREFIX)
        .or_else(|| path.strip_prefix(DISPATCH_PREFIX));
    let Some(rest) = rest else {
        return Err(invalid_path(tree, path)?);
    };
    let path = format!("{DISPATCH_PREFIX}{rest}");
    let target = find_target(tree, &path)?;
    let Some(Value::Callable(handler)) = tree.attribute(target.node, "post_handler") else {
        return Err(DispatchError::MissingPostHandler {
            target: describe(tree, target.node),
            path,
            parents: target
                .ancestors
                .iter()
                .map(|id| describe(tree, *id))
                .collect(),
        });
    };
    debug!(path = %path, "post dispatch");
    call(handler, &handler_context(tree, target.node, value))
}

/// Answer the dispatch command of `request`, if it has one.
///
/// Returns `Ok(None)` when there is no command or the handler returned
/// `Null`; the caller then renders the page. Outside debug mode, path
/// errors become a generic JSON error.
pub fn perform_dispatch(
    tree: &Arc<BoundTree>,
    request: &Request,
    settings: &Settings,
) -> Result<Option<Response>> {
    let commands = request.dispatch_commands();
    if commands.len() > 1 {
        return Err(DispatchError::MultipleCommands {
            commands: commands.iter().map(|(k, _)| (*k).to_owned()).collect(),
        });
    }
    let Some(&(path, value)) = commands.first() else {
        if request.method() == Method::Post {
            return Err(DispatchError::PostWithoutCommand);
        }
        return Ok(None);
    };

    let (result, generic_error) = match request.method() {
        Method::Get => (perform_ajax_dispatch(tree, path, value), "Invalid endpoint path"),
        Method::Post => (perform_post_dispatch(tree, path, value), "Invalid post path"),
    };
    match result {
        Ok(value) => dispatch_response(value, request),
        Err(err) if err.is_invalid_path() && !settings.debug => {
            warn!(path, error = %err, "invalid dispatch path");
            Ok(Some(Response::json(&json!({ "error": generic_error }))?))
        }
        Err(err) => Err(err),
    }
}

/// Turn a handler result into a response.
pub fn dispatch_response(value: Value, request: &Request) -> Result<Option<Response>> {
    if value.is_null() {
        return Ok(None);
    }
    if let Some(response) = value.downcast_ref::<Response>() {
        return Ok(Some(response.clone()));
    }
    if let Some(declared) = value.downcast_ref::<Declared>() {
        return match BoundTree::bind(declared, request)? {
            Some(tree) => Ok(Some(Response::html(render_root(&tree)?))),
            None => Ok(None),
        };
    }
    Ok(Some(Response::json(&value)?))
}

/// Bind `declared` for `request`, answer its dispatch command or render it.
pub fn render_to_response(
    declared: &Declared,
    request: &Request,
    settings: &Settings,
) -> Result<Response> {
    let Some(tree) = BoundTree::bind(declared, request)? else {
        return Ok(Response::html(String::new()));
    };
    let tree = Arc::new(tree);
    if let Some(response) = perform_dispatch(&tree, request, settings)? {
        return Ok(response);
    }
    Ok(Response::html(render_root(&tree)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parts::{endpoint, form, fragment, page};
    use understory_declarative::StyleRegistry;
    use understory_namespace::{Signature, namespace};

    fn echo() -> Callable {
        Callable::new("echo", Signature::new().required(["value"]), |args| {
            Ok(args.get("value").cloned().unwrap_or_default())
        })
    }

    fn bind(declared: &Declared, request: &Request) -> Arc<BoundTree> {
        Arc::new(
            BoundTree::bind_with_styles(declared, request, &StyleRegistry::new())
                .unwrap()
                .unwrap(),
        )
    }

    fn nested() -> Declared {
        page()
            .declare(&namespace! {
                parts__foo__children__bar__tag = "span",
                parts__foo__children__bar__endpoints__echo__func = echo(),
                endpoints__echo__func = echo(),
            })
            .unwrap()
    }

    #[test]
    fn find_target_by_short_and_long_path() {
        let tree = bind(&nested(), &Request::get(Vec::<(String, String)>::new()));
        let root = tree.root();
        let foo = tree.member(root, "parts", "foo").unwrap();
        let bar = tree.member(foo, "children", "bar").unwrap();

        let target = find_target(&tree, "/bar").unwrap();
        assert_eq!(target.node, bar);
        assert_eq!(target.ancestors, vec![root, foo]);
        assert_eq!(tree.long_path(bar).unwrap(), "parts/foo/children/bar");
        assert_eq!(
            tree.path_index().unwrap().long_path(&tree.path(bar).unwrap()),
            Some("parts/foo/children/bar")
        );

        let by_long = find_target(&tree, "/parts/foo/children/bar").unwrap();
        assert_eq!(by_long.node, bar);
        assert_eq!(find_target(&tree, "/").unwrap().node, root);
    }

    #[test]
    fn invalid_path_lists_alternatives() {
        let tree = bind(&nested(), &Request::get(Vec::<(String, String)>::new()));
        let err = find_target(&tree, "/nope").unwrap_err();
        let DispatchError::InvalidEndpointPath { short, long, .. } = &err else {
            panic!("unexpected error {err}");
        };
        assert!(short.contains(&"bar".to_owned()));
        assert!(long.contains(&"parts/foo/children/bar".to_owned()));
        let mut sorted = short.clone();
        sorted.sort();
        assert_eq!(&sorted, short);
        assert!(err.to_string().contains("Short alternatives"));
    }

    #[test]
    fn endpoints_yield_short_names_to_parts() {
        let tree = bind(&nested(), &Request::get(Vec::<(String, String)>::new()));
        let root = tree.root();
        let echo = tree.member(root, "endpoints", "echo").unwrap();
        let nested_echo = tree
            .member(tree.member(tree.member(root, "parts", "foo").unwrap(), "children", "bar").unwrap(), "endpoints", "echo")
            .unwrap();
        assert_eq!(tree.endpoint_path(nested_echo).unwrap(), "/echo");
        assert_eq!(tree.endpoint_path(echo).unwrap(), "/endpoints/echo");
    }

    #[test]
    fn ajax_dispatch_answers_json() {
        let request = Request::get([("/endpoints/echo", "hello")]);
        let response = render_to_response(&nested(), &request, &Settings::default()).unwrap();
        assert_eq!(response.json_body().unwrap(), json!("hello"));
    }

    #[test]
    fn two_commands_are_rejected() {
        let request = Request::get([("/echo", "1"), ("/bar", "2")]);
        let tree = bind(&nested(), &request);
        let err = perform_dispatch(&tree, &request, &Settings::default()).unwrap_err();
        assert!(matches!(err, DispatchError::MultipleCommands { ref commands } if commands.len() == 2));
    }

    #[test]
    fn invalid_path_is_generic_outside_debug() {
        let request = Request::get([("/nope", "")]);
        let tree = bind(&nested(), &request);
        let response = perform_dispatch(&tree, &request, &Settings::default())
            .unwrap()
            .unwrap();
        assert_eq!(response.json_body().unwrap(), json!({ "error": "Invalid endpoint path" }));

        let debug = Settings {
            debug: true,
            ..Settings::default()
        };
        assert!(matches!(
            perform_dispatch(&tree, &request, &debug),
            Err(DispatchError::InvalidEndpointPath { .. })
        ));
    }

    #[test]
    fn non_endpoint_target_is_rejected() {
        let request = Request::get([("/bar", "")]);
        let tree = bind(&nested(), &request);
        assert!(matches!(
            perform_ajax_dispatch(&tree, "/bar", ""),
            Err(DispatchError::NotAnEndpoint { .. })
        ));
        let response = perform_dispatch(&tree, &request, &Settings::default())
            .unwrap()
            .unwrap();
        assert_eq!(response.json_body().unwrap(), json!({ "error": "Invalid endpoint path" }));
    }

    #[test]
    fn post_requires_command_and_handler() {
        let declared = form()
            .declare(&namespace! { fields__name = Namespace::new() })
            .unwrap();
        let request = Request::post([("name", "x")]);
        let tree = bind(&declared, &request);
        assert!(matches!(
            perform_dispatch(&tree, &request, &Settings::default()),
            Err(DispatchError::PostWithoutCommand)
        ));

        let err = perform_post_dispatch(&tree, "-name", "").unwrap_err();
        match &err {
            DispatchError::MissingPostHandler { path, parents, .. } => {
                assert_eq!(path, "/name");
                assert_eq!(parents, &["<Form root>".to_owned()]);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn missing_post_handler_is_generic_outside_debug() {
        let declared = form()
            .declare(&namespace! { fields__name = Namespace::new() })
            .unwrap();
        let request = Request::post([("-name", "x")]);
        let response = render_to_response(&declared, &request, &Settings::default()).unwrap();
        assert_eq!(response.json_body().unwrap(), json!({ "error": "Invalid post path" }));
        assert!(!response.body().contains("Parents"), "{}", response.body());

        let debug = Settings {
            debug: true,
            ..Settings::default()
        };
        let err = render_to_response(&declared, &request, &debug).unwrap_err();
        assert!(matches!(err, DispatchError::MissingPostHandler { .. }));
        assert!(err.to_string().contains("<Form root>"), "{err}");
    }

    #[test]
    fn post_handler_sees_bound_form() {
        let save = Callable::new("save", Signature::new().required(["tree", "form"]), |args| {
            let tree = tree_of(args).ok_or("no tree")?;
            let form = args
                .get("form")
                .and_then(|f| f.downcast_ref::<NodeId>())
                .ok_or("no form")?;
            let name = tree.member(*form, "fields", "name").ok_or("no field")?;
            Ok(tree.attribute(name, "value").cloned().unwrap_or_default())
        });
        let declared = form()
            .declare(&namespace! {
                fields__name = Namespace::new(),
                actions__submit__post_handler = save,
            })
            .unwrap();
        let request = Request::post([("name", "Ada"), ("-submit", "")]);
        let response = render_to_response(&declared, &request, &Settings::default()).unwrap();
        assert_eq!(response.json_body().unwrap(), json!("Ada"));
    }

    #[test]
    fn handler_results_become_responses() {
        let request = Request::get(Vec::<(String, String)>::new());
        assert_eq!(dispatch_response(Value::Null, &request).unwrap(), None);

        let passthrough = Response::new(204, "text/plain", "");
        assert_eq!(
            dispatch_response(Value::object(passthrough.clone()), &request).unwrap(),
            Some(passthrough)
        );

        let part = fragment()
            .declare(&namespace! { tag = "p", text = "hi" })
            .unwrap();
        let rendered = dispatch_response(Value::from(part), &request).unwrap().unwrap();
        assert!(rendered.body().contains("<p>hi</p>"));

        let json = dispatch_response(Value::Int(3), &request).unwrap().unwrap();
        assert_eq!(json.json_body().unwrap(), json!(3));
        assert!(dispatch_response(Value::Callable(echo()), &request).is_err());
    }

    #[test]
    fn endpoint_context_includes_endpoint_and_root() {
        let inspect = Callable::new(
            "inspect",
            Signature::new().required(["endpoint", "root", "value"]),
            |args| Ok(args.get("value").cloned().unwrap_or_default()),
        );
        let declared = endpoint_host(inspect);
        let request = Request::get([("/inspect", "ok")]);
        let response = render_to_response(&declared, &request, &Settings::default()).unwrap();
        assert_eq!(response.json_body().unwrap(), json!("ok"));
    }

    fn endpoint_host(func: Callable) -> Declared {
        let inspect = endpoint().declare(&namespace! { func = func }).unwrap();
        fragment()
            .declare(&namespace! { endpoints__inspect = inspect })
            .unwrap()
    }
}
