// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Built-in component classes.
//!
//! Every class here derives from [`part`], which carries the attributes
//! shared by renderable components and the `endpoints` collection used for
//! AJAX dispatch. Subclass them with [`Class::subclass`] to add behavior.
//!
//! | Class | Adds | Contributes |
//! |-------|------|-------------|
//! | [`part`] | `after`, `extra`, `extra_evaluated`, `attrs`, `title`, `endpoints` | |
//! | [`endpoint`] | `func` | `endpoint` |
//! | [`fragment`] | `tag`, `text`, `children` | `fragment` |
//! | [`page`] | `parts` | `page` |
//! | [`form`] | `tag`, `fields`, `actions`, `post_handler` | `form` |
//! | [`field`] | `initial`, `value`, `required` | `field` |
//! | [`action`] | `post_handler`, `display_name` | |

use std::sync::LazyLock;

use understory_declarative::{
    BoundTree, Class, CollectionFlags, Declared, MemberSpec, NodeId, Result, escape_html,
    render_attrs,
};
use understory_namespace::{Namespace, Value, namespace};

use crate::request::{Method, request_of};

static PART: LazyLock<Class> = LazyLock::new(|| {
    Class::builder("Part")
        .refinable("after")
        .refinable("extra")
        .refinable("extra_evaluated")
        .refinable("attrs")
        .evaluated("title")
        .members(
            "endpoints",
            MemberSpec::lazy(endpoint).with_flags(CollectionFlags::VISIT_LAST),
        )
        .build()
});

static ENDPOINT: LazyLock<Class> = LazyLock::new(|| {
    Class::builder("Endpoint")
        .refinable("func")
        .evaluate_parameters(|_, id| namespace! { endpoint = Value::object(id) })
        .on_bind(|tree, id| match tree.attribute(id, "func") {
            Some(Value::Callable(_)) => Ok(()),
            other => Err(understory_namespace::Error::NotCallable {
                found: format!(
                    "{} in func of endpoint {}",
                    other.map_or("nothing", Value::type_name),
                    tree.dunder_path(id).unwrap_or_default()
                ),
            }
            .into()),
        })
        .render(|_, _| Ok(String::new()))
        .build()
});

static FRAGMENT: LazyLock<Class> = LazyLock::new(|| {
    PART.subclass("Fragment")
        .evaluated("tag")
        .evaluated("text")
        .members(
            "children",
            MemberSpec::lazy(fragment).with_flags(CollectionFlags::FALL_THROUGH),
        )
        .evaluate_parameters(|_, id| namespace! { fragment = Value::object(id) })
        .build()
});

static PAGE: LazyLock<Class> = LazyLock::new(|| {
    PART.subclass("Page")
        .members(
            "parts",
            MemberSpec::lazy(fragment).with_flags(CollectionFlags::FALL_THROUGH),
        )
        .evaluate_parameters(|_, id| namespace! { page = Value::object(id) })
        .build()
});

static FORM: LazyLock<Class> = LazyLock::new(|| {
    PART.subclass("Form")
        .evaluated("tag")
        .default("tag", "form")
        .default("attrs__method", "post")
        .members("fields", MemberSpec::lazy(field))
        .members("actions", MemberSpec::lazy(action))
        .refinable("post_handler")
        .evaluate_parameters(|_, id| namespace! { form = Value::object(id) })
        .build()
});

static FIELD: LazyLock<Class> = LazyLock::new(|| {
    PART.subclass("Field")
        .evaluated("initial")
        .evaluated("value")
        .evaluated("required")
        .default("required", false)
        .shortcut(
            "integer",
            namespace! { attrs__type = "number", extra__kind = "integer" },
        )
        .shortcut(
            "boolean",
            namespace! { attrs__type = "checkbox", extra__kind = "boolean" },
        )
        .evaluate_parameters(|_, id| namespace! { field = Value::object(id) })
        .on_bind(read_posted_value)
        .render(render_field)
        .build()
});

static ACTION: LazyLock<Class> = LazyLock::new(|| {
    PART.subclass("Action")
        .refinable("post_handler")
        .evaluated("display_name")
        .render(render_action)
        .build()
});

/// Base of all built-in renderable components.
pub fn part() -> Class {
    PART.clone()
}

/// An AJAX endpoint: `func` is called with the dispatch value.
pub fn endpoint() -> Class {
    ENDPOINT.clone()
}

/// A markup element with optional text and children.
pub fn fragment() -> Class {
    FRAGMENT.clone()
}

/// A document made of parts.
pub fn page() -> Class {
    PAGE.clone()
}

/// A form: fields, actions, and a POST handler.
pub fn form() -> Class {
    FORM.clone()
}

/// A form field.
pub fn field() -> Class {
    FIELD.clone()
}

/// A form action, rendered as a submit button.
pub fn action() -> Class {
    ACTION.clone()
}

/// Declare a fragment for `tag`, configured by `config`.
pub fn html(tag: &str, config: &Namespace) -> Result<Declared> {
    fragment().declare(&namespace! { tag = tag }.merged(config))
}

fn field_kind(tree: &BoundTree, id: NodeId) -> Option<&str> {
    tree.attribute(id, "extra")?.as_namespace()?.get("kind")?.as_str()
}

/// Take the submitted value of a field from a POSTed request.
fn read_posted_value(tree: &mut BoundTree, id: NodeId) -> Result<()> {
    let Some(request) = request_of(tree.request_parameters()) else {
        return Ok(());
    };
    if request.method() != Method::Post {
        return Ok(());
    }
    let path = tree.path(id)?;
    let raw = request.value(&path).map(str::to_owned);
    let value = match (field_kind(tree, id), raw) {
        (Some("boolean"), raw) => Value::Bool(
            raw.is_some_and(|r| matches!(r.to_ascii_lowercase().as_str(), "on" | "true" | "1")),
        ),
        (_, None) => return Ok(()),
        (Some("integer"), Some(raw)) => raw
            .trim()
            .parse::<i64>()
            .map_or(Value::Str(raw), Value::Int),
        (_, Some(raw)) => Value::Str(raw),
    };
    tree.set_attribute(id, "value", value);
    Ok(())
}

fn render_field(tree: &BoundTree, id: NodeId) -> Result<String> {
    let name = tree.path(id)?;
    let mut attrs = tree.attrs(id).cloned().unwrap_or_default();
    attrs.insert("name", name.as_str());
    let value = match tree.attribute(id, "value") {
        Some(Value::Null) | None => tree.attribute(id, "initial").cloned().unwrap_or_default(),
        Some(value) => value.clone(),
    };
    match (field_kind(tree, id), value) {
        (_, Value::Null) => {}
        (Some("boolean"), value) => {
            attrs.insert("checked", value.is_truthy());
        }
        (_, value) => {
            attrs.insert("value", value);
        }
    }
    if tree.attribute(id, "required").is_some_and(Value::is_truthy) {
        attrs.insert("required", true);
    }
    let label = match tree.attribute(id, "title").and_then(Value::as_str) {
        Some(title) => format!("<label for=\"{name}\">{}</label>", escape_html(title)),
        None => String::new(),
    };
    Ok(format!("{label}<input{}>", render_attrs(&attrs)?))
}

fn render_action(tree: &BoundTree, id: NodeId) -> Result<String> {
    let mut attrs = tree.attrs(id).cloned().unwrap_or_default();
    attrs.insert("name", format!("-{}", tree.path(id)?));
    let label = match tree.attribute(id, "display_name").and_then(Value::as_str) {
        Some(label) => label.to_owned(),
        None => tree.name(id).unwrap_or_default().to_owned(),
    };
    Ok(format!(
        "<button{}>{}</button>",
        render_attrs(&attrs)?,
        escape_html(&label)
    ))
}

/// Title of a part: its own `title`, else the first title among its `parts`.
pub fn title(tree: &BoundTree, id: NodeId) -> Option<String> {
    if let Some(title) = tree.attribute(id, "title").and_then(Value::as_str) {
        return Some(title.to_owned());
    }
    let parts = tree.child(id, "parts")?;
    tree.children(parts).find_map(|(name, _)| {
        let child = tree.child(parts, name)?;
        title(tree, child)
    })
}

/// Render the root of `tree` as a complete document.
pub fn render_root(tree: &BoundTree) -> Result<String> {
    let root = tree.root();
    let content = tree.render(root)?;
    let title = title(tree, root).map(|t| escape_html(&t)).unwrap_or_default();
    Ok(format!(
        "<!DOCTYPE html>\n<html>\n    <head>\n        <title>{title}</title>\n    </head>\n    <body>\n{content}\n    </body>\n</html>\n"
    ))
}
