// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! HTML-style attributes: evaluation and rendering.

use understory_namespace::{Namespace, Value, evaluate};

use crate::error::{Error, Result};

/// Evaluate an `attrs` namespace against `context`.
///
/// `class` and `style` are namespaces evaluated entry by entry; every other
/// key is evaluated as a whole. Empty `class` and `style` are dropped.
pub fn evaluate_attrs(attrs: &Namespace, context: &Namespace) -> Result<Namespace> {
    let mut out = Namespace::new();
    for special in ["class", "style"] {
        let Some(Value::Namespace(entries)) = attrs.get(special) else {
            continue;
        };
        let mut evaluated = Namespace::new();
        for (key, value) in entries.iter() {
            evaluated.insert(key, evaluate(value, context)?);
        }
        if !evaluated.is_empty() {
            out.insert(special, evaluated);
        }
    }
    for (key, value) in attrs.iter() {
        if matches!(key, "class" | "style") && matches!(value, Value::Namespace(_)) {
            continue;
        }
        out.insert(key, evaluate(value, context)?);
    }
    Ok(out)
}

/// Render attributes as ` key="value"` pairs sorted by key.
///
/// Returns the empty string when nothing needs rendering. `true` renders a
/// bare key and `null` is skipped. Only `class` and `style` may be
/// namespaces: `class` renders its truthy names and `style` its
/// `key: value` pairs, both sorted.
pub fn render_attrs(attrs: &Namespace) -> Result<String> {
    let mut items: Vec<(&str, &Value)> = attrs.iter().collect();
    items.sort_by(|a, b| a.0.cmp(b.0));
    let mut parts = Vec::new();
    for (key, value) in items {
        let rendered = match value {
            Value::Null | Value::Bool(false) => continue,
            Value::Bool(true) => {
                parts.push(key.to_owned());
                continue;
            }
            Value::Namespace(ns) if key == "class" => render_class(ns),
            Value::Namespace(ns) if key == "style" => render_style(ns),
            Value::Namespace(ns) => {
                return Err(Error::InvalidAttrs {
                    message: format!("Only the class and style attributes can be dicts, you sent {ns}"),
                });
            }
            Value::List(_) => {
                return Err(Error::InvalidAttrs {
                    message: format!("Attributes can't be of type list, you sent {value:?}"),
                });
            }
            Value::Callable(_) | Value::Class(_) => {
                return Err(Error::InvalidAttrs {
                    message: format!("Attributes can't be callable, you sent {value:?} for key {key}"),
                });
            }
            Value::Str(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Object(_) | Value::Marker(_) => {
                return Err(Error::InvalidAttrs {
                    message: format!("Attributes can't be of type {}, you sent {value:?}", value.type_name()),
                });
            }
        };
        if rendered.is_empty() && matches!(key, "class" | "style") {
            continue;
        }
        parts.push(format!("{key}=\"{}\"", rendered.replace('"', "&quot;")));
    }
    if parts.is_empty() {
        return Ok(String::new());
    }
    Ok(format!(" {}", parts.join(" ")))
}

fn render_class(class: &Namespace) -> String {
    let mut names: Vec<&str> = class
        .iter()
        .filter(|(_, flag)| flag.is_truthy())
        .map(|(name, _)| name)
        .collect();
    names.sort_unstable();
    names.join(" ")
}

fn render_style(style: &Namespace) -> String {
    let mut pairs: Vec<String> = style
        .iter()
        .filter(|(_, v)| v.is_truthy())
        .map(|(k, v)| match v {
            Value::Str(s) => format!("{k}: {s}"),
            other => format!("{k}: {other:?}"),
        })
        .collect();
    pairs.sort();
    pairs.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use understory_namespace::{Callable, Signature, namespace};

    #[test]
    fn renders_sorted_attributes() {
        let attrs = namespace! {
            id = "x",
            class__b = true,
            class__a = true,
            class__off = false,
            style__color = "red",
            style__width = "1px",
            disabled = true,
            hidden = Value::Null,
        };
        assert_eq!(
            render_attrs(&attrs).unwrap(),
            " class=\"a b\" disabled id=\"x\" style=\"color: red; width: 1px\""
        );
    }

    #[test]
    fn empty_renders_nothing() {
        assert_eq!(render_attrs(&Namespace::new()).unwrap(), "");
        assert_eq!(render_attrs(&namespace! { class__a = false }).unwrap(), "");
    }

    #[test]
    fn quotes_are_escaped() {
        assert_eq!(
            render_attrs(&namespace! { title = "say \"hi\"" }).unwrap(),
            " title=\"say &quot;hi&quot;\""
        );
    }

    #[test]
    fn rejects_nested_and_callable_values() {
        assert!(render_attrs(&namespace! { data__x = 1 }).is_err());
        let f = Callable::constant("f", 1);
        assert!(render_attrs(&namespace! { onclick = f }).is_err());
        assert!(render_attrs(&namespace! { items = vec![Value::Int(1)] }).is_err());
    }

    #[test]
    fn evaluates_class_and_style_entry_by_entry() {
        let active = Callable::new("active", Signature::new().required(["row"]), |args| {
            Ok(Value::Bool(args.get("row").and_then(Value::as_i64) == Some(1)))
        });
        let attrs = namespace! {
            class__active = active,
            class__static = true,
            style = Namespace::new(),
            id = Callable::constant("id", "cell"),
        };
        let out = evaluate_attrs(&attrs, &namespace! { row = 1 }).unwrap();
        assert_eq!(out, namespace! { class__active = true, class__static = true, id = "cell" });
        assert!(out.get("style").is_none());
    }
}
