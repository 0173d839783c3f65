// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rendering bound trees to markup.

use understory_namespace::Value;

use crate::attrs::render_attrs;
use crate::error::Result;
use crate::tree::{BoundTree, Child, NodeKind};
use crate::types::NodeId;

/// Escape text for inclusion in markup.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Str(s) => escape_html(s),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        other => escape_html(&format!("{other:?}")),
    }
}

impl BoundTree {
    /// Render a node.
    ///
    /// Uses the class's render hook if it has one. Otherwise a node with a
    /// `tag` renders as `<tag attrs>text children</tag>` and a node without
    /// one as its text followed by its children.
    pub fn render(&self, id: NodeId) -> Result<String> {
        if let Some(hook) = self.class(id).and_then(|c| c.render_hook()) {
            return hook(self, id);
        }
        let text = self.attribute(id, "text").map(render_value).unwrap_or_default();
        let children = self.render_children(id)?;
        match self.attribute(id, "tag").and_then(Value::as_str) {
            Some(tag) => {
                let attrs = match self.attrs(id) {
                    Some(attrs) => render_attrs(attrs)?,
                    None => String::new(),
                };
                Ok(format!("<{tag}{attrs}>{text}{children}</{tag}>"))
            }
            None => Ok(format!("{text}{children}")),
        }
    }

    /// Render every member of every collection of a node, in order.
    pub fn render_children(&self, id: NodeId) -> Result<String> {
        let mut out = String::new();
        for (_, child) in self.children(id) {
            let Child::Node(wrapper) = child else {
                continue;
            };
            if !matches!(self.kind(*wrapper), Some(NodeKind::Members(_))) {
                out.push_str(&self.render(*wrapper)?);
                continue;
            }
            out.push_str(&self.render_members(*wrapper)?);
        }
        Ok(out)
    }

    fn render_members(&self, wrapper: NodeId) -> Result<String> {
        let mut out = String::new();
        for (_, member) in self.children(wrapper) {
            match member {
                Child::Node(node) => out.push_str(&self.render(*node)?),
                Child::Value(value) => out.push_str(&render_value(value)),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use crate::class::{Class, MemberSpec};
    use crate::style::StyleRegistry;
    use crate::tree::BoundTree;
    use crate::types::CollectionFlags;
    use understory_namespace::{Namespace, Value, namespace};

    fn fragment() -> Class {
        Class::builder("Fragment")
            .evaluated("tag")
            .evaluated("text")
            .refinable("attrs")
            .members(
                "children",
                MemberSpec::lazy(fragment).with_flags(CollectionFlags::FALL_THROUGH),
            )
            .build()
    }

    fn bind(config: &Namespace) -> BoundTree {
        let declared = fragment().declare(config).unwrap();
        BoundTree::bind_with_styles(&declared, &Namespace::new(), &StyleRegistry::new())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn renders_tag_attrs_text_and_children() {
        let tree = bind(&namespace! {
            tag = "div",
            attrs__class__box = true,
            children__greeting = "hi & bye",
            children__inner__tag = "span",
            children__inner__text = "<b>",
        });
        assert_eq!(
            tree.render(tree.root()).unwrap(),
            "<div class=\"box\">hi &amp; bye<span>&lt;b&gt;</span></div>"
        );
    }

    #[test]
    fn tagless_renders_contents() {
        let tree = bind(&namespace! { text = "a", children__b = "b" });
        assert_eq!(tree.render(tree.root()).unwrap(), "ab");
    }

    #[test]
    fn render_hook_replaces_default() {
        let shouty = fragment()
            .subclass("Shouty")
            .render(|tree, id| {
                let text = tree.attribute(id, "text").and_then(Value::as_str).unwrap_or("");
                Ok(text.to_uppercase())
            })
            .build();
        let declared = shouty.declare(&namespace! { text = "hey" }).unwrap();
        let tree = BoundTree::bind_with_styles(&declared, &Namespace::new(), &StyleRegistry::new())
            .unwrap()
            .unwrap();
        assert_eq!(tree.render(tree.root()).unwrap(), "HEY");
    }
}
