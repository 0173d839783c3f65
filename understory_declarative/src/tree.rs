// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bound trees: binding declared templates to a request.
//!
//! [`BoundTree::bind`] walks a finished [`Declared`] template and allocates
//! one [`NodeId`] per included component, plus one unnamed-in-short-paths
//! wrapper node per member collection. The template is never modified, so
//! the same template can be bound for every request.
//!
//! ## Bind order
//!
//! For each component:
//!
//! 1. The evaluation context is the parent's context extended with the
//!    parameters the class contributes. At the root it starts from the
//!    request parameters.
//! 2. `include` is evaluated first. A falsy value drops the node before
//!    anything else happens.
//! 3. Member collections are bound, depth first, in collection order.
//! 4. `on_bind` hooks run (base class hooks first). A hook may set
//!    `include` to false; the node and its subtree are then dropped.
//! 5. The remaining evaluated attributes are resolved. One that is still a
//!    callable afterwards is an error.
//! 6. `attrs` and `extra_evaluated` are evaluated.

use core::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use tracing::{debug, trace};
use understory_namespace::{Namespace, Value, evaluate_entries, evaluate_lenient};

use crate::attrs::evaluate_attrs;
use crate::class::{Class, RefinableKind};
use crate::declared::{Declared, MemberEntry};
use crate::error::{Error, Result};
use crate::path::{PathIndex, SEPARATOR};
use crate::style::{StyleRegistry, registry};
use crate::types::{CollectionFlags, NodeId};

/// Source of the evaluation parameters seeded at the root of a bound tree.
///
/// Implemented by transport request types; the returned namespace usually
/// carries the request itself, the current user, and view parameters.
pub trait RequestParameters {
    /// Parameters made available to every evaluated attribute in the tree.
    fn evaluate_parameters(&self) -> Namespace;
}

impl RequestParameters for Namespace {
    fn evaluate_parameters(&self) -> Namespace {
        self.clone()
    }
}

/// What a bound node stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// A bound component.
    Component,
    /// The wrapper holding one member collection of its parent.
    Members(CollectionFlags),
}

/// A child of a bound node.
#[derive(Clone, Debug, PartialEq)]
pub enum Child {
    /// A bound node.
    Node(NodeId),
    /// A plain value kept by a fall-through collection.
    Value(Value),
}

#[derive(Clone, Debug)]
struct BoundNode {
    generation: u32,
    name: String,
    kind: NodeKind,
    declared: Option<Declared>,
    parent: Option<NodeId>,
    children: IndexMap<String, Child>,
    attributes: IndexMap<String, Value>,
    attrs: Namespace,
    evaluate_parameters: Namespace,
}

/// Style registry a tree finishes late-bound templates against.
#[derive(Clone, Debug)]
enum Styles {
    Process,
    Custom(Arc<StyleRegistry>),
}

impl Styles {
    fn registry(&self) -> &StyleRegistry {
        match self {
            Self::Process => registry(),
            Self::Custom(styles) => styles,
        }
    }
}

/// A request-bound component tree.
pub struct BoundTree {
    nodes: Vec<Option<BoundNode>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
    root: NodeId,
    root_declared: Declared,
    request_parameters: Namespace,
    styles: Styles,
    path_index: OnceLock<PathIndex>,
}

impl fmt::Debug for BoundTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        f.debug_struct("BoundTree")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &self.free_list.len())
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl BoundTree {
    /// Bind `declared` as a root, using the process-wide style registry.
    ///
    /// Returns `Ok(None)` when the root itself is excluded.
    pub fn bind(declared: &Declared, request: &dyn RequestParameters) -> Result<Option<Self>> {
        Self::bind_root(declared, request, Styles::Process)
    }

    /// Bind `declared` as a root, finishing it against `styles` if needed.
    ///
    /// Templates later attached with [`BoundTree::bind_child`] are finished
    /// against the same registry.
    pub fn bind_with_styles(
        declared: &Declared,
        request: &dyn RequestParameters,
        styles: &StyleRegistry,
    ) -> Result<Option<Self>> {
        Self::bind_root(declared, request, Styles::Custom(Arc::new(styles.clone())))
    }

    fn bind_root(
        declared: &Declared,
        request: &dyn RequestParameters,
        styles: Styles,
    ) -> Result<Option<Self>> {
        let declared = if declared.is_refine_done() {
            declared.clone()
        } else {
            declared.refine_done(None, styles.registry())?
        };
        let name = declared.name().unwrap_or("root").to_owned();
        let request_parameters = request.evaluate_parameters();

        let mut tree = Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            root: NodeId::new(0, 0),
            root_declared: declared.clone(),
            request_parameters: request_parameters.clone(),
            styles,
            path_index: OnceLock::new(),
        };
        let Some(root) = tree.bind_node(&declared, None, &name, &request_parameters)? else {
            debug!(class = declared.class().name(), "root excluded");
            return Ok(None);
        };
        tree.root = root;
        debug!(
            class = declared.class().name(),
            nodes = tree.node_count(),
            "bound root"
        );
        Ok(Some(tree))
    }

    /// Bind another template under a live node.
    ///
    /// The new node does not get a short path: the path index reflects the
    /// declared structure of the root.
    pub fn bind_child(
        &mut self,
        parent: NodeId,
        name: &str,
        declared: &Declared,
    ) -> Result<Option<NodeId>> {
        let Some(parent_node) = self.node(parent) else {
            return Err(Error::ParentNotBound {
                parent: format!("{parent:?}"),
            });
        };
        let context = parent_node.evaluate_parameters.clone();
        let declared = if declared.is_refine_done() {
            declared.clone()
        } else {
            let style = parent_node.declared.as_ref().and_then(Declared::style);
            declared.refine_done(style, self.styles.registry())?
        };
        let id = self.bind_node(&declared, Some(parent), name, &context)?;
        if let (Some(id), Some(parent)) = (id, self.node_mut(parent)) {
            parent.children.insert(name.to_owned(), Child::Node(id));
        }
        Ok(id)
    }

    fn bind_node(
        &mut self,
        declared: &Declared,
        parent: Option<NodeId>,
        name: &str,
        inherited: &Namespace,
    ) -> Result<Option<NodeId>> {
        let class = declared.class().clone();
        let id = self.alloc(BoundNode {
            generation: 0,
            name: name.to_owned(),
            kind: NodeKind::Component,
            declared: Some(declared.clone()),
            parent,
            children: IndexMap::new(),
            attributes: declared
                .attributes()
                .map(|(k, v)| (k.to_owned(), v.clone()))
                .collect(),
            attrs: Namespace::new(),
            evaluate_parameters: inherited.clone(),
        });
        if parent.is_none() {
            self.root = id;
        }

        let mut context = inherited.clone();
        for hook in class.evaluate_parameter_hooks() {
            for (key, value) in hook(self, id).iter() {
                context.insert(key, value.clone());
            }
        }
        if let Some(node) = self.node_mut(id) {
            node.evaluate_parameters = context.clone();
        }

        if !self.evaluate_include(id, &context)? {
            trace!(name, class = class.name(), "excluded");
            self.remove(id);
            return Ok(None);
        }

        for (collection_name, collection) in declared.collections() {
            let members = self.alloc(BoundNode {
                generation: 0,
                name: collection_name.to_owned(),
                kind: NodeKind::Members(collection.flags()),
                declared: None,
                parent: Some(id),
                children: IndexMap::new(),
                attributes: IndexMap::new(),
                attrs: Namespace::new(),
                evaluate_parameters: context.clone(),
            });
            for (member_name, entry) in collection.entries() {
                let child = match entry {
                    MemberEntry::Node(member) => self
                        .bind_node(member, Some(members), member_name, &context)?
                        .map(Child::Node),
                    MemberEntry::Value(value) => Some(Child::Value(value.clone())),
                };
                if let (Some(child), Some(node)) = (child, self.node_mut(members)) {
                    node.children.insert(member_name.to_owned(), child);
                }
            }
            if let Some(node) = self.node_mut(id) {
                node.children
                    .insert(collection_name.to_owned(), Child::Node(members));
            }
        }

        for hook in class.on_bind_hooks() {
            hook(self, id)?;
        }
        if !self.evaluate_include(id, &context)? {
            trace!(name, class = class.name(), "excluded by on_bind");
            self.remove(id);
            return Ok(None);
        }

        self.evaluate_attributes(id, &class, &context)?;
        trace!(name, class = class.name(), "bound");
        Ok(Some(id))
    }

    fn evaluate_include(&mut self, id: NodeId, context: &Namespace) -> Result<bool> {
        let Some(raw) = self.attribute(id, "include").cloned() else {
            return Ok(true);
        };
        let include = self.resolve(id, "include", &raw, context)?;
        let included = include.is_truthy();
        self.set_attribute(id, "include", include);
        Ok(included)
    }

    fn resolve(&self, id: NodeId, attribute: &str, raw: &Value, context: &Namespace) -> Result<Value> {
        let value = evaluate_lenient(raw, context)?;
        if let Value::Callable(callable) = &value {
            return Err(Error::StillCallable {
                attribute: attribute.to_owned(),
                path: self.dunder_path(id).unwrap_or_default(),
                available: context.keys().map(str::to_owned).collect(),
                parameters: callable.signature().parameter_names(),
            });
        }
        Ok(value)
    }

    fn evaluate_attributes(&mut self, id: NodeId, class: &Class, context: &Namespace) -> Result<()> {
        for (name, kind) in class.refinables() {
            if !matches!(kind, RefinableKind::Evaluated) || name == "include" {
                continue;
            }
            let Some(raw) = self.attribute(id, name).cloned() else {
                continue;
            };
            let value = self.resolve(id, name, &raw, context)?;
            self.set_attribute(id, name, value);
        }

        if class.refinable("attrs").is_some() {
            let attrs = match self.attribute(id, "attrs") {
                Some(Value::Namespace(attrs)) => evaluate_attrs(attrs, context)?,
                Some(Value::Null) | None => Namespace::new(),
                Some(other) => {
                    return Err(Error::InvalidAttrs {
                        message: format!("attrs must be a namespace, got {other:?}"),
                    });
                }
            };
            if let Some(node) = self.node_mut(id) {
                node.attrs = attrs;
            }
        }

        if class.refinable("extra_evaluated").is_some() {
            let evaluated = match self.attribute(id, "extra_evaluated") {
                Some(Value::Namespace(extra)) => evaluate_entries(extra, context)?,
                _ => Namespace::new(),
            };
            self.set_attribute(id, "extra_evaluated", evaluated);
        }
        Ok(())
    }

    fn alloc(&mut self, mut node: BoundNode) -> NodeId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            node.generation = generation;
            self.nodes[idx] = Some(node);
            (idx, generation)
        } else {
            let generation = 1_u32;
            node.generation = generation;
            self.nodes.push(Some(node));
            self.generations.push(generation);
            (self.nodes.len() - 1, generation)
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "NodeId uses 32-bit indices by design."
        )]
        let idx = idx as u32;
        NodeId::new(idx, generation)
    }

    /// Drop a node and its subtree; their ids become stale.
    fn remove(&mut self, id: NodeId) {
        let Some(node) = self.node(id) else {
            return;
        };
        let parent = node.parent;
        let children: Vec<NodeId> = node
            .children
            .values()
            .filter_map(|c| match c {
                Child::Node(id) => Some(*id),
                Child::Value(_) => None,
            })
            .collect();
        for child in children {
            self.remove(child);
        }
        if let Some(parent) = parent.and_then(|p| self.node_mut(p)) {
            parent.children.retain(|_, c| *c != Child::Node(id));
        }
        self.nodes[id.idx()] = None;
        self.free_list.push(id.idx());
    }

    fn node(&self, id: NodeId) -> Option<&BoundNode> {
        let node = self.nodes.get(id.idx())?.as_ref()?;
        (node.generation == id.1).then_some(node)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut BoundNode> {
        let node = self.nodes.get_mut(id.idx())?.as_mut()?;
        (node.generation == id.1).then_some(node)
    }

    /// Returns true if `id` refers to a live node.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Number of live nodes, member wrappers included.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The finished template the root was bound from.
    pub fn root_declared(&self) -> &Declared {
        &self.root_declared
    }

    /// Parameters seeded from the request.
    pub fn request_parameters(&self) -> &Namespace {
        &self.request_parameters
    }

    /// Node name. The root is called `root` unless its template was named.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|n| n.name.as_str())
    }

    /// What the node stands for.
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.node(id).map(|n| n.kind)
    }

    /// Parent node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    /// The finished template a component was bound from.
    pub fn declared(&self, id: NodeId) -> Option<&Declared> {
        self.node(id)?.declared.as_ref()
    }

    /// Class of a component.
    pub fn class(&self, id: NodeId) -> Option<&Class> {
        self.declared(id).map(Declared::class)
    }

    /// A bound attribute.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&Value> {
        self.node(id)?.attributes.get(name)
    }

    /// Replace a bound attribute.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<Value>) {
        if let Some(node) = self.node_mut(id) {
            node.attributes.insert(name.to_owned(), value.into());
        }
    }

    /// Evaluated `attrs`.
    pub fn attrs(&self, id: NodeId) -> Option<&Namespace> {
        self.node(id).map(|n| &n.attrs)
    }

    /// The evaluation context of a node.
    pub fn evaluate_parameters(&self, id: NodeId) -> Option<&Namespace> {
        self.node(id).map(|n| &n.evaluate_parameters)
    }

    /// Children in order: member wrappers for components, members for
    /// wrappers.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (&str, &Child)> {
        self.node(id)
            .into_iter()
            .flat_map(|n| n.children.iter().map(|(k, v)| (k.as_str(), v)))
    }

    /// A child node by name.
    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        match self.node(id)?.children.get(name)? {
            Child::Node(child) => Some(*child),
            Child::Value(_) => None,
        }
    }

    /// A bound member of one of a component's collections.
    pub fn member(&self, id: NodeId, collection: &str, name: &str) -> Option<NodeId> {
        self.child(self.child(id, collection)?, name)
    }

    /// Names of the bound members of a collection, in order.
    pub fn member_names(&self, id: NodeId, collection: &str) -> Vec<&str> {
        self.child(id, collection)
            .map(|members| self.children(members).map(|(name, _)| name).collect())
            .unwrap_or_default()
    }

    /// Long path: the names from below the root down to `id`, joined by `/`.
    pub fn long_path(&self, id: NodeId) -> Option<String> {
        let mut segments = Vec::new();
        let mut current = id;
        loop {
            let node = self.node(current)?;
            let Some(parent) = node.parent else {
                break;
            };
            segments.push(node.name.as_str());
            current = parent;
        }
        segments.reverse();
        Some(segments.join(SEPARATOR))
    }

    /// Long path joined by `__`, as used in configuration paths.
    pub fn dunder_path(&self, id: NodeId) -> Option<String> {
        self.long_path(id).map(|p| p.replace(SEPARATOR, "__"))
    }

    /// The path index of this tree, built on first use.
    pub fn path_index(&self) -> Result<&PathIndex> {
        if let Some(index) = self.path_index.get() {
            return Ok(index);
        }
        let built = PathIndex::build(&self.root_declared)?;
        debug!(paths = built.len(), "built path index");
        Ok(self.path_index.get_or_init(|| built))
    }

    /// Short path: the unique address used for dispatch.
    pub fn path(&self, id: NodeId) -> Result<String> {
        let index = self.path_index()?;
        let long_path = self.long_path(id).unwrap_or_default();
        match index.short_path(&long_path) {
            Some(short) => Ok(short.to_owned()),
            None => Err(Error::PathNotFound {
                long_path,
                candidates: index.long_paths().map(str::to_owned).collect(),
            }),
        }
    }

    /// The dispatch path of a node: `/` followed by its short path.
    pub fn endpoint_path(&self, id: NodeId) -> Result<String> {
        Ok(format!("{SEPARATOR}{}", self.path(id)?))
    }
}
