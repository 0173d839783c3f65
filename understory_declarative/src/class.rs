// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Component classes: refinable attribute registries, defaults, and hooks.
//!
//! A [`Class`] is a runtime descriptor. It lists the refinable attributes a
//! component accepts, the defaults applied beneath constructor arguments,
//! members declared in the class body, named shortcuts, and the hooks run at
//! bind and render time. Subclasses copy their base and extend it; the
//! [`lineage`](Class::lineage) keeps the chain of class names for styling.

use core::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use understory_namespace::{
    CallResult, Callable, ClassRef, Construct, Namespace, Signature, Value,
};

use crate::declared::Declared;
use crate::error::Result;
use crate::tree::BoundTree;
use crate::types::{CollectionFlags, NodeId};

/// Hook run after a node's members are bound.
///
/// It may inspect the bound children and change attributes, including
/// setting `include` to false to drop the node.
pub type OnBind = Arc<dyn Fn(&mut BoundTree, NodeId) -> Result<()> + Send + Sync>;

/// Hook contributing evaluation parameters for a node and its descendants.
pub type EvaluateParameters = Arc<dyn Fn(&BoundTree, NodeId) -> Namespace + Send + Sync>;

/// Hook rendering a bound node to markup.
pub type Render = Arc<dyn Fn(&BoundTree, NodeId) -> Result<String> + Send + Sync>;

/// How a refinable attribute is treated at `refine_done` and bind time.
#[derive(Clone, Debug)]
pub enum RefinableKind {
    /// Stored as given.
    Plain,
    /// Resolved against the evaluation context at bind time.
    Evaluated,
    /// A named, ordered collection of child components.
    Members(MemberSpec),
}

#[derive(Clone)]
enum DefaultClass {
    Fixed(Class),
    Lazy(fn() -> Class),
}

/// Declaration of a member collection.
#[derive(Clone)]
pub struct MemberSpec {
    default_class: DefaultClass,
    flags: CollectionFlags,
}

impl MemberSpec {
    /// Members built from configuration default to instances of `class`.
    pub fn new(class: &Class) -> Self {
        Self {
            default_class: DefaultClass::Fixed(class.clone()),
            flags: CollectionFlags::empty(),
        }
    }

    /// Like [`MemberSpec::new`], with the class looked up on first use.
    ///
    /// Needed when a class collects members of its own kind.
    pub fn lazy(class: fn() -> Class) -> Self {
        Self {
            default_class: DefaultClass::Lazy(class),
            flags: CollectionFlags::empty(),
        }
    }

    /// Set collection flags.
    #[must_use]
    pub fn with_flags(mut self, flags: CollectionFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Collection flags.
    pub fn flags(&self) -> CollectionFlags {
        self.flags
    }

    /// The class used for members given as configuration.
    pub fn default_class(&self) -> Class {
        match &self.default_class {
            DefaultClass::Fixed(class) => class.clone(),
            DefaultClass::Lazy(f) => f(),
        }
    }
}

impl fmt::Debug for MemberSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = match &self.default_class {
            DefaultClass::Fixed(class) => class.name().to_owned(),
            DefaultClass::Lazy(_) => "<lazy>".to_owned(),
        };
        f.debug_struct("MemberSpec")
            .field("default_class", &class)
            .field("flags", &self.flags)
            .finish()
    }
}

#[derive(Clone)]
struct ClassDef {
    name: String,
    lineage: Vec<String>,
    refinables: IndexMap<String, RefinableKind>,
    defaults: Namespace,
    members: IndexMap<String, IndexMap<String, Declared>>,
    shortcuts: IndexMap<String, Namespace>,
    on_bind: Vec<OnBind>,
    evaluate_parameters: Vec<EvaluateParameters>,
    render: Option<Render>,
}

/// A component class.
///
/// Cloning is cheap; equality is identity.
#[derive(Clone)]
pub struct Class(Arc<ClassDef>);

impl Class {
    /// Start a new root class.
    ///
    /// Every class has an evaluated `include` attribute (default `true`)
    /// and a plain `style` attribute naming the style to apply.
    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        let name = name.into();
        let mut defaults = Namespace::new();
        defaults.set_path("include", true);
        let mut refinables = IndexMap::new();
        refinables.insert("include".to_owned(), RefinableKind::Evaluated);
        refinables.insert("style".to_owned(), RefinableKind::Plain);
        ClassBuilder {
            def: ClassDef {
                lineage: vec![name.clone()],
                name,
                refinables,
                defaults,
                members: IndexMap::new(),
                shortcuts: IndexMap::new(),
                on_bind: Vec::new(),
                evaluate_parameters: Vec::new(),
                render: None,
            },
        }
    }

    /// Start a subclass that inherits everything from `self`.
    pub fn subclass(&self, name: impl Into<String>) -> ClassBuilder {
        let name = name.into();
        let mut def = (*self.0).clone();
        def.lineage.push(name.clone());
        def.name = name;
        ClassBuilder { def }
    }

    /// Class name.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Class names from the root class down to this one.
    pub fn lineage(&self) -> &[String] {
        &self.0.lineage
    }

    /// Refinable attributes in declaration order.
    pub fn refinables(&self) -> impl Iterator<Item = (&str, &RefinableKind)> {
        self.0.refinables.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Look up one refinable.
    pub fn refinable(&self, name: &str) -> Option<&RefinableKind> {
        self.0.refinables.get(name)
    }

    /// Sorted names of all refinables, used in diagnostics.
    pub fn refinable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.refinables.keys().cloned().collect();
        names.sort();
        names
    }

    /// Defaults applied beneath constructor arguments.
    pub fn defaults(&self) -> &Namespace {
        &self.0.defaults
    }

    /// Members declared in the class body for `collection`.
    pub fn declared_members(&self, collection: &str) -> Option<&IndexMap<String, Declared>> {
        self.0.members.get(collection)
    }

    /// Defaults of the named shortcut.
    pub fn shortcut_defaults(&self, name: &str) -> Option<&Namespace> {
        self.0.shortcuts.get(name)
    }

    pub(crate) fn on_bind_hooks(&self) -> &[OnBind] {
        &self.0.on_bind
    }

    pub(crate) fn evaluate_parameter_hooks(&self) -> &[EvaluateParameters] {
        &self.0.evaluate_parameters
    }

    pub(crate) fn render_hook(&self) -> Option<&Render> {
        self.0.render.as_ref()
    }

    /// Declare an instance with the given configuration.
    pub fn declare(&self, config: &Namespace) -> Result<Declared> {
        Declared::new(self, config)
    }

    /// Declare an instance through a shortcut: its defaults lie beneath `config`.
    pub fn declare_shortcut(&self, shortcut: &str, config: &Namespace) -> Result<Declared> {
        let defaults = self.shortcut_defaults(shortcut).cloned().unwrap_or_default();
        Declared::new(self, &defaults.merged(config))
    }

    /// Handle for use as a namespace `call_target`.
    pub fn class_ref(&self) -> ClassRef {
        ClassRef::new(Arc::new(self.clone()))
    }

    /// Returns true if `self` or one of its bases is called `name`.
    pub fn is_a(&self, name: &str) -> bool {
        self.0.lineage.iter().any(|n| n == name)
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.0.name)
            .field("lineage", &self.0.lineage)
            .field("refinables", &self.0.refinables.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Construct for Class {
    fn class_name(&self) -> &str {
        self.name()
    }

    fn construct(&self, args: &Namespace) -> CallResult {
        let mut args = args.clone();
        let name = args.remove("_name");
        let mut declared = Declared::new(self, &args)?;
        if let Some(Value::Str(name)) = name {
            declared = declared.with_name(name);
        }
        Ok(Value::from(declared))
    }

    fn shortcut(&self, name: &str) -> Option<Callable> {
        let defaults = self.shortcut_defaults(name)?.clone();
        let class = self.clone();
        Some(Callable::new(
            format!("{}.{name}", self.name()),
            Signature::any(),
            move |args| class.construct(&defaults.merged(args)),
        ))
    }
}

/// Builder for a [`Class`].
#[must_use]
pub struct ClassBuilder {
    def: ClassDef,
}

impl fmt::Debug for ClassBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassBuilder")
            .field("name", &self.def.name)
            .finish_non_exhaustive()
    }
}

impl ClassBuilder {
    /// Declare a plain refinable.
    pub fn refinable(mut self, name: &str) -> Self {
        self.def
            .refinables
            .insert(name.to_owned(), RefinableKind::Plain);
        self
    }

    /// Declare an evaluated refinable.
    pub fn evaluated(mut self, name: &str) -> Self {
        self.def
            .refinables
            .insert(name.to_owned(), RefinableKind::Evaluated);
        self
    }

    /// Declare a member collection.
    pub fn members(mut self, name: &str, spec: MemberSpec) -> Self {
        self.def
            .refinables
            .insert(name.to_owned(), RefinableKind::Members(spec));
        self
    }

    /// Set a default at a `__` path. Constructor arguments win over defaults.
    pub fn default(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.def.defaults.set_path(path, value);
        self
    }

    /// Declare a member in the class body.
    pub fn member(mut self, collection: &str, name: &str, declared: Declared) -> Self {
        self.def
            .members
            .entry(collection.to_owned())
            .or_default()
            .insert(name.to_owned(), declared.with_name(name));
        self
    }

    /// Register a named shortcut: a namespace of defaults.
    pub fn shortcut(mut self, name: &str, defaults: Namespace) -> Self {
        self.def.shortcuts.insert(name.to_owned(), defaults);
        self
    }

    /// Add an `on_bind` hook. Hooks of base classes run first.
    pub fn on_bind<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut BoundTree, NodeId) -> Result<()> + Send + Sync + 'static,
    {
        self.def.on_bind.push(Arc::new(hook));
        self
    }

    /// Add a hook contributing evaluation parameters.
    pub fn evaluate_parameters<F>(mut self, hook: F) -> Self
    where
        F: Fn(&BoundTree, NodeId) -> Namespace + Send + Sync + 'static,
    {
        self.def.evaluate_parameters.push(Arc::new(hook));
        self
    }

    /// Set the render hook, replacing the base class's.
    pub fn render<F>(mut self, hook: F) -> Self
    where
        F: Fn(&BoundTree, NodeId) -> Result<String> + Send + Sync + 'static,
    {
        self.def.render = Some(Arc::new(hook));
        self
    }

    /// Finish the class.
    pub fn build(self) -> Class {
        Class(Arc::new(self.def))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use understory_namespace::namespace;

    fn field() -> Class {
        Class::builder("Field")
            .evaluated("initial")
            .refinable("after")
            .shortcut("integer", namespace! { initial = 0 })
            .build()
    }

    #[test]
    fn subclass_inherits_and_extends() {
        let base = field();
        let sub = base.subclass("EmailField").evaluated("placeholder").build();
        assert_eq!(sub.lineage(), ["Field", "EmailField"]);
        assert!(sub.refinable("initial").is_some());
        assert!(sub.refinable("placeholder").is_some());
        assert!(base.refinable("placeholder").is_none());
        assert!(sub.is_a("Field"));
        assert_eq!(sub.defaults().get("include"), Some(&Value::Bool(true)));
    }

    #[test]
    fn class_ref_constructs_declared() {
        let class = field();
        let ns = namespace! { call_target = class.class_ref(), _name = "age", initial = 3 };
        let value = ns.call(&Namespace::new()).unwrap();
        let declared = value.downcast_ref::<Declared>().unwrap();
        assert_eq!(declared.name(), Some("age"));
        assert_eq!(declared.namespace().get("initial"), Some(&Value::Int(3)));
    }

    #[test]
    fn shortcut_defaults_lose_to_arguments() {
        let class = field();
        let ns = namespace! {
            call_target__cls = class.class_ref(),
            call_target__attribute = "integer",
        };
        let value = ns.call(&Namespace::new()).unwrap();
        let declared = value.downcast_ref::<Declared>().unwrap();
        assert_eq!(declared.namespace().get("initial"), Some(&Value::Int(0)));

        let declared = class
            .declare_shortcut("integer", &namespace! { initial = 7 })
            .unwrap();
        assert_eq!(declared.namespace().get("initial"), Some(&Value::Int(7)));
    }

    #[test]
    fn unknown_refinable_is_rejected_at_construction() {
        let err = field().declare(&namespace! { nope = 1 }).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Field object has no refinable attribute(s): \"nope\""));
        assert!(message.contains("    initial\n"), "{message}");
    }
}
