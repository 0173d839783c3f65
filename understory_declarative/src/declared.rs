// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Declared components: immutable templates refined before binding.
//!
//! A [`Declared`] holds its class, an optional name, and the configuration
//! namespace collected from defaults, constructor arguments and
//! refinements. `refine` and `refine_defaults` return new templates;
//! nothing ever mutates a template in place, so one template can be bound
//! for any number of requests.
//!
//! [`Declared::refine_done`] freezes the configuration: styles are applied,
//! every refinable is popped into a concrete attribute, member collections
//! are built (recursively finishing their members) and sorted by `after`.

use core::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use understory_namespace::{
    AttributePath, Namespace, PATH_SEPARATOR, Value, flatten, get_path, namespace,
};

use crate::class::{Class, MemberSpec, RefinableKind};
use crate::error::{Error, Result};
use crate::sort_after::{After, sort_after};
use crate::style::StyleRegistry;
use crate::types::CollectionFlags;

/// Names member entries may not use.
///
/// They name operations of the component protocol.
pub const RESERVED_NAMES: &[&str] = &[
    "_name",
    "bind",
    "dunder_path",
    "endpoint_path",
    "get_request",
    "long_path",
    "on_bind",
    "own_evaluate_parameters",
    "refine",
    "refine_defaults",
    "refine_done",
];

/// An entry of a member collection.
#[derive(Clone, Debug, PartialEq)]
pub enum MemberEntry {
    /// A child component.
    Node(Declared),
    /// A plain value kept by a fall-through collection.
    Value(Value),
}

impl MemberEntry {
    /// The child component, if this entry is one.
    pub fn as_node(&self) -> Option<&Declared> {
        match self {
            Self::Node(node) => Some(node),
            Self::Value(_) => None,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Self::Node(node) => Value::from(node.clone()),
            Self::Value(value) => value.clone(),
        }
    }
}

/// A finished member collection, in final order.
#[derive(Clone, Debug, PartialEq)]
pub struct Collection {
    flags: CollectionFlags,
    entries: IndexMap<String, MemberEntry>,
}

impl Collection {
    /// Collection flags.
    pub fn flags(&self) -> CollectionFlags {
        self.flags
    }

    /// Entries in final order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &MemberEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Look up one entry.
    pub fn get(&self, name: &str) -> Option<&MemberEntry> {
        self.entries.get(name)
    }

    /// Entry names in final order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the collection has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Finished {
    style: String,
    attributes: IndexMap<String, Value>,
    collections: IndexMap<String, Collection>,
}

#[derive(Clone)]
struct Inner {
    class: Class,
    name: Option<String>,
    namespace: Namespace,
    finished: Option<Finished>,
}

/// A declared component template.
///
/// Cloning is cheap and clones compare equal; use [`Declared::refine`] to
/// derive a new template.
#[derive(Clone)]
pub struct Declared(Arc<Inner>);

impl Declared {
    /// Declare an instance of `class` configured by `config`.
    ///
    /// Every top-level key of `config` must be a refinable of the class.
    /// Class defaults lie beneath `config`.
    pub fn new(class: &Class, config: &Namespace) -> Result<Self> {
        check_refinables(class, config)?;
        Ok(Self(Arc::new(Inner {
            class: class.clone(),
            name: None,
            namespace: class.defaults().merged(config),
            finished: None,
        })))
    }

    /// The class.
    pub fn class(&self) -> &Class {
        &self.0.class
    }

    /// The member name, if any.
    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    /// The collected configuration.
    pub fn namespace(&self) -> &Namespace {
        &self.0.namespace
    }

    /// Returns true once [`Declared::refine_done`] produced this template.
    pub fn is_refine_done(&self) -> bool {
        self.0.finished.is_some()
    }

    /// Resolved style name, once finished.
    pub fn style(&self) -> Option<&str> {
        self.0.finished.as_ref().map(|f| f.style.as_str())
    }

    /// A finished attribute, unevaluated.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.0.finished.as_ref()?.attributes.get(name)
    }

    /// All finished attributes in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0
            .finished
            .iter()
            .flat_map(|f| f.attributes.iter().map(|(k, v)| (k.as_str(), v)))
    }

    /// A finished member collection.
    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.0.finished.as_ref()?.collections.get(name)
    }

    /// All finished member collections in declaration order.
    pub fn collections(&self) -> impl Iterator<Item = (&str, &Collection)> {
        self.0
            .finished
            .iter()
            .flat_map(|f| f.collections.iter().map(|(k, v)| (k.as_str(), v)))
    }

    /// The same template under another member name.
    #[must_use]
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        let mut inner = (*self.0).clone();
        inner.name = Some(name.into());
        Self(Arc::new(inner))
    }

    fn with_namespace(&self, namespace: Namespace) -> Self {
        let mut inner = (*self.0).clone();
        inner.namespace = namespace;
        Self(Arc::new(inner))
    }

    fn ensure_not_done(&self) -> Result<()> {
        if self.is_refine_done() {
            return Err(Error::AlreadyRefineDone {
                node: format!("{self:?}"),
            });
        }
        Ok(())
    }

    /// Layer `config` on top of the configuration.
    ///
    /// Configuration whose path crosses an already declared component
    /// refines that component instead of replacing it.
    pub fn refine(&self, config: &Namespace) -> Result<Self> {
        self.refined(config, false)
    }

    /// Layer `config` beneath the configuration: existing values win.
    pub fn refine_defaults(&self, config: &Namespace) -> Result<Self> {
        self.refined(config, true)
    }

    fn refined(&self, config: &Namespace, defaults: bool) -> Result<Self> {
        self.ensure_not_done()?;
        check_refinables(self.class(), config)?;

        let mut plain = Namespace::new();
        let mut crossed = Namespace::new();
        let mut handled: Vec<String> = Vec::new();
        for (path, value) in flatten(config) {
            let Some((prefix, existing)) = declared_on_path(self.namespace(), &path) else {
                plain.set_path(&path, value);
                continue;
            };
            if handled.contains(&prefix) {
                continue;
            }
            handled.push(prefix.clone());
            match get_path(config, &prefix)? {
                Value::Namespace(sub) => {
                    let refined = if defaults {
                        existing.refine_defaults(&sub)?
                    } else {
                        existing.refine(&sub)?
                    };
                    crossed.set_path(&prefix, refined);
                }
                // A whole replacement given as a default loses to the declared one.
                _ if defaults => {}
                replacement => crossed.set_path(&prefix, replacement),
            }
        }

        let namespace = if defaults {
            plain.merged(self.namespace()).merged(&crossed)
        } else {
            self.namespace().merged(&plain).merged(&crossed)
        };
        Ok(self.with_namespace(namespace))
    }

    /// Freeze the configuration.
    ///
    /// `parent_style` is the style of the enclosing component; the node's own
    /// `style` attribute wins, and the registry default applies at the root.
    pub fn refine_done(
        &self,
        parent_style: Option<&str>,
        registry: &StyleRegistry,
    ) -> Result<Self> {
        self.ensure_not_done()?;
        let style = match self.namespace().get("style") {
            Some(Value::Str(style)) => style.clone(),
            _ => parent_style.unwrap_or(registry.default_style()).to_owned(),
        };
        let overlay = registry.overlay(&style, self.class().lineage())?;
        let node = if overlay.is_empty() {
            self.clone()
        } else {
            self.refine_defaults(&overlay)?
        };

        let class = node.class().clone();
        let mut remaining = node.namespace().clone();
        let mut attributes = IndexMap::new();
        let mut collections = IndexMap::new();
        for (name, kind) in class.refinables() {
            let value = remaining.remove(name).unwrap_or_default();
            match kind {
                RefinableKind::Members(spec) => {
                    let collection =
                        collect_members(&class, name, spec, value, &style, registry)?;
                    collections.insert(name.to_owned(), collection);
                }
                RefinableKind::Plain | RefinableKind::Evaluated => {
                    attributes.insert(name.to_owned(), value);
                }
            }
        }
        if !remaining.is_empty() {
            return Err(unknown_refinables(&class, remaining.keys()));
        }

        let mut inner = (*node.0).clone();
        inner.finished = Some(Finished {
            style,
            attributes,
            collections,
        });
        Ok(Self(Arc::new(inner)))
    }
}

impl PartialEq for Declared {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Declared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name().map(|n| format!(" {n}")).unwrap_or_default();
        let done = if self.is_refine_done() { " (refine done)" } else { "" };
        write!(f, "<{}{name}{done} {}>", self.class().name(), self.namespace())
    }
}

impl From<Declared> for Value {
    fn from(declared: Declared) -> Self {
        Self::object(declared)
    }
}

impl AttributePath for Declared {
    fn type_name(&self) -> &str {
        self.class().name()
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        match &self.0.finished {
            Some(finished) => finished.attributes.get(name).cloned().or_else(|| {
                finished.collections.get(name).map(|c| {
                    let mut ns = Namespace::new();
                    for (key, entry) in c.entries() {
                        ns.insert(key, entry.to_value());
                    }
                    Value::Namespace(ns)
                })
            }),
            None => self.namespace().get(name).cloned(),
        }
    }

    fn to_value(&self) -> Value {
        Value::from(self.clone())
    }
}

fn check_refinables(class: &Class, config: &Namespace) -> Result<()> {
    let unknown: Vec<&str> = config
        .keys()
        .filter(|k| class.refinable(k).is_none())
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(unknown_refinables(class, unknown.into_iter()))
    }
}

fn unknown_refinables<'a>(class: &Class, names: impl Iterator<Item = &'a str>) -> Error {
    let mut names: Vec<String> = names.map(str::to_owned).collect();
    names.sort();
    Error::UnknownRefinable {
        class: class.name().to_owned(),
        names,
        available: class.refinable_names(),
    }
}

/// The first declared component met while walking `path` through `ns`.
fn declared_on_path(ns: &Namespace, path: &str) -> Option<(String, Declared)> {
    let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
    let mut current = ns;
    for (i, segment) in segments.iter().enumerate() {
        match current.get(segment)? {
            Value::Namespace(nested) => current = nested,
            Value::Object(object) => {
                let declared = object.downcast_ref::<Declared>()?;
                return Some((segments[..=i].join(PATH_SEPARATOR), declared.clone()));
            }
            _ => return None,
        }
    }
    None
}

fn collect_members(
    owner: &Class,
    collection: &str,
    spec: &MemberSpec,
    config: Value,
    style: &str,
    registry: &StyleRegistry,
) -> Result<Collection> {
    let config = match config {
        Value::Null => Namespace::new(),
        Value::Namespace(ns) => ns,
        other => {
            return Err(Error::UnexpectedMember {
                class: owner.name().to_owned(),
                name: collection.to_owned(),
                found: other.type_name().to_owned(),
            });
        }
    };
    let in_class = owner.declared_members(collection);

    let mut reserved: Vec<String> = config
        .keys()
        .chain(in_class.into_iter().flat_map(|m| m.keys().map(String::as_str)))
        .filter(|name| RESERVED_NAMES.contains(name))
        .map(str::to_owned)
        .collect();
    if !reserved.is_empty() {
        reserved.sort();
        reserved.dedup();
        return Err(Error::ReservedNames { names: reserved });
    }

    let mut entries: IndexMap<String, MemberEntry> = in_class
        .into_iter()
        .flatten()
        .map(|(name, declared)| (name.clone(), MemberEntry::Node(declared.with_name(name))))
        .collect();
    let mut deferred: Vec<(String, Namespace)> = Vec::new();

    for (name, item) in config.iter() {
        match item {
            Value::Object(object) if object.is::<Declared>() => {
                if let Some(declared) = object.downcast_ref::<Declared>() {
                    entries.insert(name.to_owned(), MemberEntry::Node(declared.with_name(name)));
                }
            }
            Value::Namespace(ns) => {
                if matches!(entries.get(name), Some(MemberEntry::Node(_))) {
                    deferred.push((name.to_owned(), ns.clone()));
                } else {
                    let declared = construct_member(spec, name, ns)?;
                    entries.insert(name.to_owned(), MemberEntry::Node(declared));
                }
            }
            Value::Null => {
                entries.shift_remove(name);
            }
            other => {
                if !spec.flags().contains(CollectionFlags::FALL_THROUGH) {
                    return Err(Error::UnexpectedMember {
                        class: spec.default_class().name().to_owned(),
                        name: name.to_owned(),
                        found: other.type_name().to_owned(),
                    });
                }
                entries.insert(name.to_owned(), MemberEntry::Value(other.clone()));
            }
        }
    }

    for (name, ns) in deferred {
        if let Some(MemberEntry::Node(existing)) = entries.get(&name) {
            let refined = existing.refine(&ns)?;
            entries.insert(name, MemberEntry::Node(refined));
        }
    }

    let mut finished = IndexMap::with_capacity(entries.len());
    for (name, entry) in entries {
        let entry = match entry {
            MemberEntry::Node(node) if !node.is_refine_done() => {
                MemberEntry::Node(node.refine_done(Some(style), registry)?)
            }
            other => other,
        };
        finished.insert(name, entry);
    }

    let entries = sort_after(finished, |name, entry| match entry {
        MemberEntry::Node(node) => match node.attribute("after") {
            Some(after) => After::from_value(name, after),
            None => Ok(After::Unmoved),
        },
        MemberEntry::Value(_) => Ok(After::Unmoved),
    })?;

    Ok(Collection {
        flags: spec.flags(),
        entries,
    })
}

fn construct_member(spec: &MemberSpec, name: &str, config: &Namespace) -> Result<Declared> {
    let mut call = namespace! { call_target__cls = spec.default_class().class_ref() };
    call.insert("_name", name);
    let built = call.merged(config).call(&Namespace::new())?;
    match built.downcast_ref::<Declared>() {
        Some(declared) => Ok(declared.with_name(name)),
        None => Err(Error::UnexpectedMember {
            class: spec.default_class().name().to_owned(),
            name: name.to_owned(),
            found: built.type_name().to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use understory_namespace::{Callable, EMPTY, Signature};

    fn field() -> Class {
        Class::builder("Field")
            .evaluated("initial")
            .evaluated("after")
            .build()
    }

    fn form() -> Class {
        Class::builder("Form")
            .refinable("title")
            .members("fields", MemberSpec::new(&field()))
            .build()
    }

    fn registry() -> StyleRegistry {
        StyleRegistry::default()
    }

    fn names(declared: &Declared, collection: &str) -> Vec<String> {
        declared
            .collection(collection)
            .unwrap()
            .names()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn members_from_configuration_in_order() {
        let form = form()
            .declare(&namespace! { fields__a = Namespace::new(), fields__b__initial = 2 })
            .unwrap()
            .refine_done(None, &registry())
            .unwrap();
        assert_eq!(names(&form, "fields"), vec!["a", "b"]);
        let b = form.collection("fields").unwrap().get("b").unwrap().as_node().unwrap();
        assert_eq!(b.name(), Some("b"));
        assert_eq!(b.attribute("initial"), Some(&Value::Int(2)));
        assert!(b.is_refine_done());
    }

    #[test]
    fn after_zero_orders_first() {
        let form = form()
            .declare(&namespace! {
                fields__a = EMPTY,
                fields__b = EMPTY,
                fields__c__after = 0,
            })
            .unwrap()
            .refine_done(None, &registry())
            .unwrap();
        assert_eq!(names(&form, "fields"), vec!["c", "a", "b"]);
    }

    #[test]
    fn reserved_member_name_is_rejected() {
        let err = form()
            .declare(&namespace! { fields__bind = Namespace::new(), fields__ok = Namespace::new() })
            .unwrap()
            .refine_done(None, &registry())
            .unwrap_err();
        assert!(matches!(&err, Error::ReservedNames { names } if names == &["bind"]));
        assert!(err.to_string().contains("bind"));
    }

    #[test]
    fn null_removes_member() {
        let declared = field().declare(&Namespace::new()).unwrap();
        let class = form()
            .subclass("ArtistForm")
            .member("fields", "name", declared.clone())
            .member("fields", "year", declared)
            .build();
        let form = class
            .declare(&namespace! { fields__name = Value::Null })
            .unwrap()
            .refine_done(None, &registry())
            .unwrap();
        assert_eq!(names(&form, "fields"), vec!["year"]);
    }

    #[test]
    fn config_for_class_member_is_deferred() {
        let class = form()
            .subclass("ArtistForm")
            .member("fields", "name", field().declare(&namespace! { initial = 1 }).unwrap())
            .member("fields", "year", field().declare(&Namespace::new()).unwrap())
            .build();
        let form = class
            .declare(&namespace! { fields__name__after = "year" })
            .unwrap()
            .refine_done(None, &registry())
            .unwrap();
        assert_eq!(names(&form, "fields"), vec!["year", "name"]);
        let name = form.collection("fields").unwrap().get("name").unwrap().as_node().unwrap();
        assert_eq!(name.attribute("initial"), Some(&Value::Int(1)));
    }

    #[test]
    fn refine_does_not_mutate_and_crosses_declared() {
        let foo = field().declare(&namespace! { initial = 1 }).unwrap();
        let base = form().declare(&namespace! { fields__foo = foo.clone() }).unwrap();
        let refined = base
            .refine(&namespace! { fields__foo__initial = 5, title = "t" })
            .unwrap();

        let inner = get_path(refined.namespace(), "fields__foo").unwrap();
        let inner = inner.downcast_ref::<Declared>().unwrap();
        assert_eq!(inner.namespace().get("initial"), Some(&Value::Int(5)));
        assert_eq!(foo.namespace().get("initial"), Some(&Value::Int(1)));
        assert!(base.namespace().get("title").is_none());
    }

    #[test]
    fn refine_defaults_lie_beneath() {
        let base = form().declare(&namespace! { title = "mine" }).unwrap();
        let refined = base
            .refine_defaults(&namespace! { title = "default", fields__x__initial = 1 })
            .unwrap();
        assert_eq!(refined.namespace().get("title"), Some(&Value::from("mine")));
        assert!(get_path(refined.namespace(), "fields__x__initial").is_ok());
    }

    #[test]
    fn refine_after_done_is_an_error() {
        let done = form()
            .declare(&Namespace::new())
            .unwrap()
            .refine_done(None, &registry())
            .unwrap();
        assert!(matches!(
            done.refine(&namespace! { title = "x" }),
            Err(Error::AlreadyRefineDone { .. })
        ));
        assert!(done.refine_done(None, &registry()).is_err());
    }

    #[test]
    fn plain_values_need_fall_through() {
        let strict = form().declare(&namespace! { fields__x = "text" }).unwrap();
        assert!(matches!(
            strict.refine_done(None, &registry()),
            Err(Error::UnexpectedMember { .. })
        ));

        let loose = Class::builder("Fragment")
            .members(
                "children",
                MemberSpec::new(&field()).with_flags(CollectionFlags::FALL_THROUGH),
            )
            .build()
            .declare(&namespace! { children__text = "hello" })
            .unwrap()
            .refine_done(None, &registry())
            .unwrap();
        assert_eq!(
            loose.collection("children").unwrap().get("text"),
            Some(&MemberEntry::Value(Value::from("hello")))
        );
    }

    #[test]
    fn custom_call_target_builds_member() {
        let special = field()
            .subclass("SpecialField")
            .default("initial", "special")
            .build();
        let form = form()
            .declare(&namespace! { fields__s__call_target = special.class_ref() })
            .unwrap()
            .refine_done(None, &registry())
            .unwrap();
        let s = form.collection("fields").unwrap().get("s").unwrap().as_node().unwrap();
        assert_eq!(s.class().name(), "SpecialField");
        assert_eq!(s.attribute("initial"), Some(&Value::from("special")));
    }

    #[test]
    fn callable_member_factory_must_return_component() {
        let factory = Callable::new("factory", Signature::any(), |_| Ok(Value::Int(1)));
        let err = form()
            .declare(&namespace! { fields__s__call_target = factory })
            .unwrap()
            .refine_done(None, &registry())
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedMember { .. }));
    }

    #[test]
    fn attribute_path_through_finished_members() {
        let form = form()
            .declare(&namespace! { fields__a__initial = 3 })
            .unwrap()
            .refine_done(None, &registry())
            .unwrap();
        let a = get_path(&form, "fields__a").unwrap();
        let a = a.downcast_ref::<Declared>().unwrap();
        assert_eq!(get_path(a, "initial").unwrap(), Value::Int(3));
    }
}
