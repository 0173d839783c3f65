// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flattening nested namespaces back into `__`-joined paths.

use indexmap::IndexMap;

use crate::namespace::{Namespace, PATH_SEPARATOR};
use crate::value::Value;

/// Flatten a namespace into an ordered map of full paths to leaf values.
///
/// Empty nested namespaces are kept as leaves so that
/// `Namespace::from_paths(flatten(&ns)) == ns` for any namespace.
///
/// The walk keeps a stack of the namespaces it is currently inside, keyed by
/// storage identity, and skips a child that is one of its own ancestors.
/// A shared sub-namespace that appears under several keys is not an ancestor
/// of itself and is flattened once per occurrence.
pub fn flatten(ns: &Namespace) -> IndexMap<String, Value> {
    let mut out = IndexMap::new();
    let mut ancestors = vec![ns.identity()];
    walk(ns, "", &mut ancestors, &mut out);
    out
}

fn walk(
    ns: &Namespace,
    prefix: &str,
    ancestors: &mut Vec<*const ()>,
    out: &mut IndexMap<String, Value>,
) {
    for (key, value) in ns.iter() {
        let path = format!("{prefix}{key}");
        match value {
            Value::Namespace(child) => {
                if ancestors.contains(&child.identity()) {
                    continue;
                }
                if child.is_empty() {
                    out.insert(path, Value::Namespace(Namespace::new()));
                } else {
                    ancestors.push(child.identity());
                    walk(child, &format!("{path}{PATH_SEPARATOR}"), ancestors, out);
                    ancestors.pop();
                }
            }
            leaf => {
                out.insert(path, leaf.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace;
    use crate::value::Callable;
    use proptest::prelude::*;

    #[test]
    fn flatten_nested() {
        let ns = namespace! { a__b = 1, a__c__d = 2, e = "x" };
        let flat = flatten(&ns);
        assert_eq!(
            flat.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["a__b", "a__c__d", "e"]
        );
        assert_eq!(flat["a__c__d"], Value::Int(2));
    }

    #[test]
    fn flatten_keeps_empty_namespaces() {
        let ns = namespace! { a = Namespace::new(), b__c = 1 };
        let flat = flatten(&ns);
        assert_eq!(flat["a"], Value::Namespace(Namespace::new()));
        assert_eq!(Namespace::from_paths(flat), ns);
    }

    #[test]
    fn shared_sub_namespace_is_flattened_per_occurrence() {
        let shared = namespace! { x = 1, y = 2 };
        let mut ns = Namespace::new();
        ns.insert("left", shared.clone());
        ns.insert("right", shared);
        let flat = flatten(&ns);
        assert_eq!(flat.len(), 4);
        assert_eq!(flat["left__x"], Value::Int(1));
        assert_eq!(flat["right__y"], Value::Int(2));
    }

    #[test]
    fn inserting_a_namespace_into_itself_terminates() {
        let mut ns = namespace! { x = 1 };
        let snapshot = ns.clone();
        ns.insert("me", snapshot);
        ns.insert("again", ns.clone());
        let flat = flatten(&ns);
        assert_eq!(flat["x"], Value::Int(1));
        assert_eq!(flat["me__x"], Value::Int(1));
        assert_eq!(flat["again__me__x"], Value::Int(1));
    }

    #[test]
    fn callables_are_leaves() {
        let f = Callable::constant("f", 1);
        let ns = namespace! { a__call_target = f.clone(), a__b = 2 };
        let flat = flatten(&ns);
        assert_eq!(flat["a__call_target"], Value::Callable(f));
    }

    fn arb_namespace() -> impl Strategy<Value = Namespace> {
        let leaf = prop_oneof![
            any::<i64>().prop_map(Value::Int),
            "[a-z]{0,4}".prop_map(Value::Str),
            any::<bool>().prop_map(Value::Bool),
        ];
        let tree = leaf.prop_recursive(3, 24, 4, |inner| {
            prop::collection::btree_map("[a-d]", inner, 0..4).prop_map(|entries| {
                let mut ns = Namespace::new();
                for (k, v) in entries {
                    ns.insert(k, v);
                }
                Value::Namespace(ns)
            })
        });
        prop::collection::btree_map("[a-d]", tree, 0..4).prop_map(|entries| {
            let mut ns = Namespace::new();
            for (k, v) in entries {
                ns.insert(k, v);
            }
            ns
        })
    }

    proptest! {
        #[test]
        fn flatten_round_trips(ns in arb_namespace()) {
            prop_assert_eq!(Namespace::from_paths(flatten(&ns)), ns);
        }
    }
}
