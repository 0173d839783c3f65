// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Short and long paths of components.
//!
//! The long path of a component joins the names from below the root down to
//! it, collection names included (`fields/name`). The short path is the
//! shortest suffix of its component names that no earlier component has
//! claimed (`name`). Short paths are what dispatch keys carry.
//!
//! Components are visited depth first from the root, which claims the empty
//! path. Collections flagged [`VISIT_LAST`](CollectionFlags::VISIT_LAST) are
//! visited after their siblings so that user-named members claim the short
//! names first.

use indexmap::IndexMap;

use crate::declared::{Declared, MemberEntry};
use crate::error::{Error, Result};
use crate::types::CollectionFlags;

/// Separator of path segments.
pub const SEPARATOR: &str = "/";

/// Join `segments` into a long path.
pub fn build_long_path<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// Bidirectional map between short and long paths.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathIndex {
    long_by_short: IndexMap<String, String>,
    short_by_long: IndexMap<String, String>,
}

impl PathIndex {
    /// Assign short paths to every component under `root`.
    ///
    /// `root` should be finished; unfinished templates have no members to
    /// visit.
    pub fn build(root: &Declared) -> Result<Self> {
        let mut index = Self::default();
        let mut long = Vec::new();
        let mut short = Vec::new();
        index.visit(root, true, &mut long, &mut short)?;
        Ok(index)
    }

    fn visit(
        &mut self,
        node: &Declared,
        participates: bool,
        long: &mut Vec<String>,
        short: &mut Vec<String>,
    ) -> Result<()> {
        if participates {
            self.claim(long, short)?;
        }

        let (first, last): (Vec<_>, Vec<_>) = node
            .collections()
            .partition(|(_, c)| !c.flags().contains(CollectionFlags::VISIT_LAST));
        for (collection_name, collection) in first.into_iter().chain(last) {
            long.push(collection_name.to_owned());
            for (member_name, entry) in collection.entries() {
                let MemberEntry::Node(member) = entry else {
                    continue;
                };
                let named = member.name().is_some();
                long.push(member_name.to_owned());
                if named {
                    short.push(member_name.to_owned());
                }
                self.visit(member, named, long, short)?;
                if named {
                    short.pop();
                }
                long.pop();
            }
            long.pop();
        }
        Ok(())
    }

    fn claim(&mut self, long: &[String], short: &[String]) -> Result<()> {
        let long_path = build_long_path(long);
        for start in (0..=short.len()).rev() {
            let candidate = build_long_path(&short[start..]);
            if !self.long_by_short.contains_key(&candidate) {
                self.insert(candidate, long_path);
                return Ok(());
            }
        }
        // Every suffix of the component names is taken; suffixes of the long
        // path, which include collection names, still tell nodes apart.
        for start in (0..long.len()).rev() {
            let candidate = build_long_path(&long[start..]);
            if !self.long_by_short.contains_key(&candidate) {
                self.insert(candidate, long_path);
                return Ok(());
            }
        }
        Err(Error::PathsExhausted {
            long_path,
            so_far: self
                .long_by_short
                .iter()
                .map(|(s, l)| (s.clone(), l.clone()))
                .collect(),
        })
    }

    fn insert(&mut self, short: String, long: String) {
        self.short_by_long.insert(long.clone(), short.clone());
        self.long_by_short.insert(short, long);
    }

    /// The long path claimed by `short`.
    pub fn long_path(&self, short: &str) -> Option<&str> {
        self.long_by_short.get(short).map(String::as_str)
    }

    /// The short path assigned to `long`.
    pub fn short_path(&self, long: &str) -> Option<&str> {
        self.short_by_long.get(long).map(String::as_str)
    }

    /// All short paths in assignment order.
    pub fn short_paths(&self) -> impl Iterator<Item = &str> {
        self.long_by_short.keys().map(String::as_str)
    }

    /// All long paths in assignment order.
    pub fn long_paths(&self) -> impl Iterator<Item = &str> {
        self.short_by_long.keys().map(String::as_str)
    }

    /// Number of indexed components.
    pub fn len(&self) -> usize {
        self.long_by_short.len()
    }

    /// Returns true if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.long_by_short.is_empty()
    }
}

/// Long path to short path for every component under `root`.
pub fn build_long_path_by_path(root: &Declared) -> Result<IndexMap<String, String>> {
    Ok(PathIndex::build(root)?.short_by_long)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{Class, MemberSpec};
    use crate::style::StyleRegistry;
    use understory_namespace::{Namespace, namespace};

    fn leaf() -> Class {
        Class::builder("Leaf").build()
    }

    fn group() -> Class {
        Class::builder("Group")
            .members("items", MemberSpec::new(&leaf()))
            .build()
    }

    fn page() -> Class {
        Class::builder("Page")
            .members("parts", MemberSpec::new(&group()))
            .members(
                "endpoints",
                MemberSpec::new(&leaf()).with_flags(CollectionFlags::VISIT_LAST),
            )
            .build()
    }

    fn finished(class: &Class, config: &Namespace) -> Declared {
        class
            .declare(config)
            .unwrap()
            .refine_done(None, &StyleRegistry::new())
            .unwrap()
    }

    #[test]
    fn shortest_unclaimed_suffix_wins() {
        let root = finished(
            &page(),
            &namespace! {
                parts__a__items__x = Namespace::new(),
                parts__b__items__x = Namespace::new(),
            },
        );
        let paths = build_long_path_by_path(&root).unwrap();
        let pairs: Vec<(&str, &str)> = paths.iter().map(|(l, s)| (l.as_str(), s.as_str())).collect();
        assert_eq!(
            pairs,
            vec![
                ("", ""),
                ("parts/a", "a"),
                ("parts/a/items/x", "x"),
                ("parts/b", "b"),
                ("parts/b/items/x", "b/x"),
            ]
        );
    }

    #[test]
    fn visit_last_collections_yield_names() {
        let root = finished(
            &page(),
            &namespace! {
                endpoints__tbody = Namespace::new(),
                parts__tbody = Namespace::new(),
            },
        );
        let index = PathIndex::build(&root).unwrap();
        assert_eq!(index.long_path("tbody"), Some("parts/tbody"));
        assert_eq!(index.short_path("endpoints/tbody"), Some("endpoints/tbody"));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn short_paths_are_unique() {
        let root = finished(
            &page(),
            &namespace! {
                parts__x__items__x = Namespace::new(),
                parts__y__items__x = Namespace::new(),
                parts__x__items__y = Namespace::new(),
                endpoints__x = Namespace::new(),
            },
        );
        let index = PathIndex::build(&root).unwrap();
        let mut shorts: Vec<&str> = index.short_paths().collect();
        let total = shorts.len();
        shorts.sort_unstable();
        shorts.dedup();
        assert_eq!(shorts.len(), total);
        for long in index.long_paths() {
            let short = index.short_path(long).unwrap();
            assert_eq!(index.long_path(short), Some(long));
        }
    }

    #[test]
    fn exhausted_short_names_fail_with_claims_so_far() {
        let root_class = Class::builder("Root")
            .members("parts", MemberSpec::new(&group()))
            .members("a", MemberSpec::new(&leaf()))
            .build();
        let root = finished(
            &root_class,
            &namespace! {
                parts__b = Namespace::new(),
                parts__a__items__b = Namespace::new(),
                a__b = Namespace::new(),
            },
        );
        let err = PathIndex::build(&root).unwrap_err();
        let message = err.to_string();
        assert!(
            matches!(err, Error::PathsExhausted { ref long_path, .. } if long_path == "a/b"),
            "{message}"
        );
        assert!(message.contains("a/b   ->   parts/a/items/b"), "{message}");
        assert!(message.contains("b   ->   parts/b"), "{message}");
    }

    proptest::proptest! {
        #[test]
        fn short_paths_form_a_bijection(
            members in proptest::collection::vec(("[abc]", "[abc]", proptest::bool::ANY), 0..12)
        ) {
            let mut config = Namespace::new();
            for (group, item, endpoint) in &members {
                if *endpoint {
                    config.set_path(&format!("endpoints__{item}"), Namespace::new());
                } else {
                    config.set_path(&format!("parts__{group}__items__{item}"), Namespace::new());
                }
            }
            let root = finished(&page(), &config);
            let index = PathIndex::build(&root).unwrap();
            for long in index.long_paths() {
                let short = index.short_path(long).unwrap();
                proptest::prop_assert_eq!(index.long_path(short), Some(long));
            }
            proptest::prop_assert_eq!(index.short_paths().count(), index.long_paths().count());
        }
    }

    #[test]
    fn long_path_joins_segments() {
        assert_eq!(build_long_path(&["fields", "name"]), "fields/name");
        assert_eq!(build_long_path::<&str>(&[]), "");
    }
}
