// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reordering member collections by their `after` attribute.

use std::collections::{BTreeMap, VecDeque};

use indexmap::IndexMap;
use understory_namespace::{Marker, Value};

use crate::error::{Error, Result};

/// Where an entry asks to be placed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum After {
    /// Keep declaration order.
    Unmoved,
    /// Place at this position among the final entries.
    Index(i64),
    /// Place right after the named entry (`"name"` or `">name"`).
    Name(String),
    /// Place right before the named entry (`"<name"`).
    Before(String),
    /// Place after everything else.
    Last,
}

impl After {
    /// Interpret an `after` attribute value.
    ///
    /// `name` is only used in the error for unsupported values.
    pub fn from_value(name: &str, value: &Value) -> Result<Self> {
        Ok(match value {
            Value::Null => Self::Unmoved,
            Value::Int(i) => Self::Index(*i),
            Value::Marker(Marker::Last) => Self::Last,
            Value::Str(s) => {
                if let Some(rest) = s.strip_prefix('>') {
                    Self::Name(rest.to_owned())
                } else if let Some(rest) = s.strip_prefix('<') {
                    Self::Before(rest.to_owned())
                } else {
                    Self::Name(s.clone())
                }
            }
            other => {
                return Err(Error::InvalidAfter {
                    name: name.to_owned(),
                    found: format!("{other:?}"),
                });
            }
        })
    }
}

struct Sorter<V> {
    by_name: BTreeMap<String, Vec<(String, V)>>,
    before_name: BTreeMap<String, Vec<(String, V)>>,
    out: Vec<(String, V)>,
}

impl<V> Sorter<V> {
    fn place(&mut self, entry: (String, V)) {
        for before in self.before_name.remove(&entry.0).unwrap_or_default() {
            self.place(before);
        }
        let key = entry.0.clone();
        self.out.push(entry);
        for after in self.by_name.remove(&key).unwrap_or_default() {
            self.place(after);
        }
    }
}

/// Reorder `entries` according to the placement each one asks for.
///
/// Entries that do not move keep declaration order. Index placements are
/// honored in ascending order once that many entries have been emitted;
/// named placements follow (or precede) their anchor, recursively; `Last`
/// entries go at the end. Referencing a name that is not in the collection
/// is an error listing the available names.
pub fn sort_after<V>(
    entries: IndexMap<String, V>,
    mut after: impl FnMut(&str, &V) -> Result<After>,
) -> Result<IndexMap<String, V>> {
    let mut unmoved = VecDeque::new();
    let mut by_index: Vec<(i64, (String, V))> = Vec::new();
    let mut last = Vec::new();
    let mut sorter = Sorter {
        by_name: BTreeMap::new(),
        before_name: BTreeMap::new(),
        out: Vec::with_capacity(entries.len()),
    };
    let available: Vec<String> = {
        let mut names: Vec<String> = entries.keys().cloned().collect();
        names.sort();
        names
    };
    let total = entries.len();

    for (name, value) in entries {
        match after(&name, &value)? {
            After::Unmoved => unmoved.push_back((name, value)),
            After::Index(i) => by_index.push((i, (name, value))),
            After::Last => last.push((name, value)),
            After::Name(anchor) => sorter
                .by_name
                .entry(anchor)
                .or_default()
                .push((name, value)),
            After::Before(anchor) => sorter
                .before_name
                .entry(anchor)
                .or_default()
                .push((name, value)),
        }
    }

    if unmoved.len() == total {
        return Ok(unmoved.into_iter().collect());
    }

    // Stable, so equal indexes keep declaration order.
    by_index.sort_by_key(|(i, _)| *i);
    let mut by_index: VecDeque<_> = by_index.into();

    while !unmoved.is_empty() || !by_index.is_empty() {
        while let Some((position, _)) = by_index.front() {
            let emitted = i64::try_from(sorter.out.len()).unwrap_or(i64::MAX);
            if !unmoved.is_empty() && emitted < *position {
                break;
            }
            if let Some((_, entry)) = by_index.pop_front() {
                sorter.place(entry);
            }
        }
        if let Some(entry) = unmoved.pop_front() {
            sorter.place(entry);
        }
    }
    for entry in last {
        sorter.place(entry);
    }

    if !sorter.by_name.is_empty() {
        return Err(Error::SortAfter {
            direction: "after",
            missing: sorter.by_name.into_keys().collect(),
            available,
        });
    }
    if !sorter.before_name.is_empty() {
        return Err(Error::SortAfter {
            direction: "before",
            missing: sorter.before_name.into_keys().collect(),
            available,
        });
    }
    Ok(sorter.out.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use understory_namespace::LAST;

    fn sorted(entries: &[(&str, Value)]) -> Result<Vec<String>> {
        let map: IndexMap<String, Value> = entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect();
        let out = sort_after(map, After::from_value)?;
        Ok(out.into_keys().collect())
    }

    #[test]
    fn index_zero_moves_to_front() {
        let order = sorted(&[("a", Value::Null), ("b", Value::Null), ("c", Value::Int(0))]).unwrap();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn untouched_order_is_kept() {
        let order = sorted(&[("x", Value::Null), ("y", Value::Null)]).unwrap();
        assert_eq!(order, vec!["x", "y"]);
    }

    #[test]
    fn after_and_before_names() {
        let order = sorted(&[
            ("a", Value::Null),
            ("b", Value::Null),
            ("c", Value::from("a")),
            ("d", Value::from("<a")),
            ("e", Value::from(">c")),
        ])
        .unwrap();
        assert_eq!(order, vec!["d", "a", "c", "e", "b"]);
    }

    #[test]
    fn last_goes_last() {
        let order = sorted(&[("a", LAST), ("b", Value::Null), ("c", Value::Null)]).unwrap();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn index_beyond_end_is_appended() {
        let order = sorted(&[("a", Value::Int(10)), ("b", Value::Null), ("c", Value::Int(1))]).unwrap();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn missing_anchor_lists_available() {
        let err = sorted(&[("a", Value::Null), ("b", Value::from("nope"))]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Tried to order after nope but that key does not exist.\nAvailable names:\n    a\n    b"
        );
        let err = sorted(&[("a", Value::from("<x")), ("b", Value::from("<y"))]).unwrap_err();
        assert!(err.to_string().starts_with("Tried to order before x, y but those keys do"));
    }

    #[test]
    fn unsupported_after_value() {
        let err = sorted(&[("a", Value::Bool(true))]).unwrap_err();
        assert!(matches!(err, Error::InvalidAfter { .. }));
    }
}
