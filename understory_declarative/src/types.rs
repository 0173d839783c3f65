// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for bound trees: node identifiers and collection flags.

/// Identifier for a node in a [`BoundTree`](crate::BoundTree).
///
/// This is a small, copyable handle made of a slot index and a generation
/// counter.
///
/// ## Semantics
///
/// - On bind, a fresh slot is allocated with generation `1`.
/// - When a node is excluded after it was allocated (its `include` turned
///   false in `on_bind`), the slot is freed; any `NodeId` that pointed to it
///   is now stale.
/// - On reuse of a freed slot, its generation is incremented, producing a
///   new, distinct `NodeId`.
///
/// Stale `NodeId`s never alias a different live node because the generation
/// must match. Use [`BoundTree::is_alive`](crate::BoundTree::is_alive) to check.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// Flags controlling how a member collection is collected and addressed.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct CollectionFlags: u8 {
        /// Keep entries that are neither components nor configuration as
        /// plain values instead of rejecting them.
        const FALL_THROUGH = 0b0000_0001;
        /// Visit this collection after the others when assigning short
        /// paths, so user-named members claim names first.
        const VISIT_LAST   = 0b0000_0010;
    }
}
