//! Compact (target, public) pairs.
//!
//! The resolver's inherited-library lists are sequences of a target
//! reference plus one bit saying whether the edge chain that reached it was
//! public all the way. [`TargetPublicPair`] packs both into a single `u32`
//! word: the target index shifted left by one, the public flag in bit zero.
//! With millions of edges in a large graph the halved footprint matters.
//!
//! [`TargetPublicPairListBuilder`] is the only way such a list is built. It
//! is keyed on the target alone, and appending a target that is already
//! present may *promote* its public flag from `false` to `true` but never
//! the other way. That one-way mutation is the single exception to the
//! otherwise frozen entries, and it is not observable through the key.

use indexmap::IndexMap;

use crate::graph::TargetId;

/// A `(target, is_public)` pair packed into one word.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetPublicPair(u32);

impl TargetPublicPair {
    const PUBLIC_BIT: u32 = 1;

    #[must_use]
    pub fn new(target: TargetId, is_public: bool) -> Self {
        let index = target.index() as u32;
        debug_assert!(index < (1 << 31), "target index overflows the packed pair");
        Self((index << 1) | u32::from(is_public))
    }

    #[must_use]
    pub fn target(self) -> TargetId {
        TargetId::from_index((self.0 >> 1) as usize)
    }

    #[must_use]
    pub fn is_public(self) -> bool {
        self.0 & Self::PUBLIC_BIT != 0
    }
}

impl std::fmt::Debug for TargetPublicPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TargetPublicPair")
            .field(&self.target())
            .field(&self.is_public())
            .finish()
    }
}

/// An ordered list of distinct targets with their public flags.
pub type TargetPublicPairList = Box<[TargetPublicPair]>;

/// Builds a [`TargetPublicPairList`], promoting public flags in place.
#[derive(Debug, Default)]
pub struct TargetPublicPairListBuilder {
    entries: IndexMap<TargetId, bool>,
}

impl TargetPublicPairListBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `(target, is_public)`. A target appended more than once keeps
    /// its first position; its flag becomes the OR of every appended flag.
    pub fn append(&mut self, target: TargetId, is_public: bool) {
        let flag = self.entries.entry(target).or_insert(false);
        *flag = *flag || is_public;
    }

    /// Append every pair from an already-built list. When `is_public` is
    /// false the incoming flags are forced private, mirroring propagation
    /// through a private edge.
    pub fn append_inherited(&mut self, pairs: &[TargetPublicPair], is_public: bool) {
        for pair in pairs {
            self.append(pair.target(), is_public && pair.is_public());
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Freeze the list in insertion order.
    #[must_use]
    pub fn build(self) -> TargetPublicPairList {
        self.entries
            .into_iter()
            .map(|(target, is_public)| TargetPublicPair::new(target, is_public))
            .collect()
    }
}
