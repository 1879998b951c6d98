//! Views over a target's direct dependency edges.

use crate::graph::TargetId;
use crate::target::Target;

/// The three direct-dependency edge classes of one target, plus the
/// combined linked list (public then private, in declaration order) that
/// the resolver traverses.
#[derive(Debug)]
pub struct ResolvedTargetDeps<'a> {
    public: &'a [TargetId],
    private: &'a [TargetId],
    data: &'a [TargetId],
    linked: Box<[TargetId]>,
}

impl<'a> ResolvedTargetDeps<'a> {
    #[must_use]
    pub fn new(target: &'a Target) -> Self {
        let linked = target
            .public_deps
            .iter()
            .chain(target.private_deps.iter())
            .copied()
            .collect();
        Self {
            public: &target.public_deps,
            private: &target.private_deps,
            data: &target.data_deps,
            linked,
        }
    }

    #[must_use]
    pub fn public_deps(&self) -> &'a [TargetId] {
        self.public
    }

    #[must_use]
    pub fn private_deps(&self) -> &'a [TargetId] {
        self.private
    }

    #[must_use]
    pub fn data_deps(&self) -> &'a [TargetId] {
        self.data
    }

    /// Public followed by private deps; data deps never participate in
    /// link-time propagation.
    #[must_use]
    pub fn linked_deps(&self) -> &[TargetId] {
        &self.linked
    }
}
