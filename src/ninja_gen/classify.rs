//! Dependency classification for the writers.
//!
//! Before a build line is emitted, every dependency of the target (direct
//! deps, the resolver's inherited libraries, and data deps) is sorted into
//! one of three buckets: linkable (its artifact is an input of the link),
//! non-linkable (only its stamp orders the build), or object-forwarding
//! (a source set whose objects are linked directly into the consumer).
//! The buckets are [`crate::unique_vec::UniqueVec`]s, so a target reached
//! both directly and through inheritance is emitted once, at its first
//! position.

use camino::Utf8PathBuf;

use crate::graph::{BuildGraph, TargetId};
use crate::resolved::ResolvedTargetData;
use crate::target::{OutputType, Target};
use crate::target_pair::TargetPublicPair;
use crate::unique_vec::UniqueVec;

use super::object_files_of;

/// The classified dependencies of one target.
#[derive(Debug, Default)]
pub struct ClassifiedDeps {
    /// Object files forwarded from source sets (and incomplete static libs
    /// under a complete archive), in first-reached order.
    pub extra_object_files: Vec<Utf8PathBuf>,
    pub linkable_deps: UniqueVec<TargetId>,
    pub non_linkable_deps: UniqueVec<TargetId>,
}

/// Classify every dependency the emitted rule must mention.
///
/// Direct deps come first in declaration order (public then private), then
/// the inherited libraries in resolver order, then data deps, which are
/// non-linkable unconditionally.
#[must_use]
pub fn classify_deps(resolver: &mut ResolvedTargetData<'_>, id: TargetId) -> ClassifiedDeps {
    let graph = resolver.graph();
    let target = graph.target(id);
    let mut classified = ClassifiedDeps::default();

    let direct: Vec<TargetId> = target
        .public_deps
        .iter()
        .chain(target.private_deps.iter())
        .copied()
        .collect();
    for dep in direct {
        classify_one(graph, target, dep, &mut classified);
    }

    let inherited: Vec<TargetPublicPair> = if super::is_rust_target(target) {
        resolver.rust_transitive_inherited_libs(id).to_vec()
    } else {
        resolver.inherited_libraries(id).to_vec()
    };
    for pair in inherited {
        classify_one(graph, target, pair.target(), &mut classified);
    }

    for &dep in &target.data_deps {
        classified.non_linkable_deps.append(dep);
    }

    classified
}

fn classify_one(
    graph: &BuildGraph,
    target: &Target,
    dep: TargetId,
    classified: &mut ClassifiedDeps,
) {
    let dep_target = graph.target(dep);
    let can_link = target.is_final();

    if dep_target.is_source_set()
        || (target.complete_static_lib
            && dep_target.output_type == OutputType::StaticLibrary
            && !dep_target.complete_static_lib)
    {
        // The dep's object files are linked in directly; its stamp still
        // orders compilation.
        let fresh = classified.non_linkable_deps.append(dep);
        if can_link && fresh {
            classified
                .extra_object_files
                .extend(object_files_of(dep_target));
        }
    } else if target.output_type == OutputType::RustLibrary && dep_target.is_linkable() {
        classified.linkable_deps.append(dep);
    } else if target.complete_static_lib && dep_target.is_final() {
        classified.non_linkable_deps.append(dep);
    } else if can_link && dep_target.is_linkable() {
        classified.linkable_deps.append(dep);
    } else {
        classified.non_linkable_deps.append(dep);
    }
}
