//! Stamp emission for targets with no linked artifact.
//!
//! Source sets stamp over their sources; groups, actions, copies, bundles
//! and generated files stamp over their dependencies' output files. A
//! stamp is what consumers reference when the target itself produces
//! nothing linkable.

use std::fmt::Write as _;

use crate::graph::TargetId;
use crate::resolved::ResolvedTargetData;
use crate::tools::TOOL_STAMP;
use crate::unique_vec::UniqueVec;

use super::classify::classify_deps;
use super::{dependency_output_file, join_paths, stamp_file};

pub(super) fn write_source_set(
    resolver: &mut ResolvedTargetData<'_>,
    id: TargetId,
    out: &mut String,
) {
    let graph = resolver.graph();
    let target = graph.target(id);
    let build_dir = graph.settings().build_dir;
    let classified = classify_deps(resolver, id);

    let sources = join_paths(
        target
            .sources
            .iter()
            .map(|source| source.rebase_to(&build_dir)),
    );
    write!(out, "build {}: {TOOL_STAMP}", stamp_file(target)).expect("write stamp");
    if !sources.is_empty() {
        write!(out, " {sources}").expect("write stamp");
    }
    let order_only: Vec<String> = classified
        .non_linkable_deps
        .iter()
        .map(|&dep| dependency_output_file(graph, dep).into_string())
        .collect();
    if !order_only.is_empty() {
        write!(out, " || {}", order_only.join(" ")).expect("write stamp");
    }
    out.push_str("\n\n");
}

pub(super) fn write_group_like(
    resolver: &mut ResolvedTargetData<'_>,
    id: TargetId,
    out: &mut String,
) {
    let graph = resolver.graph();
    let target = graph.target(id);

    let mut files: UniqueVec<String> = UniqueVec::new();
    for &dep in target
        .public_deps
        .iter()
        .chain(target.private_deps.iter())
        .chain(target.data_deps.iter())
    {
        files.append(dependency_output_file(graph, dep).into_string());
    }

    write!(out, "build {}: {TOOL_STAMP}", stamp_file(target)).expect("write stamp");
    if !files.is_empty() {
        write!(out, " {}", files.release().join(" ")).expect("write stamp");
    }
    out.push_str("\n\n");
}
