//! Rule emission for non-Rust linkable targets.
//!
//! Executables, static archives and shared libraries link their own object
//! files, the objects forwarded from source sets, and the artifacts of
//! linkable deps. Library and framework flags come from the resolver so
//! their order matches the propagation rules exactly.

use std::fmt::Write as _;

use crate::config_values::LibFile;
use crate::graph::TargetId;
use crate::resolved::ResolvedTargetData;
use crate::source_file::SourceDir;
use crate::target::OutputType;

use super::classify::classify_deps;
use super::{dependency_output_file, join_paths, object_files_of, write_var};

pub(super) fn write_link_target(
    resolver: &mut ResolvedTargetData<'_>,
    id: TargetId,
    out: &mut String,
) {
    let graph = resolver.graph();
    let target = graph.target(id);
    let classified = classify_deps(resolver, id);

    let rule = match target.output_type {
        OutputType::StaticLibrary => "alink",
        OutputType::SharedLibrary | OutputType::LoadableModule => "solink",
        _ => "link",
    };

    write_var(out, "target_out_dir", target.output_dir.as_str());
    write_var(out, "target_output_name", target.output_name.as_str());

    // Link flags, only when the target actually links.
    if target.is_final() {
        let lib_dirs: Vec<SourceDir> = resolver.all_lib_dirs(id).to_vec();
        let libs: Vec<LibFile> = resolver.all_libs(id).to_vec();
        if !lib_dirs.is_empty() {
            write_var(out, "lib_dirs", &join_paths(lib_dirs.iter()));
        }
        if !libs.is_empty() {
            write_var(out, "libs", &join_paths(libs.iter()));
        }
        let frameworks: Vec<String> = resolver.all_frameworks(id).to_vec();
        let weak_frameworks: Vec<String> = resolver.all_weak_frameworks(id).to_vec();
        if !frameworks.is_empty() {
            write_var(out, "frameworks", &frameworks.join(" "));
        }
        if !weak_frameworks.is_empty() {
            write_var(out, "weak_frameworks", &weak_frameworks.join(" "));
        }
    }

    let mut inputs: Vec<String> = object_files_of(target)
        .into_iter()
        .map(camino::Utf8PathBuf::into_string)
        .collect();
    inputs.extend(
        classified
            .extra_object_files
            .iter()
            .map(|object| object.clone().into_string()),
    );
    for &dep in classified.linkable_deps.iter() {
        inputs.push(dependency_output_file(graph, dep).into_string());
    }

    let order_only: Vec<String> = classified
        .non_linkable_deps
        .iter()
        .map(|&dep| dependency_output_file(graph, dep).into_string())
        .collect();

    write!(
        out,
        "build {}: {rule}",
        dependency_output_file(graph, id)
    )
    .expect("write build line");
    if !inputs.is_empty() {
        write!(out, " {}", inputs.join(" ")).expect("write build line");
    }
    if !order_only.is_empty() {
        write!(out, " || {}", order_only.join(" ")).expect("write build line");
    }
    out.push_str("\n\n");
}
