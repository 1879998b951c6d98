//! Rule emission for Rust targets.
//!
//! One Rust target compiles to a single build line: the crate root is the
//! main input, every other source and every dependency artifact is an
//! explicit dep, and stamps of non-linkable deps are order-only. The
//! `externs` and `rustdeps` extras carry the compiler's view of the
//! dependency graph: `--extern` bindings honouring per-dependency aliases,
//! and `-L` search directories deduplicated in first-use order.

use std::fmt::Write as _;

use camino::Utf8PathBuf;

use crate::atom::Atom;
use crate::graph::TargetId;
use crate::resolved::ResolvedTargetData;
use crate::target::{OutputType, Target};
use crate::target_pair::TargetPublicPair;
use crate::unique_vec::UniqueVec;

use super::classify::{ClassifiedDeps, classify_deps};
use super::{dependency_output_file, join_paths, write_var};

/// One `--extern` binding: the crate is imported as `name`.
struct Extern {
    target: TargetId,
    name: Atom,
    path: Utf8PathBuf,
}

pub(super) fn write_rust_target(
    resolver: &mut ResolvedTargetData<'_>,
    id: TargetId,
    out: &mut String,
) {
    let graph = resolver.graph();
    let target = graph.target(id);
    let rust_values = target
        .rust_values
        .as_ref()
        .expect("rust writer requires rust values");
    let toolchain = graph.toolchain_for(target);
    let rust_tool = toolchain.rust_tool();

    let crate_type = rust_values.crate_type.resolve(target.output_type);
    let output_extension = rust_tool
        .and_then(crate::tools::Tool::as_rust)
        .map(|values| values.rustc_output_extension(target.output_type, rust_values.crate_type))
        .unwrap_or_default()
        .to_owned();
    let output_prefix = if crate_type.has_lib_prefix() { "lib" } else { "" };
    let rule = rust_tool.map_or("rustc", |tool| tool.name().as_str());

    let classified = classify_deps(resolver, id);
    let externs = collect_externs(resolver, id);
    let output_file = dependency_output_file(graph, id);

    // Crate vars.
    write_var(out, "crate_name", rust_values.crate_name.as_str());
    write_var(out, "crate_type", crate_type.as_rustc_str());
    write_var(out, "output_dir", target.output_dir.as_str());
    write_var(out, "rustc_output_extension", &output_extension);
    write_var(out, "rustc_output_prefix", output_prefix);
    write_var(
        out,
        "rustflags",
        &joined_config_values(target, |values| &values.rustflags),
    );
    write_var(
        out,
        "rustenv",
        &joined_config_values(target, |values| &values.rustenv),
    );
    write_var(out, "root_out_dir", ".");
    write_var(out, "target_out_dir", target.output_dir.as_str());
    write_var(out, "target_output_name", target.output_name.as_str());

    // Inputs from configs: none is elided, one is used directly, several
    // collapse into a synthesized stamp with its own build line.
    let inputs = target.aggregated_inputs();
    let build_dir = graph.settings().build_dir;
    let input_dep: Option<Utf8PathBuf> = match inputs.len() {
        0 => None,
        1 => Some(inputs[0].rebase_to(&build_dir)),
        _ => {
            let stamp = target
                .output_dir
                .join(format!("{}.inputs.stamp", target.output_name));
            let rebased = inputs.iter().map(|input| input.rebase_to(&build_dir));
            writeln!(out, "build {stamp}: stamp {}", join_paths(rebased)).expect("write stamp");
            Some(stamp)
        }
    };

    // Explicit deps: sources other than the crate root, then the root,
    // then objects forwarded from source sets, then dependency artifacts.
    let mut explicit: Vec<String> = target
        .sources
        .iter()
        .filter(|source| **source != rust_values.crate_root)
        .map(|source| source.rebase_to(&build_dir).into_string())
        .collect();
    explicit.push(rust_values.crate_root.rebase_to(&build_dir).into_string());
    for object in &classified.extra_object_files {
        explicit.push(object.clone().into_string());
    }
    for &dep in classified.linkable_deps.iter() {
        explicit.push(dependency_output_file(graph, dep).into_string());
    }
    if let Some(input) = input_dep {
        explicit.push(input.into_string());
    }

    let order_only: Vec<String> = classified
        .non_linkable_deps
        .iter()
        .map(|&dep| dependency_output_file(graph, dep).into_string())
        .collect();

    write!(
        out,
        "build {output_file}: {rule} {} | {}",
        rust_values.crate_root.rebase_to(&build_dir),
        explicit.join(" ")
    )
    .expect("write build line");
    if !order_only.is_empty() {
        write!(out, " || {}", order_only.join(" ")).expect("write build line");
    }
    out.push('\n');

    // Extras.
    if !externs.is_empty() {
        let rendered = externs
            .iter()
            .map(|binding| format!("--extern {}={}", binding.name, binding.path))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out, "  externs = {rendered}").expect("write externs");
    }
    let search_dirs = collect_search_dirs(resolver, &externs, &classified);
    if !search_dirs.is_empty() {
        writeln!(out, "  rustdeps = {}", search_dirs.join(" ")).expect("write rustdeps");
    }
    writeln!(out, "  edition = {}", rust_values.edition).expect("write edition");
    out.push('\n');
}

/// The union of one config-values list across the target's configs.
fn joined_config_values<'t>(
    target: &'t Target,
    field: impl Fn(&'t crate::config_values::ConfigValues) -> &'t Vec<String>,
) -> String {
    let mut values = UniqueVec::new();
    for config in target.config_values_iter() {
        values.append_all(field(config).iter().cloned());
    }
    values.release().join(" ")
}

fn is_rust_crate(target: &Target) -> bool {
    matches!(
        target.output_type,
        OutputType::RustLibrary | OutputType::RustProcMacro
    )
}

fn extern_name(consumer: &Target, dep: &Target) -> Atom {
    let consumer_rust = consumer
        .rust_values
        .as_ref()
        .expect("rust writer requires rust values");
    if let Some(alias) = consumer_rust.aliased_deps.get(&dep.label) {
        return *alias;
    }
    dep.rust_values
        .as_ref()
        .map_or_else(|| dep.label.name(), |values| values.crate_name)
}

/// Collect `--extern` bindings in deterministic order: each direct Rust
/// dependency (with its alias applied), followed by the transitive crates
/// reachable through it. Crates reached only through an aliased direct dep
/// are not re-emitted: the alias rebinds the whole subtree.
fn collect_externs(resolver: &mut ResolvedTargetData<'_>, id: TargetId) -> Vec<Extern> {
    let graph = resolver.graph();
    let target = graph.target(id);
    let rust_values = target
        .rust_values
        .as_ref()
        .expect("rust writer requires rust values");

    let mut seen: UniqueVec<TargetId> = UniqueVec::new();
    let mut externs = Vec::new();
    let direct: Vec<TargetId> = target
        .public_deps
        .iter()
        .chain(target.private_deps.iter())
        .copied()
        .collect();

    for dep in direct {
        let dep_target = graph.target(dep);
        if is_rust_crate(dep_target) && seen.append(dep) {
            externs.push(Extern {
                target: dep,
                name: extern_name(target, dep_target),
                path: dependency_output_file(graph, dep),
            });
        }

        let forwards_rust_libs = matches!(
            dep_target.output_type,
            OutputType::StaticLibrary
                | OutputType::SharedLibrary
                | OutputType::SourceSet
                | OutputType::RustLibrary
                | OutputType::Group
        );
        if rust_values.aliased_deps.contains_key(&dep_target.label) || !forwards_rust_libs {
            continue;
        }
        let inheritable: Vec<TargetPublicPair> = resolver.rust_inheritable_libs(dep).to_vec();
        for pair in inheritable {
            let transitive = graph.target(pair.target());
            if is_rust_crate(transitive) && seen.append(pair.target()) {
                externs.push(Extern {
                    target: pair.target(),
                    name: extern_name(target, transitive),
                    path: dependency_output_file(graph, pair.target()),
                });
            }
        }
    }
    externs
}

/// `-Ldependency=` directories for Rust library deps and `-Lnative=` for
/// non-Rust linkable deps, deduplicated in first-use order. Proc macros
/// never contribute a search path.
fn collect_search_dirs(
    resolver: &ResolvedTargetData<'_>,
    externs: &[Extern],
    classified: &ClassifiedDeps,
) -> Vec<String> {
    let graph = resolver.graph();
    let mut dirs: UniqueVec<String> = UniqueVec::new();
    for binding in externs {
        let dep_target = graph.target(binding.target);
        if dep_target.output_type == OutputType::RustLibrary {
            dirs.append(format!("-Ldependency={}", dep_target.output_dir));
        }
    }
    for &dep in classified.linkable_deps.iter() {
        let dep_target = graph.target(dep);
        if dep_target.rust_values.is_some() {
            if dep_target.output_type == OutputType::RustLibrary {
                dirs.append(format!("-Ldependency={}", dep_target.output_dir));
            }
        } else {
            dirs.append(format!("-Lnative={}", dep_target.output_dir));
        }
    }
    dirs.release().into_vec()
}
