//! Build-manifest generation.
//!
//! This module turns a resolved target graph into the textual manifest
//! consumed by the downstream build executor. Each target renders to one
//! self-contained block; blocks are concatenated in label order so the
//! output is byte-for-byte deterministic for a fixed graph, no matter how
//! many workers rendered it.

mod classify;
mod link;
mod rust;
mod stamp;

pub use classify::{ClassifiedDeps, classify_deps};

use std::fmt::Write as _;
use std::io;
use std::path::Path;

use camino::Utf8PathBuf;
use itertools::Itertools;
use tracing::debug;

use crate::graph::{BuildGraph, TargetId};
use crate::resolved::ResolvedTargetData;
use crate::source_file::SourceKind;
use crate::target::{OutputType, Target};
use crate::tools::{Substitution, Tool};

/// Render the whole graph with a single resolver.
#[must_use]
pub fn generate(graph: &BuildGraph) -> String {
    let mut resolver = ResolvedTargetData::new(graph);
    let mut out = rule_prologue(graph);
    for id in graph.ids_in_label_order() {
        out.push_str(&render_target(&mut resolver, id));
    }
    out
}

/// Render the whole graph across a fixed-size worker pool.
///
/// Targets are split into contiguous label-ordered chunks; each worker
/// renders its chunks with a private resolver into a local buffer, and the
/// driver concatenates the buffers back in chunk order. The result is
/// byte-identical to [`generate`].
#[must_use]
pub fn generate_parallel(graph: &std::sync::Arc<BuildGraph>, jobs: usize) -> String {
    let ids = graph.ids_in_label_order();
    if ids.is_empty() {
        return rule_prologue(graph);
    }
    let jobs = jobs.max(1);
    let chunk_size = ids.len().div_ceil(jobs * 4).max(1);
    let chunks: Vec<Vec<TargetId>> = ids.chunks(chunk_size).map(<[TargetId]>::to_vec).collect();
    let chunk_count = chunks.len();

    let (sender, receiver) = std::sync::mpsc::channel::<(usize, String)>();
    let pool = crate::worker_pool::WorkerPool::new(jobs);
    for (index, chunk) in chunks.into_iter().enumerate() {
        let graph = std::sync::Arc::clone(graph);
        let sender = sender.clone();
        pool.post(move || {
            let mut resolver = ResolvedTargetData::new(&graph);
            let mut buffer = String::new();
            for &id in &chunk {
                buffer.push_str(&render_target(&mut resolver, id));
            }
            let _ = sender.send((index, buffer));
        });
    }
    drop(sender);

    let mut buffers: Vec<(usize, String)> = receiver.iter().take(chunk_count).collect();
    buffers.sort_by_key(|(index, _)| *index);

    let mut out = rule_prologue(graph);
    for (_, buffer) in buffers {
        out.push_str(&buffer);
    }
    out
}

/// Render one target's block. Workers call this with their own resolver;
/// the driver concatenates the blocks in label order.
#[must_use]
pub fn render_target(resolver: &mut ResolvedTargetData<'_>, id: TargetId) -> String {
    let graph = resolver.graph();
    let target = graph.target(id);
    let mut out = String::new();
    if is_rust_target(target) {
        rust::write_rust_target(resolver, id, &mut out);
    } else if target.is_source_set() {
        stamp::write_source_set(resolver, id, &mut out);
    } else if target.is_binary() && target.is_final()
        || target.output_type == OutputType::StaticLibrary
    {
        link::write_link_target(resolver, id, &mut out);
    } else if target.output_type != OutputType::Unknown {
        stamp::write_group_like(resolver, id, &mut out);
    }
    out
}

/// A target rendered by the Rust writer: it compiles Rust sources and has a
/// Rust values block.
fn is_rust_target(target: &Target) -> bool {
    target.rust_values.is_some()
        && target.is_binary()
        && target.source_kinds_used.rust_source_used()
}

/// Emit the `rule` blocks for every tool of every toolchain, converting
/// substitution placeholders to the executor's `${var}` references.
#[must_use]
pub fn rule_prologue(graph: &BuildGraph) -> String {
    let mut out = String::new();
    for index in 0..graph.toolchain_count() {
        let toolchain = graph.toolchain(crate::graph::ToolchainId::from_index(index));
        for tool in toolchain.tools() {
            let Some(command) = tool.command() else {
                // The built-in phony tool is provided by the executor.
                continue;
            };
            let rule_name = rule_name(index, tool);
            writeln!(out, "rule {rule_name}").expect("write rule");
            let mut command_line = String::new();
            if !tool.command_launcher().is_empty() {
                command_line.push_str(tool.command_launcher());
                command_line.push(' ');
            }
            command_line.push_str(&command.expand(substitution_var));
            writeln!(out, "  command = {command_line}").expect("write rule");
            if let Some(description) = tool.description() {
                writeln!(
                    out,
                    "  description = {}",
                    description.expand(substitution_var)
                )
                .expect("write rule");
            }
            out.push('\n');
        }
    }
    out
}

/// Rule names are plain for the default toolchain and prefixed for the
/// rest, so two toolchains can define the same tool without colliding.
fn rule_name(toolchain_index: usize, tool: &Tool) -> String {
    if toolchain_index == 0 {
        tool.name().as_str().to_owned()
    } else {
        format!("tc{toolchain_index}_{}", tool.name())
    }
}

fn substitution_var(token: Substitution) -> Option<String> {
    Some(match token {
        Substitution::Source => "${in}".to_owned(),
        Substitution::Output => "${out}".to_owned(),
        other => format!("${{{}}}", other.name()),
    })
}

/// The file dependents wait on for `target`: its linked artifact for
/// binary targets, its stamp otherwise.
#[must_use]
pub fn dependency_output_file(graph: &BuildGraph, id: TargetId) -> Utf8PathBuf {
    let target = graph.target(id);
    if is_rust_target(target) {
        return rust_output_file(graph, target);
    }
    match target.output_type {
        OutputType::Executable => linked_output_file(graph, target, "link", "", ""),
        OutputType::StaticLibrary => linked_output_file(graph, target, "alink", "lib", ".a"),
        OutputType::SharedLibrary | OutputType::LoadableModule => {
            linked_output_file(graph, target, "solink", "lib", ".so")
        }
        _ => stamp_file(target),
    }
}

fn linked_output_file(
    graph: &BuildGraph,
    target: &Target,
    tool_name: &str,
    fallback_prefix: &str,
    fallback_extension: &str,
) -> Utf8PathBuf {
    let (prefix, extension) = graph
        .toolchain_for(target)
        .named_tool(tool_name)
        .map_or((fallback_prefix, fallback_extension), |tool| {
            (tool.output_prefix(), tool.default_output_extension())
        });
    target
        .output_dir
        .join(format!("{prefix}{}{extension}", target.output_name))
}

fn rust_output_file(graph: &BuildGraph, target: &Target) -> Utf8PathBuf {
    let rust_values = target
        .rust_values
        .as_ref()
        .expect("rust target has rust values");
    let crate_type = rust_values.crate_type.resolve(target.output_type);
    let extension = graph
        .toolchain_for(target)
        .rust_tool()
        .and_then(Tool::as_rust)
        .map(|values| {
            values
                .rustc_output_extension(target.output_type, rust_values.crate_type)
                .to_owned()
        })
        .unwrap_or_default();
    let prefix = if crate_type.has_lib_prefix() { "lib" } else { "" };
    target
        .output_dir
        .join(format!("{prefix}{}{extension}", target.output_name))
}

/// The sentinel file recording that a non-artifact target's dependencies
/// are satisfied.
#[must_use]
pub fn stamp_file(target: &Target) -> Utf8PathBuf {
    target
        .output_dir
        .join(format!("{}.stamp", target.output_name))
}

/// Emit one `name = value` variable line, with no trailing space when the
/// value is empty.
fn write_var(out: &mut String, name: &str, value: &str) {
    if value.is_empty() {
        writeln!(out, "{name} =").expect("write var");
    } else {
        writeln!(out, "{name} = {value}").expect("write var");
    }
}

/// Join paths with single spaces for a build line section.
fn join_paths<I>(paths: I) -> String
where
    I: IntoIterator,
    I::Item: std::fmt::Display,
{
    paths.into_iter().map(|path| path.to_string()).join(" ")
}

/// Object files a compiled source contributes, used when a source set's
/// objects are forwarded into a linking consumer.
fn object_files_of(target: &Target) -> Vec<Utf8PathBuf> {
    let mut objects = Vec::new();
    for source in &target.sources {
        match source.kind() {
            SourceKind::Cpp | SourceKind::C | SourceKind::M | SourceKind::Mm | SourceKind::S => {
                objects.push(target.output_dir.join(format!("{}.o", source.name_part())));
            }
            SourceKind::O => {
                // Pre-built objects pass through as-is.
                objects.push(Utf8PathBuf::from(source.as_str().trim_start_matches("//")));
            }
            _ => {}
        }
    }
    objects
}

/// Write `contents` to `path` unless the file already holds those exact
/// bytes; equality skips the write so the file's mtime is untouched.
///
/// Returns `true` when the file was written.
///
/// # Errors
///
/// Propagates any I/O failure from the final write.
pub fn write_if_changed(path: &Path, contents: &str) -> io::Result<bool> {
    match std::fs::read(path) {
        Ok(existing) if existing == contents.as_bytes() => {
            debug!(path = %path.display(), "manifest unchanged, skipping write");
            return Ok(false);
        }
        _ => {}
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    debug!(path = %path.display(), "manifest written");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_if_changed_skips_equal_contents() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("build.tagane");
        assert!(write_if_changed(&path, "hello\n").expect("first write"));
        assert!(!write_if_changed(&path, "hello\n").expect("second write"));
        assert!(write_if_changed(&path, "changed\n").expect("third write"));
    }
}
