//! CLI execution and command dispatch logic.
//!
//! This module keeps `main` minimal by providing a single entry point that
//! loads the serialised graph, drives the writers (in parallel for `gen`),
//! and reports the first error with full diagnostic context.

use std::sync::Arc;

use camino::Utf8PathBuf;
use miette::{Context, IntoDiagnostic, Report, Result};
use tracing::{debug, info};

use crate::cli::{Cli, Commands, GenArgs, MetaArgs};
use crate::graph::{self, BuildGraph, TargetId};
use crate::label::Label;
use crate::metadata::{self, MetadataWalk};
use crate::{ninja_gen, rust_project};

/// The default name of the serialised graph inside the build directory.
pub const GRAPH_FILE_NAME: &str = "graph.json";
/// The name of the emitted build manifest.
pub const MANIFEST_FILE_NAME: &str = "build.tagane";
/// The name of the emitted rust-analyzer project file.
pub const RUST_PROJECT_FILE_NAME: &str = "rust-project.json";

/// Execute the parsed command line.
///
/// # Errors
///
/// Returns the first error encountered; `main` renders it and exits 1.
pub fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Gen(args) => run_gen(args),
        Commands::Meta(args) => run_meta(args),
    }
}

fn load_graph(out_dir: &Utf8PathBuf, graph_file: Option<&Utf8PathBuf>) -> Result<BuildGraph> {
    let path = graph_file
        .cloned()
        .unwrap_or_else(|| out_dir.join(GRAPH_FILE_NAME));
    debug!(%path, "loading graph");
    graph::from_file(&path).map_err(Report::new)
}

fn run_gen(args: &GenArgs) -> Result<()> {
    let graph = Arc::new(load_graph(&args.out_dir, args.graph_file.as_ref())?);
    let jobs = args.jobs.unwrap_or_else(|| {
        std::thread::available_parallelism().map_or(1, std::num::NonZero::get)
    });

    let manifest = ninja_gen::generate_parallel(&graph, jobs);
    let manifest_path = args.out_dir.join(MANIFEST_FILE_NAME);
    let written = ninja_gen::write_if_changed(manifest_path.as_std_path(), &manifest)
        .into_diagnostic()
        .wrap_err_with(|| format!("could not write {manifest_path}"))?;
    info!(
        path = %manifest_path,
        targets = graph.len(),
        written,
        "build manifest generated"
    );

    if args.rust_project {
        let project_path = args.out_dir.join(RUST_PROJECT_FILE_NAME);
        rust_project::write_project_file(&graph, project_path.as_std_path())
            .into_diagnostic()
            .wrap_err_with(|| format!("could not write {project_path}"))?;
        info!(path = %project_path, "rust project emitted");
    }
    Ok(())
}

fn run_meta(args: &MetaArgs) -> Result<()> {
    let graph = load_graph(&args.out_dir, args.graph_file.as_ref())?;
    let entries = resolve_entry_targets(&graph, &args.targets)?;

    let walk = MetadataWalk {
        data_keys: args.data.clone(),
        walk_keys: args.walk.clone(),
        rebase_dir: args.rebase_files.then(|| graph.settings().build_dir),
    };
    let result = metadata::collect_metadata(&graph, &entries, &walk).map_err(Report::new)?;
    debug!(
        visited = result.visited.len(),
        values = result.values.len(),
        "metadata walk complete"
    );

    for value in &result.values {
        match value.as_str() {
            Some(text) => println!("{text}"),
            None => println!("{value}"),
        }
    }
    Ok(())
}

fn resolve_entry_targets(graph: &BuildGraph, names: &[String]) -> Result<Vec<TargetId>> {
    names
        .iter()
        .map(|name| {
            let label = Label::parse(name).ok_or_else(|| {
                miette::miette!(
                    code = "tagane::runner::bad_label",
                    help = "labels look like //dir:name",
                    "\"{name}\" is not a target label"
                )
            })?;
            graph.lookup(&label).ok_or_else(|| {
                miette::miette!(
                    code = "tagane::runner::unknown_target",
                    help = "the label must match a target in the graph file",
                    "unknown target {label}"
                )
            })
        })
        .collect()
}
