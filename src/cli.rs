//! Command line interface definition using clap.
//!
//! This module defines the [`Cli`] structure and its subcommands. Both
//! subcommands operate on a build directory that holds the front end's
//! serialised graph (`graph.json` by default).

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// A meta-build-system back end: turns resolved target graphs into build
/// rules for a Ninja-compatible executor.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose diagnostic logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate build rules for a resolved target graph.
    Gen(GenArgs),
    /// Collect metadata values declared across the graph.
    Meta(MetaArgs),
}

#[derive(Debug, Args)]
pub struct GenArgs {
    /// Build directory; the graph file is read from here and the emitted
    /// manifest lands here.
    pub out_dir: Utf8PathBuf,

    /// Path to the serialised graph (defaults to `<out_dir>/graph.json`).
    #[arg(long, value_name = "FILE")]
    pub graph_file: Option<Utf8PathBuf>,

    /// Also emit `rust-project.json` for rust-analyzer.
    #[arg(long)]
    pub rust_project: bool,

    /// Number of parallel writer jobs (defaults to the CPU count).
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,
}

#[derive(Debug, Args)]
pub struct MetaArgs {
    /// Build directory holding the serialised graph.
    pub out_dir: Utf8PathBuf,

    /// Labels of the targets to start the walk from.
    #[arg(required = true, value_name = "TARGET")]
    pub targets: Vec<String>,

    /// Metadata keys whose values are collected.
    #[arg(
        long = "data",
        value_name = "KEY",
        value_delimiter = ',',
        required = true
    )]
    pub data: Vec<String>,

    /// Metadata keys that name the targets to walk into.
    #[arg(long = "walk", value_name = "KEY", value_delimiter = ',')]
    pub walk: Vec<String>,

    /// Rewrite collected file paths relative to the build directory.
    #[arg(long)]
    pub rebase_files: bool,

    /// Path to the serialised graph (defaults to `<out_dir>/graph.json`).
    #[arg(long, value_name = "FILE")]
    pub graph_file: Option<Utf8PathBuf>,
}
