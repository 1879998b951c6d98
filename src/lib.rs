//! Tagane core library.
//!
//! This library turns a fully resolved target graph into the per-target
//! data needed to emit build rules: the memoized dependency resolver, the
//! tool and toolchain model, and the deterministic manifest writers.

pub mod atom;
pub mod cli;
pub mod config_values;
pub mod graph;
pub mod label;
pub mod metadata;
pub mod ninja_gen;
pub mod resolved;
pub mod runner;
pub mod rust_project;
pub mod source_file;
pub mod target;
pub mod target_pair;
pub mod tools;
pub mod unique_vec;
pub mod worker_pool;
