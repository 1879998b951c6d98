//! Test-support crate for Tagane.
//!
//! This crate provides graph and toolchain fixtures for tests: a
//! [`TestGraph`] builder that constructs targets with sensible defaults,
//! and a default toolchain whose Rust tool matches the conventional
//! extensions (`.rlib`, `.so`, empty for executables).
//!
//! All items are intended for use in tests within this workspace; avoid
//! using them in production code.

pub mod graph;

pub use graph::{TestGraph, default_toolchain_tools};
