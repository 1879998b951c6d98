//! The target model.
//!
//! A [`Target`] is one node of the post-resolution graph: its output type,
//! its three classes of direct dependency edges, the config values attached
//! to it, and the optional Rust- and Swift-specific blocks. Targets are
//! owned by the [`crate::graph::BuildGraph`] arena and referenced by
//! [`crate::graph::TargetId`]; everything here is read-only once the graph
//! is loaded.

use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use serde::Deserialize;

use crate::atom::Atom;
use crate::config_values::{ConfigValues, ConfigValuesIter};
use crate::graph::{TargetId, ToolchainId};
use crate::label::Label;
use crate::source_file::{SourceFile, SourceKindSet};

/// What a target produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputType {
    Executable,
    StaticLibrary,
    SharedLibrary,
    LoadableModule,
    RustLibrary,
    RustProcMacro,
    SourceSet,
    Group,
    Action,
    ActionForEach,
    Bundle,
    CopyFiles,
    GeneratedFile,
    Unknown,
}

/// The crate type passed to the Rust compiler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrateType {
    #[default]
    Auto,
    Bin,
    Rlib,
    Dylib,
    CDylib,
    StaticLib,
    ProcMacro,
}

impl CrateType {
    /// Normalise `Auto` through the target's output type. Explicit crate
    /// types pass through unchanged.
    #[must_use]
    pub fn resolve(self, output_type: OutputType) -> Self {
        if self != Self::Auto {
            return self;
        }
        match output_type {
            OutputType::StaticLibrary => Self::StaticLib,
            OutputType::RustLibrary => Self::Rlib,
            OutputType::SharedLibrary => Self::Dylib,
            OutputType::LoadableModule => Self::CDylib,
            OutputType::RustProcMacro => Self::ProcMacro,
            _ => Self::Bin,
        }
    }

    /// The spelling the Rust compiler expects for `--crate-type`.
    #[must_use]
    pub fn as_rustc_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Bin => "bin",
            Self::Rlib => "rlib",
            Self::Dylib => "dylib",
            Self::CDylib => "cdylib",
            Self::StaticLib => "staticlib",
            Self::ProcMacro => "proc-macro",
        }
    }

    /// True for the crate types whose artifact carries a `lib` prefix.
    #[must_use]
    pub fn has_lib_prefix(self) -> bool {
        !matches!(self, Self::Bin | Self::Auto)
    }
}

/// Rust-specific target attributes.
#[derive(Clone, Debug)]
pub struct RustValues {
    pub crate_name: Atom,
    pub crate_root: SourceFile,
    pub crate_type: CrateType,
    pub edition: String,
    /// Maps a dependency's label to the local crate name it is imported as.
    pub aliased_deps: BTreeMap<Label, Atom>,
}

/// One node of the target graph.
#[derive(Debug)]
pub struct Target {
    pub label: Label,
    pub output_type: OutputType,
    pub public_deps: Vec<TargetId>,
    pub private_deps: Vec<TargetId>,
    pub data_deps: Vec<TargetId>,
    pub config_values: ConfigValues,
    pub configs: Vec<ConfigValues>,
    pub sources: Vec<SourceFile>,
    pub public_headers: Vec<SourceFile>,
    pub all_headers_public: bool,
    pub hard_dep: bool,
    pub complete_static_lib: bool,
    pub builds_swift_module: bool,
    pub bundle_is_framework: bool,
    pub output_name: Atom,
    /// Artifact directory relative to the build directory, e.g. `obj/foo`.
    pub output_dir: Utf8PathBuf,
    pub rust_values: Option<RustValues>,
    pub toolchain: ToolchainId,
    pub metadata: BTreeMap<String, Vec<serde_json::Value>>,
    pub source_kinds_used: SourceKindSet,
}

impl Target {
    /// Iterate the target's own config values, then each attached config in
    /// declaration order.
    #[must_use]
    pub fn config_values_iter(&self) -> ConfigValuesIter<'_> {
        ConfigValuesIter::new(&self.config_values, &self.configs)
    }

    /// True when this target's output stands on its own rather than being
    /// forwarded into consumers: linked artifacts (executables, shared
    /// libraries, loadable modules, proc macros, complete static archives)
    /// and targets that produce their outputs directly (actions, copies,
    /// bundles). A final dep is a propagation boundary: nothing behind it
    /// rides up the dependency tree.
    #[must_use]
    pub fn is_final(&self) -> bool {
        match self.output_type {
            OutputType::Executable
            | OutputType::SharedLibrary
            | OutputType::LoadableModule
            | OutputType::Action
            | OutputType::ActionForEach
            | OutputType::CopyFiles
            | OutputType::Bundle
            | OutputType::RustProcMacro => true,
            OutputType::StaticLibrary => self.complete_static_lib,
            _ => false,
        }
    }

    /// True when the target compiles sources.
    #[must_use]
    pub fn is_binary(&self) -> bool {
        matches!(
            self.output_type,
            OutputType::Executable
                | OutputType::SharedLibrary
                | OutputType::LoadableModule
                | OutputType::StaticLibrary
                | OutputType::SourceSet
                | OutputType::RustLibrary
                | OutputType::RustProcMacro
        )
    }

    /// True when the target's artifact can appear on a link line. Proc
    /// macros are deliberately excluded: they are consumed by the compiler,
    /// never linked.
    #[must_use]
    pub fn is_linkable(&self) -> bool {
        matches!(
            self.output_type,
            OutputType::StaticLibrary | OutputType::SharedLibrary | OutputType::RustLibrary
        )
    }

    #[must_use]
    pub fn is_source_set(&self) -> bool {
        self.output_type == OutputType::SourceSet
    }

    /// The crate type after `Auto` normalisation, for Rust targets.
    #[must_use]
    pub fn resolved_crate_type(&self) -> Option<CrateType> {
        self.rust_values
            .as_ref()
            .map(|values| values.crate_type.resolve(self.output_type))
    }

    /// All `inputs` entries from the target's configs, in iteration order.
    #[must_use]
    pub fn aggregated_inputs(&self) -> Vec<SourceFile> {
        self.config_values_iter()
            .flat_map(|values| values.inputs.iter().copied())
            .collect()
    }
}
