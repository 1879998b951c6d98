//! The target graph arena.
//!
//! Targets live in a flat vector and are referenced everywhere by
//! [`TargetId`], a plain index. The graph is append-only while it is being
//! built (by the loader or a test fixture) and frozen afterwards: the
//! resolver and writers only ever read it, which is what allows several
//! workers to walk it concurrently without synchronisation.

mod load;

pub use load::{GraphError, GraphSpec, TargetSpec, ToolchainSpec, from_file, from_json};

use std::collections::HashMap;

use camino::Utf8PathBuf;

use crate::label::Label;
use crate::source_file::SourceDir;
use crate::target::Target;
use crate::tools::Toolchain;

/// Index of a target in its graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u32);

impl TargetId {
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).expect("target index fits in 32 bits"))
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a toolchain in its graph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ToolchainId(u32);

impl ToolchainId {
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).expect("toolchain index fits in 32 bits"))
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Paths the writers resolve output locations against.
#[derive(Clone, Debug)]
pub struct BuildSettings {
    /// Source-absolute build directory, e.g. `//out/Debug/`.
    pub build_dir: SourceDir,
    /// Absolute filesystem path of the source root.
    pub root_path: Utf8PathBuf,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            build_dir: SourceDir::new("//out/Debug/"),
            root_path: Utf8PathBuf::from("/"),
        }
    }
}

/// The post-resolution target graph.
#[derive(Debug)]
pub struct BuildGraph {
    settings: BuildSettings,
    toolchains: Vec<Toolchain>,
    targets: Vec<Target>,
    by_label: HashMap<Label, TargetId>,
}

impl BuildGraph {
    #[must_use]
    pub fn new(settings: BuildSettings) -> Self {
        Self {
            settings,
            toolchains: Vec::new(),
            targets: Vec::new(),
            by_label: HashMap::new(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    pub fn add_toolchain(&mut self, toolchain: Toolchain) -> ToolchainId {
        let id = ToolchainId::from_index(self.toolchains.len());
        self.toolchains.push(toolchain);
        id
    }

    /// Append a target, indexing it by label. The caller is responsible for
    /// only referencing ids of targets already in the arena.
    pub fn add_target(&mut self, target: Target) -> TargetId {
        let id = TargetId::from_index(self.targets.len());
        self.by_label.insert(target.label, id);
        self.targets.push(target);
        id
    }

    #[must_use]
    pub fn target(&self, id: TargetId) -> &Target {
        &self.targets[id.index()]
    }

    /// Mutable access for graph construction; nothing mutates a target
    /// once resolution starts.
    pub fn target_mut(&mut self, id: TargetId) -> &mut Target {
        &mut self.targets[id.index()]
    }

    #[must_use]
    pub fn toolchain(&self, id: ToolchainId) -> &Toolchain {
        &self.toolchains[id.index()]
    }

    /// The toolchain a target is built in.
    #[must_use]
    pub fn toolchain_for(&self, target: &Target) -> &Toolchain {
        self.toolchain(target.toolchain)
    }

    #[must_use]
    pub fn toolchain_count(&self) -> usize {
        self.toolchains.len()
    }

    #[must_use]
    pub fn lookup(&self, label: &Label) -> Option<TargetId> {
        self.by_label.get(label).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn target_ids(&self) -> impl Iterator<Item = TargetId> {
        (0..self.targets.len()).map(TargetId::from_index)
    }

    pub fn targets(&self) -> impl Iterator<Item = (TargetId, &Target)> {
        self.targets
            .iter()
            .enumerate()
            .map(|(index, target)| (TargetId::from_index(index), target))
    }

    /// Target ids sorted by label, the stable order used for output.
    #[must_use]
    pub fn ids_in_label_order(&self) -> Vec<TargetId> {
        let mut ids: Vec<TargetId> = self.target_ids().collect();
        ids.sort_by_key(|id| self.target(*id).label);
        ids
    }
}
