//! The memoized resolver.
//!
//! Five independent computations hang off each target's memo entry, each
//! guarded by its own `Option`: link-time libraries, frameworks, hard
//! deps, inherited libraries and the Rust library pair. The memo store is
//! a [`UniqueVec`] of target ids in parallel with a vector of boxed
//! entries, so `info(t) = infos[store.position(t)]` without a second hash
//! lookup on the hot path.

use tracing::trace;

use crate::config_values::LibFile;
use crate::graph::{BuildGraph, TargetId};
use crate::source_file::SourceDir;
use crate::target::{OutputType, Target};
use crate::target_pair::{TargetPublicPair, TargetPublicPairList, TargetPublicPairListBuilder};
use crate::unique_vec::UniqueVec;

use super::deps::ResolvedTargetDeps;

/// Link-time library inputs of one target.
pub struct LibInfo<'r> {
    pub all_lib_dirs: &'r [SourceDir],
    pub all_libs: &'r [LibFile],
}

/// Link-time framework inputs of one target.
pub struct FrameworkInfo<'r> {
    pub all_framework_dirs: &'r [SourceDir],
    pub all_frameworks: &'r [String],
    pub all_weak_frameworks: &'r [String],
}

struct LibValues {
    lib_dirs: Box<[SourceDir]>,
    libs: Box<[LibFile]>,
}

struct FrameworkValues {
    framework_dirs: Box<[SourceDir]>,
    frameworks: Box<[String]>,
    weak_frameworks: Box<[String]>,
}

struct RustLibs {
    inherited: TargetPublicPairList,
    inheritable: TargetPublicPairList,
}

struct TargetInfo<'a> {
    deps: ResolvedTargetDeps<'a>,
    lib: Option<LibValues>,
    framework: Option<FrameworkValues>,
    hard_deps: Option<Box<[TargetId]>>,
    inherited_libs: Option<TargetPublicPairList>,
    rust_libs: Option<RustLibs>,
}

impl<'a> TargetInfo<'a> {
    fn new(target: &'a Target) -> Self {
        Self {
            deps: ResolvedTargetDeps::new(target),
            lib: None,
            framework: None,
            hard_deps: None,
            inherited_libs: None,
            rust_libs: None,
        }
    }
}

/// Per-thread memoized resolver over one frozen graph.
pub struct ResolvedTargetData<'a> {
    graph: &'a BuildGraph,
    store: UniqueVec<TargetId>,
    infos: Vec<Box<TargetInfo<'a>>>,
}

impl<'a> ResolvedTargetData<'a> {
    #[must_use]
    pub fn new(graph: &'a BuildGraph) -> Self {
        Self {
            graph,
            store: UniqueVec::new(),
            infos: Vec::new(),
        }
    }

    /// The graph this resolver answers for.
    #[must_use]
    pub fn graph(&self) -> &'a BuildGraph {
        self.graph
    }

    fn target_ref(&self, id: TargetId) -> &'a Target {
        self.graph.target(id)
    }

    fn info_index(&mut self, target: TargetId) -> usize {
        let (fresh, index) = self.store.append_with_index(target);
        if fresh {
            trace!(target = %self.target_ref(target).label, "memo entry created");
            self.infos
                .push(Box::new(TargetInfo::new(self.target_ref(target))));
        }
        index
    }

    fn linked_deps_of(&mut self, target: TargetId) -> Vec<TargetId> {
        let index = self.info_index(target);
        self.infos[index].deps.linked_deps().to_vec()
    }

    /// The direct dependency views of `target`.
    pub fn deps(&mut self, target: TargetId) -> &ResolvedTargetDeps<'a> {
        let index = self.info_index(target);
        &self.infos[index].deps
    }

    // --- Link-time libraries -------------------------------------------

    pub fn lib_info(&mut self, target: TargetId) -> LibInfo<'_> {
        let index = self.ensure_lib_info(target);
        let values = self.infos[index].lib.as_ref().expect("lib info computed");
        LibInfo {
            all_lib_dirs: &values.lib_dirs,
            all_libs: &values.libs,
        }
    }

    pub fn all_lib_dirs(&mut self, target: TargetId) -> &[SourceDir] {
        let index = self.ensure_lib_info(target);
        &self.infos[index].lib.as_ref().expect("lib info computed").lib_dirs
    }

    pub fn all_libs(&mut self, target: TargetId) -> &[LibFile] {
        let index = self.ensure_lib_info(target);
        &self.infos[index].lib.as_ref().expect("lib info computed").libs
    }

    fn ensure_lib_info(&mut self, target: TargetId) -> usize {
        let index = self.info_index(target);
        if self.infos[index].lib.is_some() {
            return index;
        }

        let mut all_lib_dirs = UniqueVec::new();
        let mut all_libs = UniqueVec::new();
        for values in self.target_ref(target).config_values_iter() {
            all_lib_dirs.append_all(values.lib_dirs.iter().copied());
            all_libs.append_all(values.libs.iter().copied());
        }
        for dep in self.linked_deps_of(target) {
            if self.forwards_libs(dep) {
                let dep_index = self.ensure_lib_info(dep);
                let dep_values = self.infos[dep_index].lib.as_ref().expect("computed");
                all_lib_dirs.append_all(dep_values.lib_dirs.iter().copied());
                all_libs.append_all(dep_values.libs.iter().copied());
            }
        }

        self.infos[index].lib = Some(LibValues {
            lib_dirs: all_lib_dirs.release(),
            libs: all_libs.release(),
        });
        index
    }

    /// A dependency forwards its libraries upward unless it is itself a
    /// linked artifact; static libraries forward regardless because the
    /// final link is what resolves them.
    fn forwards_libs(&self, dep: TargetId) -> bool {
        let target = self.target_ref(dep);
        !target.is_final() || target.output_type == OutputType::StaticLibrary
    }

    // --- Frameworks ----------------------------------------------------

    pub fn framework_info(&mut self, target: TargetId) -> FrameworkInfo<'_> {
        let index = self.ensure_framework_info(target);
        let values = self.infos[index]
            .framework
            .as_ref()
            .expect("framework info computed");
        FrameworkInfo {
            all_framework_dirs: &values.framework_dirs,
            all_frameworks: &values.frameworks,
            all_weak_frameworks: &values.weak_frameworks,
        }
    }

    pub fn all_framework_dirs(&mut self, target: TargetId) -> &[SourceDir] {
        let index = self.ensure_framework_info(target);
        &self.infos[index]
            .framework
            .as_ref()
            .expect("framework info computed")
            .framework_dirs
    }

    pub fn all_frameworks(&mut self, target: TargetId) -> &[String] {
        let index = self.ensure_framework_info(target);
        &self.infos[index]
            .framework
            .as_ref()
            .expect("framework info computed")
            .frameworks
    }

    pub fn all_weak_frameworks(&mut self, target: TargetId) -> &[String] {
        let index = self.ensure_framework_info(target);
        &self.infos[index]
            .framework
            .as_ref()
            .expect("framework info computed")
            .weak_frameworks
    }

    fn ensure_framework_info(&mut self, target: TargetId) -> usize {
        let index = self.info_index(target);
        if self.infos[index].framework.is_some() {
            return index;
        }

        let mut all_framework_dirs = UniqueVec::new();
        let mut all_frameworks = UniqueVec::new();
        let mut all_weak_frameworks = UniqueVec::new();
        for values in self.target_ref(target).config_values_iter() {
            all_framework_dirs.append_all(values.framework_dirs.iter().copied());
            all_frameworks.append_all(values.frameworks.iter().cloned());
            all_weak_frameworks.append_all(values.weak_frameworks.iter().cloned());
        }
        for dep in self.linked_deps_of(target) {
            if self.forwards_libs(dep) {
                let dep_index = self.ensure_framework_info(dep);
                let dep_values = self.infos[dep_index].framework.as_ref().expect("computed");
                all_framework_dirs.append_all(dep_values.framework_dirs.iter().copied());
                all_frameworks.append_all(dep_values.frameworks.iter().cloned());
                all_weak_frameworks.append_all(dep_values.weak_frameworks.iter().cloned());
            }
        }

        self.infos[index].framework = Some(FrameworkValues {
            framework_dirs: all_framework_dirs.release(),
            frameworks: all_frameworks.release(),
            weak_frameworks: all_weak_frameworks.release(),
        });
        index
    }

    // --- Hard dependencies ---------------------------------------------

    /// The set of dependencies whose outputs must exist before `target`
    /// starts building, in deterministic first-reached order.
    pub fn recursive_hard_deps(&mut self, target: TargetId) -> &[TargetId] {
        let index = self.ensure_hard_deps(target);
        self.infos[index].hard_deps.as_ref().expect("hard deps computed")
    }

    fn ensure_hard_deps(&mut self, target: TargetId) -> usize {
        let index = self.info_index(target);
        if self.infos[index].hard_deps.is_some() {
            return index;
        }

        let this = self.target_ref(target);
        let mut all_hard_deps = UniqueVec::new();
        for dep in self.linked_deps_of(target) {
            let dep_target = self.target_ref(dep);
            if this.hard_dep || dep_target.hard_dep {
                all_hard_deps.append(dep);
                continue;
            }
            // A binary dep without public headers cannot gate compilation
            // of its dependents, so its own hard deps are irrelevant here.
            // Swift modules are the exception: they generate a header.
            if dep_target.is_binary()
                && !dep_target.all_headers_public
                && dep_target.public_headers.is_empty()
                && !dep_target.builds_swift_module
            {
                continue;
            }
            let dep_index = self.ensure_hard_deps(dep);
            let dep_hard: Vec<TargetId> = self.infos[dep_index]
                .hard_deps
                .as_ref()
                .expect("computed")
                .to_vec();
            all_hard_deps.append_all(dep_hard);
        }

        self.infos[index].hard_deps = Some(all_hard_deps.release());
        index
    }

    // --- Inherited libraries -------------------------------------------

    /// The ordered `(target, is_public)` list of link-time libraries
    /// `target` inherits through its dependency edges.
    pub fn inherited_libraries(&mut self, target: TargetId) -> &[TargetPublicPair] {
        let index = self.ensure_inherited_libs(target);
        self.infos[index]
            .inherited_libs
            .as_ref()
            .expect("inherited libs computed")
    }

    fn ensure_inherited_libs(&mut self, target: TargetId) -> usize {
        let index = self.info_index(target);
        if self.infos[index].inherited_libs.is_some() {
            return index;
        }

        let this = self.target_ref(target);
        let mut builder = TargetPublicPairListBuilder::new();
        self.compute_inherited_libs_for(&this.public_deps, true, &mut builder);
        self.compute_inherited_libs_for(&this.private_deps, false, &mut builder);

        self.infos[index].inherited_libs = Some(builder.build());
        index
    }

    fn compute_inherited_libs_for(
        &mut self,
        deps: &'a [TargetId],
        is_public: bool,
        builder: &mut TargetPublicPairListBuilder,
    ) {
        for &dep in deps {
            let dep_target = self.target_ref(dep);

            // Direct dependent libraries.
            if matches!(
                dep_target.output_type,
                OutputType::StaticLibrary
                    | OutputType::SharedLibrary
                    | OutputType::RustLibrary
                    | OutputType::SourceSet
            ) || (dep_target.output_type == OutputType::Bundle
                && dep_target.bundle_is_framework)
            {
                builder.append(dep, is_public);
            }

            if dep_target.output_type == OutputType::SharedLibrary {
                // Shared-library deps cross a public shared-library
                // boundary; a private edge does not grant the consumer the
                // right to link the inner library, so it stops here.
                // Static libraries and source sets never cross: they are
                // linked into the shared library itself.
                let dep_index = self.ensure_inherited_libs(dep);
                let inherited: Vec<TargetPublicPair> = self.infos[dep_index]
                    .inherited_libs
                    .as_ref()
                    .expect("computed")
                    .to_vec();
                for pair in inherited {
                    if self.target_ref(pair.target()).output_type == OutputType::SharedLibrary
                        && pair.is_public()
                    {
                        builder.append(pair.target(), is_public);
                    }
                }
            } else if !dep_target.is_final() {
                // A non-linked dep is transparent: forward its inherited
                // libraries upward. Proc macros are consumed by the
                // compiler, never linked, so they do not ride along.
                let dep_index = self.ensure_inherited_libs(dep);
                let inherited: Vec<TargetPublicPair> = self.infos[dep_index]
                    .inherited_libs
                    .as_ref()
                    .expect("computed")
                    .to_vec();
                for pair in inherited {
                    if self.target_ref(pair.target()).output_type != OutputType::RustProcMacro {
                        builder.append(pair.target(), is_public && pair.is_public());
                    }
                }
            } else if dep_target.complete_static_lib {
                // A complete static archive links its non-final inherited
                // targets into itself; only final ones are forwarded so
                // that consumers still put them on the link line.
                let dep_index = self.ensure_inherited_libs(dep);
                let inherited: Vec<TargetPublicPair> = self.infos[dep_index]
                    .inherited_libs
                    .as_ref()
                    .expect("computed")
                    .to_vec();
                for pair in inherited {
                    if self.target_ref(pair.target()).is_final() {
                        builder.append(pair.target(), is_public && pair.is_public());
                    }
                }
            }
        }
    }

    // --- Rust libraries ------------------------------------------------

    /// Everything the target itself may name with `--extern`: all of its
    /// direct Rust-reachable deps plus their inheritable closures. Flags
    /// are all public because direct access is unconditional.
    pub fn rust_transitive_inherited_libs(&mut self, target: TargetId) -> &[TargetPublicPair] {
        let index = self.ensure_rust_libs(target);
        &self.infos[index].rust_libs.as_ref().expect("rust libs computed").inherited
    }

    /// What targets depending on `target` can see through it, gated by the
    /// publicness of each edge.
    pub fn rust_inheritable_libs(&mut self, target: TargetId) -> &[TargetPublicPair] {
        let index = self.ensure_rust_libs(target);
        &self.infos[index]
            .rust_libs
            .as_ref()
            .expect("rust libs computed")
            .inheritable
    }

    fn ensure_rust_libs(&mut self, target: TargetId) -> usize {
        let index = self.info_index(target);
        if self.infos[index].rust_libs.is_some() {
            return index;
        }

        let this = self.target_ref(target);
        let mut inherited = TargetPublicPairListBuilder::new();
        let mut inheritable = TargetPublicPairListBuilder::new();
        self.compute_rust_libs_for(&this.public_deps, true, &mut inherited, &mut inheritable);
        self.compute_rust_libs_for(&this.private_deps, false, &mut inherited, &mut inheritable);

        self.infos[index].rust_libs = Some(RustLibs {
            inherited: inherited.build(),
            inheritable: inheritable.build(),
        });
        index
    }

    fn compute_rust_libs_for(
        &mut self,
        deps: &'a [TargetId],
        is_public: bool,
        inherited: &mut TargetPublicPairListBuilder,
        inheritable: &mut TargetPublicPairListBuilder,
    ) {
        for &dep in deps {
            let dep_target = self.target_ref(dep);
            match dep_target.output_type {
                OutputType::StaticLibrary
                | OutputType::SharedLibrary
                | OutputType::SourceSet
                | OutputType::RustLibrary
                | OutputType::Group => {
                    // The current target has direct access to this dep no
                    // matter the edge class; its own dependents only see it
                    // through a public edge.
                    inherited.append(dep, true);
                    inheritable.append(dep, is_public);

                    let dep_index = self.ensure_rust_libs(dep);
                    let dep_inheritable: Vec<TargetPublicPair> = self.infos[dep_index]
                        .rust_libs
                        .as_ref()
                        .expect("computed")
                        .inheritable
                        .to_vec();
                    inherited.append_inherited(&dep_inheritable, true);
                    inheritable.append_inherited(&dep_inheritable, is_public);
                }
                OutputType::RustProcMacro => {
                    // The macro itself is inherited, but nothing it depends
                    // on escapes: it is only used during compilation.
                    inherited.append(dep, true);
                    inheritable.append(dep, is_public);
                }
                _ => {}
            }
        }
    }
}
