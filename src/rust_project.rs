//! `rust-project.json` emission.
//!
//! Once per build, every target that compiles Rust sources is listed as a
//! crate so rust-analyzer can load the project without Cargo. Crates are
//! emitted in dependency post-order, which makes `crate_id` a topological
//! index: a dependency's id is always lower than its consumer's. When a
//! target's Rust tool declares a sysroot, the sysroot crates are
//! synthesised first, walking the fixed internal dep map so that `std`'s
//! own deps get lower ids than `std` itself.
//!
//! This emitter is the one place where the platform newline matters: the
//! file uses CRLF on Windows and LF elsewhere.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io;
use std::path::Path;

use camino::Utf8PathBuf;

use crate::graph::{BuildGraph, TargetId};
use crate::ninja_gen::write_if_changed;
use crate::target::{OutputType, Target};
use crate::tools::Tool;
use crate::unique_vec::UniqueVec;

#[cfg(windows)]
const NEWLINE: &str = "\r\n";
#[cfg(not(windows))]
const NEWLINE: &str = "\n";

/// The crates a sysroot ships, in synthesis order.
const SYSROOT_CRATES: [&str; 22] = [
    "std",
    "core",
    "alloc",
    "collections",
    "libc",
    "panic_unwind",
    "proc_macro",
    "rustc_unicode",
    "std_unicode",
    "test",
    "alloc_jemalloc",
    "alloc_system",
    "compiler_builtins",
    "getopts",
    "panic_abort",
    "unwind",
    "build_helper",
    "rustc_asan",
    "rustc_lsan",
    "rustc_msan",
    "rustc_tsan",
    "syntax",
];

/// Internal dependencies between sysroot crates. The emitter visits these
/// before the crate that needs them, so ids stay topological.
fn sysroot_deps(crate_name: &str) -> &'static [&'static str] {
    match crate_name {
        "std" => &["alloc", "core", "panic_abort", "unwind"],
        "alloc" => &["core"],
        _ => &[],
    }
}

/// Render the project JSON for the whole graph.
#[must_use]
pub fn render_json(graph: &BuildGraph) -> String {
    let mut renderer = Renderer::new(graph);
    renderer.render();
    renderer.out
}

/// Render and write the project file, skipping the write when the on-disk
/// bytes already match.
///
/// # Errors
///
/// Propagates I/O failures from the final write.
pub fn write_project_file(graph: &BuildGraph, path: &Path) -> io::Result<bool> {
    write_if_changed(path, &render_json(graph))
}

struct Renderer<'a> {
    graph: &'a BuildGraph,
    out: String,
    count: u32,
    lookup: HashMap<TargetId, u32>,
    sysroot_lookup: HashMap<String, HashMap<&'static str, u32>>,
    first_crate: bool,
}

impl<'a> Renderer<'a> {
    fn new(graph: &'a BuildGraph) -> Self {
        Self {
            graph,
            out: String::new(),
            count: 0,
            lookup: HashMap::new(),
            sysroot_lookup: HashMap::new(),
            first_crate: true,
        }
    }

    fn render(&mut self) {
        write!(self.out, "{{{NEWLINE}").expect("write project");
        write!(self.out, "  \"roots\": [],{NEWLINE}").expect("write project");
        write!(self.out, "  \"crates\": [{NEWLINE}").expect("write project");
        for id in self.graph.ids_in_label_order() {
            let target = self.graph.target(id);
            if !target.is_binary() || !target.source_kinds_used.rust_source_used() {
                continue;
            }
            self.add_target(id);
        }
        write!(self.out, "{NEWLINE}  ]{NEWLINE}}}{NEWLINE}").expect("write project");
    }

    fn separate(&mut self) {
        if !self.first_crate {
            write!(self.out, ",{NEWLINE}").expect("write project");
        }
        self.first_crate = false;
    }

    /// The Rust deps of a target, expanding groups transparently.
    fn rust_deps_of(&self, id: TargetId, deps: &mut UniqueVec<TargetId>) {
        let target = self.graph.target(id);
        for &dep in target.public_deps.iter().chain(target.private_deps.iter()) {
            let dep_target = self.graph.target(dep);
            if dep_target.source_kinds_used.rust_source_used() {
                deps.append(dep);
            } else if dep_target.output_type == OutputType::Group {
                self.rust_deps_of(dep, deps);
            }
        }
    }

    fn sysroot_of(&self, target: &Target) -> Option<String> {
        self.graph
            .toolchain_for(target)
            .rust_tool()
            .and_then(Tool::as_rust)
            .and_then(|values| values.sysroot.clone())
    }

    fn add_target(&mut self, id: TargetId) {
        if self.lookup.contains_key(&id) {
            return;
        }
        let target = self.graph.target(id);

        let sysroot = self.sysroot_of(target);
        if let Some(sysroot) = &sysroot {
            if !self.sysroot_lookup.contains_key(sysroot) {
                self.add_sysroot(sysroot.clone());
            }
        }

        let mut deps = UniqueVec::new();
        self.rust_deps_of(id, &mut deps);
        let deps = deps.release();
        for &dep in &deps {
            self.add_target(dep);
        }

        self.separate();
        let crate_id = self.count;
        self.lookup.insert(id, crate_id);
        self.count += 1;

        let root_module = self.absolute_source_path(
            target
                .rust_values
                .as_ref()
                .map_or_else(
                    || {
                        target
                            .sources
                            .iter()
                            .find(|source| source.kind() == crate::source_file::SourceKind::Rs)
                            .copied()
                            .unwrap_or_default()
                    },
                    |values| values.crate_root,
                )
                .as_str(),
        );

        write!(self.out, "    {{{NEWLINE}").expect("write crate");
        write!(self.out, "      \"crate_id\": {crate_id},{NEWLINE}").expect("write crate");
        write!(
            self.out,
            "      \"root_module\": {},{NEWLINE}",
            json_string(root_module.as_str())
        )
        .expect("write crate");
        write!(
            self.out,
            "      \"label\": {},{NEWLINE}",
            json_string(&target.label.to_user_visible())
        )
        .expect("write crate");

        self.write_deps(target, sysroot.as_deref(), &deps);

        let (edition, cfgs) = edition_and_cfgs(target);
        write!(self.out, "      \"edition\": {},{NEWLINE}", json_string(&edition))
            .expect("write crate");
        write!(self.out, "      \"cfg\": [").expect("write crate");
        for (index, cfg) in cfgs.iter().enumerate() {
            if index > 0 {
                self.out.push(',');
            }
            write!(self.out, "{NEWLINE}        {}", json_string(cfg)).expect("write crate");
        }
        write!(self.out, "{NEWLINE}      ]{NEWLINE}").expect("write crate");
        write!(self.out, "    }}").expect("write crate");
    }

    fn write_deps(&mut self, target: &Target, sysroot: Option<&str>, deps: &[TargetId]) {
        write!(self.out, "      \"deps\": [").expect("write deps");
        let mut first_dep = true;

        if let Some(sysroot) = sysroot {
            if let Some(std_id) = self
                .sysroot_lookup
                .get(sysroot)
                .and_then(|crates| crates.get("std"))
            {
                write!(
                    self.out,
                    "{NEWLINE}        {{{NEWLINE}          \"crate\": {std_id},{NEWLINE}          \"name\": \"std\"{NEWLINE}        }}"
                )
                .expect("write deps");
                first_dep = false;
            }
        }

        for &dep in deps {
            let crate_id = self.lookup[&dep];
            let dep_target = self.graph.target(dep);
            let name = dep_target
                .rust_values
                .as_ref()
                .map_or_else(|| dep_target.label.name(), |values| values.crate_name);
            if !first_dep {
                self.out.push(',');
            }
            write!(
                self.out,
                "{NEWLINE}        {{{NEWLINE}          \"crate\": {crate_id},{NEWLINE}          \"name\": {}{NEWLINE}        }}",
                json_string(name.as_str())
            )
            .expect("write deps");
            first_dep = false;
        }
        write!(self.out, "{NEWLINE}      ],{NEWLINE}").expect("write deps");
    }

    fn add_sysroot(&mut self, sysroot: String) {
        self.sysroot_lookup.insert(sysroot.clone(), HashMap::new());
        for crate_name in SYSROOT_CRATES {
            self.add_sysroot_crate(&sysroot, crate_name);
        }
    }

    fn add_sysroot_crate(&mut self, sysroot: &str, crate_name: &'static str) {
        if self.sysroot_lookup[sysroot].contains_key(crate_name) {
            return;
        }
        // Dependencies first, so their ids are lower.
        for &dep in sysroot_deps(crate_name) {
            self.add_sysroot_crate(sysroot, dep);
        }

        self.separate();
        let crate_id = self.count;
        self.sysroot_lookup
            .get_mut(sysroot)
            .expect("sysroot registered")
            .insert(crate_name, crate_id);
        self.count += 1;

        let root_module = self
            .absolute_build_path(sysroot)
            .join(format!("lib/rustlib/src/rust/src/lib{crate_name}/lib.rs"));

        write!(self.out, "    {{{NEWLINE}").expect("write sysroot crate");
        write!(self.out, "      \"crate_id\": {crate_id},{NEWLINE}").expect("write sysroot crate");
        write!(
            self.out,
            "      \"root_module\": {},{NEWLINE}",
            json_string(root_module.as_str())
        )
        .expect("write sysroot crate");
        write!(self.out, "      \"edition\": \"2018\",{NEWLINE}").expect("write sysroot crate");
        write!(self.out, "      \"deps\": [").expect("write sysroot crate");
        let mut first_dep = true;
        for &dep in sysroot_deps(crate_name) {
            let dep_id = self.sysroot_lookup[sysroot][dep];
            if !first_dep {
                self.out.push(',');
            }
            write!(
                self.out,
                "{NEWLINE}        {{{NEWLINE}          \"crate\": {dep_id},{NEWLINE}          \"name\": \"{dep}\"{NEWLINE}        }}"
            )
            .expect("write sysroot crate");
            first_dep = false;
        }
        write!(self.out, "{NEWLINE}      ],{NEWLINE}").expect("write sysroot crate");
        write!(self.out, "      \"cfg\": []{NEWLINE}").expect("write sysroot crate");
        write!(self.out, "    }}").expect("write sysroot crate");
    }

    /// Absolute form of a source-absolute path.
    fn absolute_source_path(&self, source: &str) -> Utf8PathBuf {
        self.graph
            .settings()
            .root_path
            .join(source.trim_start_matches("//"))
    }

    /// Absolute form of a path relative to the build directory.
    fn absolute_build_path(&self, relative: &str) -> Utf8PathBuf {
        let build_dir = self.graph.settings().build_dir;
        self.absolute_source_path(build_dir.as_str()).join(relative)
    }
}

/// The crate's edition from an explicit `--edition=` rustflag (else the
/// `2015` default), plus the raw payloads of every `--cfg=` flag.
fn edition_and_cfgs(target: &Target) -> (String, Vec<String>) {
    let mut edition = None;
    let mut cfgs = Vec::new();
    for config in target.config_values_iter() {
        for flag in &config.rustflags {
            if let Some(value) = flag.strip_prefix("--edition=") {
                edition = Some(value.to_owned());
            }
            if let Some(value) = flag.strip_prefix("--cfg=") {
                cfgs.push(value.to_owned());
            }
        }
    }
    (edition.unwrap_or_else(|| "2015".to_owned()), cfgs)
}

/// A JSON string literal, quotes included.
fn json_string(value: &str) -> String {
    serde_json::to_string(value).expect("strings always serialise")
}
