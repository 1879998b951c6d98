//! Graph ingestion from the front end's serialised form.
//!
//! The configuration-language evaluator runs as a separate front end and
//! hands over a fully resolved graph as one JSON document. Loading performs
//! the validations the evaluator cannot: tool init, dependency reference
//! resolution, and the per-output-type shape checks. No template evaluation
//! happens here.

use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::atom::Atom;
use crate::config_values::ConfigValues;
use crate::graph::{BuildGraph, BuildSettings, TargetId, ToolchainId};
use crate::label::Label;
use crate::source_file::{SourceDir, SourceFile, SourceKindSet};
use crate::target::{CrateType, OutputType, RustValues, Target};
use crate::tools::{Tool, ToolError, ToolSpec, Toolchain};

/// Errors raised while loading a graph file.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("could not read graph file {path}")]
    #[diagnostic(code(tagane::graph::io))]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("graph file is not valid JSON")]
    #[diagnostic(
        code(tagane::graph::parse),
        help("the graph file is produced by the front end; regenerate it rather than editing by hand")
    )]
    Parse(#[from] serde_json::Error),

    #[error("target {referenced_by} depends on unknown target {label}")]
    #[diagnostic(
        code(tagane::graph::unknown_target),
        help("every dependency edge must name a target defined in the same graph file")
    )]
    UnknownTarget {
        label: String,
        referenced_by: String,
    },

    #[error("target {target} references unknown toolchain \"{toolchain}\"")]
    #[diagnostic(code(tagane::graph::unknown_toolchain))]
    UnknownToolchain { target: String, toolchain: String },

    #[error("target {target} is missing required field \"{field}\"")]
    #[diagnostic(
        code(tagane::graph::missing_required_field),
        help("generated_file targets must declare both contents and outputs")
    )]
    MissingRequiredField {
        target: String,
        field: &'static str,
    },

    #[error("target {target} declares {count} outputs where exactly one is required")]
    #[diagnostic(code(tagane::graph::single_output_required))]
    SingleOutputRequired { target: String, count: usize },

    #[error("target {target} sets complete_static_lib but is not a static library")]
    #[diagnostic(
        code(tagane::graph::complete_static_lib_kind),
        help("only static_library targets can be complete archives")
    )]
    CompleteStaticLibKind { target: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Tool(#[from] ToolError),
}

/// Top-level shape of the graph file.
#[derive(Debug, Deserialize)]
pub struct GraphSpec {
    #[serde(default)]
    pub settings: SettingsSpec,
    #[serde(default)]
    pub toolchains: Vec<ToolchainSpec>,
    pub targets: Vec<TargetSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SettingsSpec {
    pub build_dir: String,
    pub root_path: String,
}

impl Default for SettingsSpec {
    fn default() -> Self {
        Self {
            build_dir: "//out/Debug/".to_owned(),
            root_path: "/".to_owned(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ToolchainSpec {
    pub name: String,
    pub tools: Vec<ToolSpec>,
}

#[derive(Debug, Deserialize)]
pub struct RustValuesSpec {
    pub crate_name: String,
    pub crate_root: SourceFile,
    #[serde(default)]
    pub crate_type: CrateType,
    #[serde(default = "default_edition")]
    pub edition: String,
    #[serde(default)]
    pub aliased_deps: BTreeMap<Label, String>,
}

fn default_edition() -> String {
    "2015".to_owned()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct TargetSpec {
    pub label: Label,
    #[serde(rename = "type")]
    pub output_type: OutputType,
    #[serde(default)]
    pub public_deps: Vec<Label>,
    #[serde(default)]
    pub private_deps: Vec<Label>,
    #[serde(default)]
    pub data_deps: Vec<Label>,
    #[serde(default)]
    pub config_values: ConfigValues,
    #[serde(default)]
    pub configs: Vec<ConfigValues>,
    #[serde(default)]
    pub sources: Vec<SourceFile>,
    #[serde(default)]
    pub public_headers: Vec<SourceFile>,
    #[serde(default = "default_true")]
    pub all_headers_public: bool,
    #[serde(default)]
    pub hard_dep: bool,
    #[serde(default)]
    pub complete_static_lib: bool,
    #[serde(default)]
    pub bundle_is_framework: bool,
    #[serde(default)]
    pub output_name: Option<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub toolchain: Option<String>,
    #[serde(default)]
    pub rust: Option<RustValuesSpec>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Vec<serde_json::Value>>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub contents: Option<serde_json::Value>,
}

/// Load a graph from its JSON text.
///
/// # Errors
///
/// Returns a [`GraphError`] for malformed JSON, invalid tools, dangling
/// dependency references, or per-output-type shape violations.
pub fn from_json(text: &str) -> Result<BuildGraph, GraphError> {
    let spec: GraphSpec = serde_json::from_str(text)?;
    build(spec)
}

/// Load a graph from a file on disk.
///
/// # Errors
///
/// As [`from_json`], plus an I/O error when the file cannot be read.
pub fn from_file(path: &Utf8PathBuf) -> Result<BuildGraph, GraphError> {
    let text = std::fs::read_to_string(path).map_err(|source| GraphError::Io {
        path: path.clone(),
        source,
    })?;
    from_json(&text)
}

fn build(spec: GraphSpec) -> Result<BuildGraph, GraphError> {
    let settings = BuildSettings {
        build_dir: SourceDir::new(&spec.settings.build_dir),
        root_path: Utf8PathBuf::from(spec.settings.root_path),
    };
    let mut graph = BuildGraph::new(settings);

    let mut toolchain_names: BTreeMap<String, ToolchainId> = BTreeMap::new();
    for toolchain_spec in spec.toolchains {
        let mut tools = Vec::with_capacity(toolchain_spec.tools.len());
        for tool_spec in toolchain_spec.tools {
            let kinds = tool_spec.source_kinds.clone();
            tools.push((Tool::from_spec(tool_spec)?, kinds));
        }
        let id = graph.add_toolchain(Toolchain::new(tools));
        toolchain_names.insert(toolchain_spec.name, id);
    }
    if graph.toolchain_count() == 0 {
        // A graph with no toolchains still needs one for lookups.
        graph.add_toolchain(Toolchain::new(Vec::new()));
    }

    // First pass: index every label so dependency edges can resolve
    // regardless of declaration order.
    let mut ids: BTreeMap<Label, TargetId> = BTreeMap::new();
    for (index, target_spec) in spec.targets.iter().enumerate() {
        ids.insert(target_spec.label, TargetId::from_index(index));
    }

    for target_spec in spec.targets {
        validate_shape(&target_spec)?;
        let target = lower(target_spec, &ids, &toolchain_names)?;
        graph.add_target(target);
    }
    debug!(targets = graph.len(), "graph loaded");
    Ok(graph)
}

fn validate_shape(spec: &TargetSpec) -> Result<(), GraphError> {
    if spec.complete_static_lib && spec.output_type != OutputType::StaticLibrary {
        return Err(GraphError::CompleteStaticLibKind {
            target: spec.label.to_string(),
        });
    }
    if spec.output_type == OutputType::GeneratedFile {
        if spec.contents.is_none() {
            return Err(GraphError::MissingRequiredField {
                target: spec.label.to_string(),
                field: "contents",
            });
        }
        match spec.outputs.len() {
            0 => {
                return Err(GraphError::MissingRequiredField {
                    target: spec.label.to_string(),
                    field: "outputs",
                });
            }
            1 => {}
            count => {
                return Err(GraphError::SingleOutputRequired {
                    target: spec.label.to_string(),
                    count,
                });
            }
        }
    }
    Ok(())
}

fn resolve_deps(
    owner: &Label,
    labels: &[Label],
    ids: &BTreeMap<Label, TargetId>,
) -> Result<Vec<TargetId>, GraphError> {
    labels
        .iter()
        .map(|label| {
            ids.get(label).copied().ok_or_else(|| GraphError::UnknownTarget {
                label: label.to_string(),
                referenced_by: owner.to_string(),
            })
        })
        .collect()
}

fn lower(
    spec: TargetSpec,
    ids: &BTreeMap<Label, TargetId>,
    toolchains: &BTreeMap<String, ToolchainId>,
) -> Result<Target, GraphError> {
    let label = spec.label;
    let public_deps = resolve_deps(&label, &spec.public_deps, ids)?;
    let private_deps = resolve_deps(&label, &spec.private_deps, ids)?;
    let data_deps = resolve_deps(&label, &spec.data_deps, ids)?;

    let toolchain = match &spec.toolchain {
        Some(name) => *toolchains
            .get(name)
            .ok_or_else(|| GraphError::UnknownToolchain {
                target: label.to_string(),
                toolchain: name.clone(),
            })?,
        None => ToolchainId::default(),
    };

    let source_kinds_used: SourceKindSet =
        spec.sources.iter().map(SourceFile::kind).collect();

    let output_name = spec
        .output_name
        .map_or(label.name(), |name| Atom::new(&name));
    let output_dir = spec.output_dir.map_or_else(
        || default_output_dir(&label),
        Utf8PathBuf::from,
    );

    let rust_values = spec.rust.map(|rust| RustValues {
        crate_name: Atom::new(&rust.crate_name),
        crate_root: rust.crate_root,
        crate_type: rust.crate_type,
        edition: rust.edition,
        aliased_deps: rust
            .aliased_deps
            .into_iter()
            .map(|(dep, alias)| (dep, Atom::new(&alias)))
            .collect(),
    });

    Ok(Target {
        label,
        output_type: spec.output_type,
        public_deps,
        private_deps,
        data_deps,
        config_values: spec.config_values,
        configs: spec.configs,
        sources: spec.sources,
        public_headers: spec.public_headers,
        all_headers_public: spec.all_headers_public,
        hard_dep: spec.hard_dep || intrinsic_hard_dep(spec.output_type),
        complete_static_lib: spec.complete_static_lib,
        builds_swift_module: source_kinds_used.swift_source_used(),
        bundle_is_framework: spec.bundle_is_framework,
        output_name,
        output_dir,
        rust_values,
        toolchain,
        metadata: spec.metadata,
        source_kinds_used,
    })
}

/// Targets that synthesise outputs are always hard deps: a dependent must
/// not start until their files exist.
fn intrinsic_hard_dep(output_type: OutputType) -> bool {
    matches!(
        output_type,
        OutputType::Action
            | OutputType::ActionForEach
            | OutputType::CopyFiles
            | OutputType::Bundle
            | OutputType::GeneratedFile
    )
}

/// The default artifact directory mirrors the target's source directory
/// under `obj/`.
fn default_output_dir(label: &Label) -> Utf8PathBuf {
    let dir = label.dir().as_str().trim_start_matches("//").trim_end_matches('/');
    if dir.is_empty() {
        Utf8PathBuf::from("obj")
    } else {
        Utf8PathBuf::from(format!("obj/{dir}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn minimal_graph(targets_json: &str) -> String {
        format!(
            r#"{{
                "settings": {{"build_dir": "//out/Debug/", "root_path": "/src"}},
                "toolchains": [{{"name": "default", "tools": []}}],
                "targets": {targets_json}
            }}"#
        )
    }

    #[rstest]
    fn loads_a_two_target_chain() {
        let json = minimal_graph(
            r#"[
                {"label": "//foo:lib", "type": "static_library"},
                {"label": "//foo:bin", "type": "executable", "private_deps": ["//foo:lib"]}
            ]"#,
        );
        let graph = from_json(&json).expect("graph");
        assert_eq!(graph.len(), 2);
        let bin = graph
            .lookup(&Label::parse("//foo:bin").expect("label"))
            .expect("id");
        assert_eq!(graph.target(bin).private_deps.len(), 1);
    }

    #[rstest]
    fn unknown_dep_label_is_an_error() {
        let json = minimal_graph(
            r#"[{"label": "//foo:bin", "type": "executable", "private_deps": ["//gone:lib"]}]"#,
        );
        assert!(matches!(
            from_json(&json),
            Err(GraphError::UnknownTarget { .. })
        ));
    }

    #[rstest]
    fn generated_file_requires_contents() {
        let json = minimal_graph(
            r#"[{"label": "//foo:gen", "type": "generated_file", "outputs": ["//out/x"]}]"#,
        );
        match from_json(&json) {
            Err(GraphError::MissingRequiredField { field, .. }) => {
                assert_eq!(field, "contents");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[rstest]
    fn generated_file_requires_exactly_one_output() {
        let json = minimal_graph(
            r#"[{
                "label": "//foo:gen",
                "type": "generated_file",
                "contents": "x",
                "outputs": ["//out/a", "//out/b"]
            }]"#,
        );
        assert!(matches!(
            from_json(&json),
            Err(GraphError::SingleOutputRequired { count: 2, .. })
        ));
    }

    #[rstest]
    fn complete_static_lib_requires_static_library_type() {
        let json = minimal_graph(
            r#"[{"label": "//foo:x", "type": "executable", "complete_static_lib": true}]"#,
        );
        assert!(matches!(
            from_json(&json),
            Err(GraphError::CompleteStaticLibKind { .. })
        ));
    }

    #[rstest]
    fn action_targets_are_intrinsically_hard() {
        let json = minimal_graph(r#"[{"label": "//foo:gen", "type": "action"}]"#);
        let graph = from_json(&json).expect("graph");
        let id = graph
            .lookup(&Label::parse("//foo:gen").expect("label"))
            .expect("id");
        assert!(graph.target(id).hard_dep);
    }

    #[rstest]
    fn default_output_dir_mirrors_label_dir() {
        let json = minimal_graph(r#"[{"label": "//foo/bar:baz", "type": "source_set"}]"#);
        let graph = from_json(&json).expect("graph");
        let id = graph
            .lookup(&Label::parse("//foo/bar:baz").expect("label"))
            .expect("id");
        assert_eq!(graph.target(id).output_dir, Utf8PathBuf::from("obj/foo/bar"));
    }

    #[rstest]
    fn rust_values_carry_aliases() {
        let json = minimal_graph(
            r#"[
                {"label": "//bar:mylib", "type": "rust_library",
                 "sources": ["//bar/lib.rs"],
                 "rust": {"crate_name": "mylib", "crate_root": "//bar/lib.rs"}},
                {"label": "//foo:bin", "type": "executable",
                 "sources": ["//foo/main.rs"],
                 "private_deps": ["//bar:mylib"],
                 "rust": {"crate_name": "bin", "crate_root": "//foo/main.rs",
                          "edition": "2018",
                          "aliased_deps": {"//bar:mylib": "renamed"}}}
            ]"#,
        );
        let graph = from_json(&json).expect("graph");
        let bin = graph
            .lookup(&Label::parse("//foo:bin").expect("label"))
            .expect("id");
        let rust = graph.target(bin).rust_values.as_ref().expect("rust values");
        assert_eq!(rust.edition, "2018");
        let dep_label = Label::parse("//bar:mylib").expect("label");
        assert_eq!(rust.aliased_deps[&dep_label].as_str(), "renamed");
    }
}
