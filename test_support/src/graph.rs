//! Graph fixtures.

use tagane::graph::{BuildGraph, BuildSettings, TargetId};
use tagane::label::Label;
use tagane::source_file::{SourceDir, SourceFile, SourceKind};
use tagane::target::{CrateType, OutputType, RustValues, Target};
use tagane::tools::{Tool, ToolKindSpec, ToolSpec, Toolchain};

/// The default rustc tool used by test toolchains.
fn rust_tool_spec() -> ToolSpec {
    let mut spec = tool_spec("rustc", ToolKindSpec::Rust);
    spec.source_kinds = vec![SourceKind::Rs];
    spec.command = Some(
        "{{rustenv}} rustc --crate-name {{crate_name}} {{source}} \
         --crate-type {{crate_type}} {{rustflags}} -o {{output}} \
         {{rustdeps}} {{externs}}"
            .to_owned(),
    );
    spec.description = Some("RUST {{output}}".to_owned());
    spec.outputs = vec![
        "{{output_dir}}/{{rustc_output_prefix}}{{crate_name}}{{rustc_output_extension}}"
            .to_owned(),
    ];
    spec
}

fn tool_spec(name: &str, kind: ToolKindSpec) -> ToolSpec {
    ToolSpec {
        name: name.to_owned(),
        kind,
        source_kinds: Vec::new(),
        command: None,
        command_launcher: None,
        description: None,
        outputs: Vec::new(),
        runtime_outputs: Vec::new(),
        link_output: None,
        depend_output: None,
        output_prefix: String::new(),
        default_output_extension: String::new(),
        rust: tagane::tools::RustToolValues::default(),
    }
}

/// The tools every test toolchain registers: rustc, the C compile and
/// link family, and stamp.
#[must_use]
pub fn default_toolchain_tools() -> Vec<(Tool, Vec<SourceKind>)> {
    let mut tools = Vec::new();

    let rust = rust_tool_spec();
    let rust_kinds = rust.source_kinds.clone();
    tools.push((Tool::from_spec(rust).expect("rust tool"), rust_kinds));

    let mut cxx = tool_spec("cxx", ToolKindSpec::CFamily);
    cxx.source_kinds = vec![SourceKind::Cpp, SourceKind::C];
    cxx.command = Some("c++ -c {{source}} -o {{output}}".to_owned());
    cxx.outputs = vec!["{{output_dir}}/{{source_name_part}}.o".to_owned()];
    let cxx_kinds = cxx.source_kinds.clone();
    tools.push((Tool::from_spec(cxx).expect("cxx tool"), cxx_kinds));

    let mut alink = tool_spec("alink", ToolKindSpec::CFamily);
    alink.command = Some("ar rcs {{output}} {{source}}".to_owned());
    alink.outputs = vec!["{{output_dir}}/lib{{source_name_part}}.a".to_owned()];
    alink.output_prefix = "lib".to_owned();
    alink.default_output_extension = ".a".to_owned();
    tools.push((Tool::from_spec(alink).expect("alink tool"), Vec::new()));

    let mut solink = tool_spec("solink", ToolKindSpec::CFamily);
    solink.command = Some("c++ -shared {{source}} -o {{output}}".to_owned());
    solink.outputs = vec!["{{output_dir}}/lib{{source_name_part}}.so".to_owned()];
    solink.output_prefix = "lib".to_owned();
    solink.default_output_extension = ".so".to_owned();
    tools.push((Tool::from_spec(solink).expect("solink tool"), Vec::new()));

    let mut link = tool_spec("link", ToolKindSpec::CFamily);
    link.command = Some("c++ {{source}} -o {{output}}".to_owned());
    link.outputs = vec!["{{output_dir}}/{{source_name_part}}".to_owned()];
    tools.push((Tool::from_spec(link).expect("link tool"), Vec::new()));

    let mut stamp = tool_spec("stamp", ToolKindSpec::General);
    stamp.command = Some("touch {{output}}".to_owned());
    stamp.description = Some("STAMP {{output}}".to_owned());
    tools.push((Tool::from_spec(stamp).expect("stamp tool"), Vec::new()));

    tools
}

/// A graph builder with GN-test-style defaults: build dir `//out/Debug/`,
/// one toolchain, and targets that start resolved and header-public.
pub struct TestGraph {
    graph: BuildGraph,
}

impl Default for TestGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl TestGraph {
    #[must_use]
    pub fn new() -> Self {
        let settings = BuildSettings {
            build_dir: SourceDir::new("//out/Debug/"),
            root_path: "/src".into(),
        };
        let mut graph = BuildGraph::new(settings);
        graph.add_toolchain(Toolchain::new(default_toolchain_tools()));
        Self { graph }
    }

    /// Add a target with defaults matching a freshly resolved node.
    pub fn add_target(&mut self, label: &str, output_type: OutputType) -> TargetId {
        let label = Label::parse(label).expect("well-formed label");
        let output_dir = {
            let dir = label.dir().as_str().trim_start_matches("//").trim_end_matches('/');
            if dir.is_empty() {
                "obj".into()
            } else {
                format!("obj/{dir}").into()
            }
        };
        self.graph.add_target(Target {
            label,
            output_type,
            public_deps: Vec::new(),
            private_deps: Vec::new(),
            data_deps: Vec::new(),
            config_values: tagane::config_values::ConfigValues::default(),
            configs: Vec::new(),
            sources: Vec::new(),
            public_headers: Vec::new(),
            all_headers_public: true,
            hard_dep: matches!(
                output_type,
                OutputType::Action
                    | OutputType::ActionForEach
                    | OutputType::CopyFiles
                    | OutputType::Bundle
                    | OutputType::GeneratedFile
            ),
            complete_static_lib: false,
            builds_swift_module: false,
            bundle_is_framework: false,
            output_name: label.name(),
            output_dir,
            rust_values: None,
            toolchain: tagane::graph::ToolchainId::default(),
            metadata: std::collections::BTreeMap::new(),
            source_kinds_used: tagane::source_file::SourceKindSet::default(),
        })
    }

    /// Add a Rust target whose crate root is `<label dir>/lib.rs` (or
    /// `main.rs` for executables).
    pub fn add_rust_target(
        &mut self,
        label: &str,
        output_type: OutputType,
        crate_name: &str,
    ) -> TargetId {
        let id = self.add_target(label, output_type);
        let target = self.graph.target_mut(id);
        let root_name = if output_type == OutputType::Executable {
            "main.rs"
        } else {
            "lib.rs"
        };
        let crate_root = target.label.dir().resolve_file(root_name);
        target.sources.push(crate_root);
        target.rust_values = Some(RustValues {
            crate_name: tagane::atom::Atom::new(crate_name),
            crate_root,
            crate_type: CrateType::Auto,
            edition: "2015".to_owned(),
            aliased_deps: std::collections::BTreeMap::new(),
        });
        self.refresh_source_kinds(id);
        id
    }

    /// Recompute the used-source-kind bitset after editing `sources`.
    pub fn refresh_source_kinds(&mut self, id: TargetId) {
        let target = self.graph.target_mut(id);
        target.source_kinds_used = target.sources.iter().map(SourceFile::kind).collect();
    }

    #[must_use]
    pub fn graph(&self) -> &BuildGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut BuildGraph {
        &mut self.graph
    }

    #[must_use]
    pub fn target_mut(&mut self, id: TargetId) -> &mut Target {
        self.graph.target_mut(id)
    }

    #[must_use]
    pub fn into_graph(self) -> BuildGraph {
        self.graph
    }
}
