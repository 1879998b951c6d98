//! Tool and toolchain descriptors.
//!
//! A [`Tool`] describes how one class of build step is invoked: its command
//! template, how its output file names are synthesised, and which
//! substitution tokens its templates may reference. Tools come in four
//! variants: C-family compilers/linkers, the Rust compiler, general tools
//! (stamp, copy) and the single built-in `phony` tool. A [`Toolchain`]
//! bundles tools keyed by source kind plus a handful of named tools for
//! link and stamp steps.
//!
//! All validation happens at init time, from a deserialised [`ToolSpec`]:
//! a tool that survives [`Tool::from_spec`] is complete and internally
//! consistent, so the writers never re-check it.

mod substitution;

pub use substitution::{Substitution, SubstitutionBits, SubstitutionPattern};

use std::collections::BTreeMap;

use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

use crate::atom::Atom;
use crate::source_file::SourceKind;
use crate::target::{CrateType, OutputType};

/// The name every built-in tool must carry.
pub const BUILTIN_TOOL_PHONY: &str = "phony";
/// The conventional name of the stamp tool.
pub const TOOL_STAMP: &str = "stamp";

/// Errors raised while initialising a tool from its spec.
#[derive(Debug, Error, Diagnostic)]
pub enum ToolError {
    #[error("tool \"{tool}\" has no command")]
    #[diagnostic(
        code(tagane::tools::missing_command),
        help("every tool except the built-in phony tool must set a command template")
    )]
    MissingCommand { tool: String },

    #[error("tool \"{tool}\" declares no outputs")]
    #[diagnostic(
        code(tagane::tools::missing_outputs),
        help("compiler and linker tools must declare at least one output pattern")
    )]
    MissingOutputs { tool: String },

    #[error("tool \"{tool}\" lists runtime output \"{pattern}\" that is not in outputs")]
    #[diagnostic(
        code(tagane::tools::runtime_output_not_in_outputs),
        help("runtime_outputs must be a subset of outputs")
    )]
    RuntimeOutputNotInOutputs { tool: String, pattern: String },

    #[error("tool \"{tool}\" references substitution {token} which is not valid here")]
    #[diagnostic(
        code(tagane::tools::invalid_substitution),
        help("each tool variant accepts a fixed set of substitution tokens")
    )]
    InvalidSubstitution { tool: String, token: String },

    #[error("\"{name}\" is not a valid tool name for this variant")]
    #[diagnostic(
        code(tagane::tools::invalid_name),
        help("the only built-in tool is \"phony\"")
    )]
    InvalidName { name: String },

    #[error("tool \"{tool}\" sets only one of link_output and depend_output")]
    #[diagnostic(
        code(tagane::tools::mismatched_link_outputs),
        help("link_output and depend_output must be set together")
    )]
    MismatchedLinkOutputs { tool: String },
}

/// Per-crate-type output extensions of a Rust tool.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RustToolValues {
    pub exe_output_extension: String,
    pub rlib_output_extension: String,
    pub dylib_output_extension: String,
    pub cdylib_output_extension: String,
    pub staticlib_output_extension: String,
    pub proc_macro_output_extension: String,
    pub sysroot: Option<String>,
}

impl Default for RustToolValues {
    fn default() -> Self {
        Self {
            exe_output_extension: String::new(),
            rlib_output_extension: ".rlib".to_owned(),
            dylib_output_extension: ".so".to_owned(),
            cdylib_output_extension: ".so".to_owned(),
            staticlib_output_extension: ".a".to_owned(),
            proc_macro_output_extension: ".so".to_owned(),
            sysroot: None,
        }
    }
}

impl RustToolValues {
    /// Resolve the leading-dot output extension for a target.
    ///
    /// `Auto` is resolved through the target's output type; explicit crate
    /// types map directly to their per-type extension.
    #[must_use]
    pub fn rustc_output_extension(&self, output_type: OutputType, crate_type: CrateType) -> &str {
        match crate_type.resolve(output_type) {
            CrateType::Bin => &self.exe_output_extension,
            CrateType::Rlib => &self.rlib_output_extension,
            CrateType::Dylib => &self.dylib_output_extension,
            CrateType::CDylib => &self.cdylib_output_extension,
            CrateType::StaticLib => &self.staticlib_output_extension,
            CrateType::ProcMacro => &self.proc_macro_output_extension,
            // `resolve` never returns Auto.
            CrateType::Auto => "",
        }
    }
}

/// The variant-specific half of a tool.
#[derive(Clone, Debug)]
pub enum ToolKind {
    CFamily,
    Rust(RustToolValues),
    General,
    Builtin,
}

impl ToolKind {
    fn allowed_substitutions(&self) -> SubstitutionBits {
        let common = [
            Substitution::Source,
            Substitution::SourceNamePart,
            Substitution::SourceFilePart,
            Substitution::Output,
            Substitution::ResponseFileName,
            Substitution::OutputDir,
        ];
        match self {
            Self::Rust(_) => Substitution::ALL.into_iter().collect(),
            Self::CFamily | Self::General => common.into_iter().collect(),
            Self::Builtin => [Substitution::Source, Substitution::Output]
                .into_iter()
                .collect(),
        }
    }
}

/// A validated tool descriptor.
#[derive(Clone, Debug)]
pub struct Tool {
    name: Atom,
    kind: ToolKind,
    command: Option<SubstitutionPattern>,
    command_launcher: String,
    description: Option<SubstitutionPattern>,
    outputs: Vec<SubstitutionPattern>,
    runtime_outputs: Vec<SubstitutionPattern>,
    link_output: Option<SubstitutionPattern>,
    depend_output: Option<SubstitutionPattern>,
    output_prefix: String,
    default_output_extension: String,
}

impl Tool {
    /// Validate `spec` into a complete tool.
    ///
    /// # Errors
    ///
    /// See [`ToolError`] for the individual failure modes; the first
    /// violation encountered is reported.
    pub fn from_spec(spec: ToolSpec) -> Result<Self, ToolError> {
        let kind = match spec.kind {
            ToolKindSpec::CFamily => ToolKind::CFamily,
            ToolKindSpec::Rust => ToolKind::Rust(spec.rust.clone()),
            ToolKindSpec::General => ToolKind::General,
            ToolKindSpec::Builtin => ToolKind::Builtin,
        };

        if matches!(kind, ToolKind::Builtin) && spec.name != BUILTIN_TOOL_PHONY {
            return Err(ToolError::InvalidName { name: spec.name });
        }
        if spec.name.is_empty() {
            return Err(ToolError::InvalidName { name: spec.name });
        }

        let command = match &spec.command {
            Some(command) if !command.is_empty() => {
                Some(parse_pattern(&spec.name, command, &kind)?)
            }
            _ if matches!(kind, ToolKind::Builtin) => None,
            _ => {
                return Err(ToolError::MissingCommand { tool: spec.name });
            }
        };

        let description = spec
            .description
            .as_deref()
            .map(|template| parse_pattern(&spec.name, template, &kind))
            .transpose()?;

        let outputs = parse_patterns(&spec.name, &spec.outputs, &kind)?;
        if outputs.is_empty() && matches!(kind, ToolKind::CFamily | ToolKind::Rust(_)) {
            return Err(ToolError::MissingOutputs { tool: spec.name });
        }

        let runtime_outputs = parse_patterns(&spec.name, &spec.runtime_outputs, &kind)?;
        for runtime in &runtime_outputs {
            if !outputs
                .iter()
                .any(|output| output.template() == runtime.template())
            {
                return Err(ToolError::RuntimeOutputNotInOutputs {
                    tool: spec.name,
                    pattern: runtime.template().to_owned(),
                });
            }
        }

        let link_output = spec
            .link_output
            .as_deref()
            .map(|template| parse_pattern(&spec.name, template, &kind))
            .transpose()?;
        let depend_output = spec
            .depend_output
            .as_deref()
            .map(|template| parse_pattern(&spec.name, template, &kind))
            .transpose()?;
        if link_output.is_some() != depend_output.is_some() {
            return Err(ToolError::MismatchedLinkOutputs { tool: spec.name });
        }

        Ok(Self {
            name: Atom::new(&spec.name),
            kind,
            command,
            command_launcher: spec.command_launcher.unwrap_or_default(),
            description,
            outputs,
            runtime_outputs,
            link_output,
            depend_output,
            output_prefix: spec.output_prefix,
            default_output_extension: spec.default_output_extension,
        })
    }

    #[must_use]
    pub fn name(&self) -> Atom {
        self.name
    }

    #[must_use]
    pub fn kind(&self) -> &ToolKind {
        &self.kind
    }

    /// The Rust-specific values, when this is a Rust tool.
    #[must_use]
    pub fn as_rust(&self) -> Option<&RustToolValues> {
        match &self.kind {
            ToolKind::Rust(values) => Some(values),
            _ => None,
        }
    }

    #[must_use]
    pub fn command(&self) -> Option<&SubstitutionPattern> {
        self.command.as_ref()
    }

    #[must_use]
    pub fn command_launcher(&self) -> &str {
        &self.command_launcher
    }

    #[must_use]
    pub fn description(&self) -> Option<&SubstitutionPattern> {
        self.description.as_ref()
    }

    #[must_use]
    pub fn outputs(&self) -> &[SubstitutionPattern] {
        &self.outputs
    }

    #[must_use]
    pub fn runtime_outputs(&self) -> &[SubstitutionPattern] {
        &self.runtime_outputs
    }

    #[must_use]
    pub fn link_output(&self) -> Option<&SubstitutionPattern> {
        self.link_output.as_ref()
    }

    #[must_use]
    pub fn depend_output(&self) -> Option<&SubstitutionPattern> {
        self.depend_output.as_ref()
    }

    #[must_use]
    pub fn output_prefix(&self) -> &str {
        &self.output_prefix
    }

    #[must_use]
    pub fn default_output_extension(&self) -> &str {
        &self.default_output_extension
    }

    /// The union of substitution tokens referenced by any template of this
    /// tool.
    #[must_use]
    pub fn substitution_bits(&self) -> SubstitutionBits {
        let mut bits = SubstitutionBits::default();
        for pattern in self
            .command
            .iter()
            .chain(self.description.iter())
            .chain(self.outputs.iter())
            .chain(self.runtime_outputs.iter())
            .chain(self.link_output.iter())
            .chain(self.depend_output.iter())
        {
            bits.merge(pattern.bits());
        }
        bits
    }
}

fn parse_pattern(tool: &str, template: &str, kind: &ToolKind) -> Result<SubstitutionPattern, ToolError> {
    let pattern =
        SubstitutionPattern::parse(template).map_err(|token| ToolError::InvalidSubstitution {
            tool: tool.to_owned(),
            token,
        })?;
    if !pattern.bits().is_subset_of(kind.allowed_substitutions()) {
        let offending = pattern
            .bits()
            .iter()
            .find(|token| !kind.allowed_substitutions().contains(*token))
            .map(|token| token.to_string())
            .unwrap_or_default();
        return Err(ToolError::InvalidSubstitution {
            tool: tool.to_owned(),
            token: offending,
        });
    }
    Ok(pattern)
}

fn parse_patterns(
    tool: &str,
    templates: &[String],
    kind: &ToolKind,
) -> Result<Vec<SubstitutionPattern>, ToolError> {
    templates
        .iter()
        .map(|template| parse_pattern(tool, template, kind))
        .collect()
}

/// The serialised form of a tool, as produced by the front end.
#[derive(Clone, Debug, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub kind: ToolKindSpec,
    #[serde(default)]
    pub source_kinds: Vec<SourceKind>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub command_launcher: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub runtime_outputs: Vec<String>,
    #[serde(default)]
    pub link_output: Option<String>,
    #[serde(default)]
    pub depend_output: Option<String>,
    #[serde(default)]
    pub output_prefix: String,
    #[serde(default)]
    pub default_output_extension: String,
    #[serde(flatten)]
    pub rust: RustToolValues,
}

/// Tool variant selector in the serialised form.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKindSpec {
    CFamily,
    Rust,
    General,
    Builtin,
}

/// A named bundle of tools for one toolchain.
#[derive(Debug)]
pub struct Toolchain {
    by_kind: BTreeMap<SourceKind, usize>,
    by_name: BTreeMap<Atom, usize>,
    tools: Vec<Tool>,
    substitution_bits: SubstitutionBits,
}

impl Toolchain {
    /// Build a toolchain from validated tools. Tools claiming a source kind
    /// already claimed by an earlier tool lose the tie; name lookups behave
    /// the same way.
    #[must_use]
    pub fn new(tools: Vec<(Tool, Vec<SourceKind>)>) -> Self {
        let mut by_kind = BTreeMap::new();
        let mut by_name = BTreeMap::new();
        let mut stored = Vec::with_capacity(tools.len());
        let mut substitution_bits = SubstitutionBits::default();
        for (tool, kinds) in tools {
            let index = stored.len();
            substitution_bits.merge(tool.substitution_bits());
            by_name.entry(tool.name()).or_insert(index);
            for kind in kinds {
                by_kind.entry(kind).or_insert(index);
            }
            stored.push(tool);
        }
        Self {
            by_kind,
            by_name,
            tools: stored,
            substitution_bits,
        }
    }

    #[must_use]
    pub fn tool_for_kind(&self, kind: SourceKind) -> Option<&Tool> {
        self.by_kind.get(&kind).map(|index| &self.tools[*index])
    }

    #[must_use]
    pub fn named_tool(&self, name: &str) -> Option<&Tool> {
        self.by_name
            .get(&Atom::new(name))
            .map(|index| &self.tools[*index])
    }

    /// The Rust tool, when one is mapped for `.rs` sources.
    #[must_use]
    pub fn rust_tool(&self) -> Option<&Tool> {
        self.tool_for_kind(SourceKind::Rs)
            .filter(|tool| matches!(tool.kind(), ToolKind::Rust(_)))
    }

    /// Every tool, in registration order.
    pub fn tools(&self) -> impl Iterator<Item = &Tool> {
        self.tools.iter()
    }

    #[must_use]
    pub fn substitution_bits(&self) -> SubstitutionBits {
        self.substitution_bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn rust_spec() -> ToolSpec {
        ToolSpec {
            name: "rustc".to_owned(),
            kind: ToolKindSpec::Rust,
            source_kinds: vec![SourceKind::Rs],
            command: Some(
                "{{rustenv}} rustc --crate-name {{crate_name}} {{source}} \
                 --crate-type {{crate_type}} {{rustflags}} -o {{output}} \
                 {{rustdeps}} {{externs}}"
                    .to_owned(),
            ),
            command_launcher: None,
            description: Some("RUST {{output}}".to_owned()),
            outputs: vec![
                "{{output_dir}}/{{rustc_output_prefix}}{{crate_name}}{{rustc_output_extension}}"
                    .to_owned(),
            ],
            runtime_outputs: Vec::new(),
            link_output: None,
            depend_output: None,
            output_prefix: String::new(),
            default_output_extension: String::new(),
            rust: RustToolValues::default(),
        }
    }

    #[rstest]
    fn rust_tool_round_trips_templates() {
        let tool = Tool::from_spec(rust_spec()).expect("tool");
        assert_eq!(tool.name().as_str(), "rustc");
        assert!(tool.substitution_bits().contains(Substitution::Externs));
        assert_eq!(
            tool.description().map(SubstitutionPattern::template),
            Some("RUST {{output}}")
        );
    }

    #[rstest]
    fn missing_command_is_rejected() {
        let mut spec = rust_spec();
        spec.command = None;
        assert!(matches!(
            Tool::from_spec(spec),
            Err(ToolError::MissingCommand { .. })
        ));
    }

    #[rstest]
    fn runtime_outputs_must_be_subset() {
        let mut spec = rust_spec();
        spec.runtime_outputs = vec!["{{output_dir}}/other".to_owned()];
        assert!(matches!(
            Tool::from_spec(spec),
            Err(ToolError::RuntimeOutputNotInOutputs { .. })
        ));
    }

    #[rstest]
    fn crate_substitutions_are_invalid_for_c_tools() {
        let spec = ToolSpec {
            name: "cxx".to_owned(),
            kind: ToolKindSpec::CFamily,
            source_kinds: vec![SourceKind::Cpp],
            command: Some("c++ {{crate_name}}".to_owned()),
            command_launcher: None,
            description: None,
            outputs: vec!["{{source_name_part}}.o".to_owned()],
            runtime_outputs: Vec::new(),
            link_output: None,
            depend_output: None,
            output_prefix: String::new(),
            default_output_extension: String::new(),
            rust: RustToolValues::default(),
        };
        assert!(matches!(
            Tool::from_spec(spec),
            Err(ToolError::InvalidSubstitution { .. })
        ));
    }

    #[rstest]
    fn builtin_tool_must_be_phony() {
        let spec = ToolSpec {
            name: "ghost".to_owned(),
            kind: ToolKindSpec::Builtin,
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
            rust: RustToolValues::default(),
        };
        assert!(matches!(
            Tool::from_spec(spec),
            Err(ToolError::InvalidName { .. })
        ));
    }

    #[rstest]
    fn link_and_depend_outputs_are_set_together() {
        let mut spec = rust_spec();
        spec.link_output = Some("{{output_dir}}/lib".to_owned());
        assert!(matches!(
            Tool::from_spec(spec),
            Err(ToolError::MismatchedLinkOutputs { .. })
        ));
    }

    #[rstest]
    #[case(OutputType::Executable, CrateType::Auto, "")]
    #[case(OutputType::StaticLibrary, CrateType::Auto, ".a")]
    #[case(OutputType::RustLibrary, CrateType::Auto, ".rlib")]
    #[case(OutputType::Executable, CrateType::CDylib, ".so")]
    #[case(OutputType::RustProcMacro, CrateType::Auto, ".so")]
    fn output_extension_matrix(
        #[case] output_type: OutputType,
        #[case] crate_type: CrateType,
        #[case] expected: &str,
    ) {
        let values = RustToolValues::default();
        assert_eq!(
            values.rustc_output_extension(output_type, crate_type),
            expected
        );
    }

    #[rstest]
    fn toolchain_lookup_by_kind_and_name() {
        let tool = Tool::from_spec(rust_spec()).expect("tool");
        let toolchain = Toolchain::new(vec![(tool, vec![SourceKind::Rs])]);
        assert!(toolchain.rust_tool().is_some());
        assert!(toolchain.named_tool("rustc").is_some());
        assert!(toolchain.named_tool("stamp").is_none());
        assert!(toolchain.substitution_bits().contains(Substitution::RustDeps));
    }
}
