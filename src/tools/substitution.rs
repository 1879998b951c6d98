//! Substitution tokens and template patterns.
//!
//! Command, description and output templates reference per-target values
//! through `{{...}}` tokens. A [`SubstitutionPattern`] is the parsed form of
//! one template: literal runs interleaved with placeholders, plus a bitset
//! of every token it references. Tool init validates the bitset against the
//! tool variant's whitelist, so an invalid token is rejected before any
//! rule is written.

use std::fmt;

/// A substitution token recognised inside tool templates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Substitution {
    Source,
    SourceNamePart,
    SourceFilePart,
    Output,
    ResponseFileName,
    CrateName,
    CrateType,
    Edition,
    Externs,
    RustcOutputExtension,
    RustcOutputPrefix,
    RustDeps,
    RustFlags,
    RustEnv,
    OutputDir,
}

impl Substitution {
    pub const ALL: [Self; 15] = [
        Self::Source,
        Self::SourceNamePart,
        Self::SourceFilePart,
        Self::Output,
        Self::ResponseFileName,
        Self::CrateName,
        Self::CrateType,
        Self::Edition,
        Self::Externs,
        Self::RustcOutputExtension,
        Self::RustcOutputPrefix,
        Self::RustDeps,
        Self::RustFlags,
        Self::RustEnv,
        Self::OutputDir,
    ];

    /// The bare token name, without braces.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::SourceNamePart => "source_name_part",
            Self::SourceFilePart => "source_file_part",
            Self::Output => "output",
            Self::ResponseFileName => "response_file_name",
            Self::CrateName => "crate_name",
            Self::CrateType => "crate_type",
            Self::Edition => "edition",
            Self::Externs => "externs",
            Self::RustcOutputExtension => "rustc_output_extension",
            Self::RustcOutputPrefix => "rustc_output_prefix",
            Self::RustDeps => "rustdeps",
            Self::RustFlags => "rustflags",
            Self::RustEnv => "rustenv",
            Self::OutputDir => "output_dir",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|token| token.name() == name)
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{{}}}}}", self.name())
    }
}

/// The set of substitution tokens referenced by a pattern, tool or
/// toolchain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubstitutionBits(u16);

impl SubstitutionBits {
    pub fn set(&mut self, token: Substitution) {
        self.0 |= token.bit();
    }

    #[must_use]
    pub fn contains(self, token: Substitution) -> bool {
        self.0 & token.bit() != 0
    }

    pub fn merge(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// True when every token in `self` is also in `allowed`.
    #[must_use]
    pub fn is_subset_of(self, allowed: Self) -> bool {
        self.0 & !allowed.0 == 0
    }

    /// The tokens present, in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Substitution> {
        Substitution::ALL
            .into_iter()
            .filter(move |token| self.contains(*token))
    }
}

impl FromIterator<Substitution> for SubstitutionBits {
    fn from_iter<I: IntoIterator<Item = Substitution>>(iter: I) -> Self {
        let mut bits = Self::default();
        for token in iter {
            bits.set(token);
        }
        bits
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(Substitution),
}

/// A parsed template: literal text interleaved with substitution tokens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubstitutionPattern {
    template: String,
    segments: Vec<Segment>,
    bits: SubstitutionBits,
}

impl SubstitutionPattern {
    /// Parse `template`, rejecting unknown or unterminated tokens.
    ///
    /// # Errors
    ///
    /// Returns the offending token text when it is not a recognised
    /// substitution.
    pub fn parse(template: &str) -> Result<Self, String> {
        let mut segments = Vec::new();
        let mut bits = SubstitutionBits::default();
        let mut rest = template;
        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_owned()));
            }
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                return Err(rest[start..].to_owned());
            };
            let name = &after[..end];
            let Some(token) = Substitution::from_name(name) else {
                return Err(format!("{{{{{name}}}}}"));
            };
            segments.push(Segment::Placeholder(token));
            bits.set(token);
            rest = &after[end + 2..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_owned()));
        }
        Ok(Self {
            template: template.to_owned(),
            segments,
            bits,
        })
    }

    /// The original template text.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    #[must_use]
    pub fn bits(&self) -> SubstitutionBits {
        self.bits
    }

    /// Expand the pattern, resolving each placeholder through `lookup`.
    /// Placeholders the context has no value for expand to nothing.
    #[must_use]
    pub fn expand<F>(&self, mut lookup: F) -> String
    where
        F: FnMut(Substitution) -> Option<String>,
    {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(token) => {
                    if let Some(value) = lookup(*token) {
                        out.push_str(&value);
                    }
                }
            }
        }
        out
    }
}
