//! Structured target identifiers.
//!
//! A label names one target: `//dir:name`, optionally qualified by the
//! toolchain it is built in, `//dir:name(//toolchain_dir:toolchain_name)`.
//! Labels order and hash by content, so a list sorted by label is stable
//! across runs.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::atom::Atom;
use crate::source_file::SourceDir;

/// A structured target identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label {
    dir: SourceDir,
    name: Atom,
    toolchain_dir: SourceDir,
    toolchain_name: Atom,
}

impl Label {
    #[must_use]
    pub fn new(dir: SourceDir, name: &str) -> Self {
        Self {
            dir,
            name: Atom::new(name),
            toolchain_dir: SourceDir::default(),
            toolchain_name: Atom::default(),
        }
    }

    #[must_use]
    pub fn with_toolchain(mut self, toolchain_dir: SourceDir, toolchain_name: &str) -> Self {
        self.toolchain_dir = toolchain_dir;
        self.toolchain_name = Atom::new(toolchain_name);
        self
    }

    /// Parse a label of the form `//dir:name` or `//dir` (name defaults to
    /// the last directory component). Returns `None` for malformed input.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        if !text.starts_with("//") {
            return None;
        }
        let (dir, name) = match text.split_once(':') {
            Some((dir, name)) if !name.is_empty() => (dir.to_owned(), name.to_owned()),
            Some(_) => return None,
            None => {
                let name = text.trim_end_matches('/').rsplit('/').next()?;
                if name.is_empty() {
                    return None;
                }
                (text.to_owned(), name.to_owned())
            }
        };
        Some(Self::new(SourceDir::new(&dir), &name))
    }

    #[must_use]
    pub fn dir(&self) -> SourceDir {
        self.dir
    }

    #[must_use]
    pub fn name(&self) -> Atom {
        self.name
    }

    #[must_use]
    pub fn toolchain_dir(&self) -> SourceDir {
        self.toolchain_dir
    }

    #[must_use]
    pub fn toolchain_name(&self) -> Atom {
        self.toolchain_name
    }

    /// The `//dir:name` form without the toolchain qualifier, which is what
    /// user-facing output uses.
    #[must_use]
    pub fn to_user_visible(&self) -> String {
        format!("{}:{}", self.dir.as_str().trim_end_matches('/'), self.name)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_user_visible())?;
        if !self.toolchain_name.is_empty() {
            write!(
                f,
                "({}:{})",
                self.toolchain_dir.as_str().trim_end_matches('/'),
                self.toolchain_name
            )?;
        }
        Ok(())
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_user_visible())
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("malformed label: {text}")))
    }
}
