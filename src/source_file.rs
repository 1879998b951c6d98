//! Source path types and suffix classification.
//!
//! Paths inside the target graph are *source-absolute*: they start with `//`
//! and are relative to the project root, like `//foo/main.rs`. Both path
//! types are atom-backed so that the resolver can copy them by the word and
//! compare them by pointer. A [`SourceDir`] always carries a trailing slash.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::atom::Atom;

/// Classification of a source file by its final extension.
///
/// Matching is case-sensitive; `.S` assembly is folded into [`SourceKind::S`]
/// because the toolchains treat both spellings identically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Cpp,
    H,
    C,
    M,
    Mm,
    Rc,
    S,
    O,
    Def,
    Rs,
    Go,
    Swift,
    Unknown,
}

impl SourceKind {
    /// Map a path's final extension to its source kind.
    #[must_use]
    pub fn classify(path: &str) -> Self {
        let Some((_, extension)) = path.rsplit_once('.') else {
            return Self::Unknown;
        };
        if extension.contains('/') {
            // A dot in a directory component is not an extension.
            return Self::Unknown;
        }
        match extension {
            "cc" | "cpp" | "cxx" => Self::Cpp,
            "h" | "hpp" | "hxx" | "hh" | "inc" => Self::H,
            "c" => Self::C,
            "m" => Self::M,
            "mm" => Self::Mm,
            "rc" => Self::Rc,
            "s" | "S" | "asm" => Self::S,
            "o" | "obj" => Self::O,
            "def" => Self::Def,
            "rs" => Self::Rs,
            "go" => Self::Go,
            "swift" => Self::Swift,
            _ => Self::Unknown,
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// The set of source kinds used by one target, as a bitset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SourceKindSet(u16);

impl SourceKindSet {
    pub fn set(&mut self, kind: SourceKind) {
        self.0 |= kind.bit();
    }

    #[must_use]
    pub fn contains(self, kind: SourceKind) -> bool {
        self.0 & kind.bit() != 0
    }

    #[must_use]
    pub fn rust_source_used(self) -> bool {
        self.contains(SourceKind::Rs)
    }

    #[must_use]
    pub fn swift_source_used(self) -> bool {
        self.contains(SourceKind::Swift)
    }
}

impl FromIterator<SourceKind> for SourceKindSet {
    fn from_iter<I: IntoIterator<Item = SourceKind>>(iter: I) -> Self {
        let mut set = Self::default();
        for kind in iter {
            set.set(kind);
        }
        set
    }
}

/// A source-absolute file path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceFile(Atom);

impl SourceFile {
    #[must_use]
    pub fn new(path: &str) -> Self {
        Self(Atom::new(path))
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.0.as_str()
    }

    #[must_use]
    pub fn kind(&self) -> SourceKind {
        SourceKind::classify(self.as_str())
    }

    /// The file name including its extension.
    #[must_use]
    pub fn file_part(&self) -> &'static str {
        let path = self.as_str();
        path.rsplit_once('/').map_or(path, |(_, name)| name)
    }

    /// The file name with its extension removed.
    #[must_use]
    pub fn name_part(&self) -> &'static str {
        let name = self.file_part();
        name.rsplit_once('.').map_or(name, |(stem, _)| stem)
    }

    /// Rewrite this path relative to `dir`, producing the `../..`-style form
    /// the build manifest uses for files outside the build directory.
    #[must_use]
    pub fn rebase_to(&self, dir: &SourceDir) -> Utf8PathBuf {
        rebase(self.as_str(), dir.as_str())
    }
}

impl std::fmt::Display for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source-absolute directory path with a trailing slash.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SourceDir(Atom);

impl SourceDir {
    /// Construct a directory path, appending the trailing slash when the
    /// input lacks one.
    #[must_use]
    pub fn new(path: &str) -> Self {
        if path.is_empty() || path.ends_with('/') {
            return Self(Atom::new(path));
        }
        let mut owned = String::with_capacity(path.len() + 1);
        owned.push_str(path);
        owned.push('/');
        Self(Atom::new(&owned))
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.0.as_str()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolve a path relative to this directory into a source-absolute file.
    #[must_use]
    pub fn resolve_file(&self, relative: &str) -> SourceFile {
        if relative.starts_with("//") || relative.starts_with('/') {
            return SourceFile::new(relative);
        }
        SourceFile::new(&format!("{}{relative}", self.as_str()))
    }
}

impl<'de> Deserialize<'de> for SourceDir {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let path = String::deserialize(deserializer)?;
        Ok(Self::new(&path))
    }
}

impl std::fmt::Display for SourceDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rewrite the source-absolute `path` relative to the source-absolute `dir`.
fn rebase(path: &str, dir: &str) -> Utf8PathBuf {
    let path = path.trim_start_matches("//");
    let dir = dir.trim_start_matches("//").trim_end_matches('/');

    let mut path_segments = path.split('/').peekable();
    let mut dir_segments = if dir.is_empty() {
        Vec::new()
    } else {
        dir.split('/').collect::<Vec<_>>()
    };

    // Drop the shared leading segments; the path's final segment is the file
    // name and never participates in the prefix.
    let mut shared = 0;
    for segment in &dir_segments {
        match path_segments.peek() {
            Some(next) if next == segment => {
                path_segments.next();
                shared += 1;
            }
            _ => break,
        }
    }
    dir_segments.drain(..shared);

    let mut result = Utf8PathBuf::new();
    for _ in &dir_segments {
        result.push("..");
    }
    for segment in path_segments {
        result.push(segment);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("//foo/bar.cc", SourceKind::Cpp)]
    #[case("//foo/bar.h", SourceKind::H)]
    #[case("//foo/bar.c", SourceKind::C)]
    #[case("//foo/bar.rs", SourceKind::Rs)]
    #[case("//foo/bar.swift", SourceKind::Swift)]
    #[case("//foo/bar.go", SourceKind::Go)]
    #[case("//foo/bar.S", SourceKind::S)]
    #[case("//foo/bar.o", SourceKind::O)]
    #[case("//foo/bar", SourceKind::Unknown)]
    #[case("//foo.dir/bar", SourceKind::Unknown)]
    #[case("//foo/bar.RS", SourceKind::Unknown)]
    fn classifies_by_final_extension(#[case] path: &str, #[case] expected: SourceKind) {
        assert_eq!(SourceKind::classify(path), expected);
    }

    #[rstest]
    fn kind_set_tracks_used_kinds() {
        let set: SourceKindSet = [SourceKind::Rs, SourceKind::C].into_iter().collect();
        assert!(set.rust_source_used());
        assert!(set.contains(SourceKind::C));
        assert!(!set.contains(SourceKind::Cpp));
    }

    #[rstest]
    fn file_and_name_parts() {
        let file = SourceFile::new("//foo/bar/main.rs");
        assert_eq!(file.file_part(), "main.rs");
        assert_eq!(file.name_part(), "main");
    }

    #[rstest]
    fn dir_gains_trailing_slash() {
        assert_eq!(SourceDir::new("//foo").as_str(), "//foo/");
        assert_eq!(SourceDir::new("//foo/").as_str(), "//foo/");
    }

    #[rstest]
    #[case("//foo/main.rs", "//out/Debug/", "../../foo/main.rs")]
    #[case("//out/Debug/gen/a.rs", "//out/Debug/", "gen/a.rs")]
    #[case("//out/other.rs", "//out/Debug/", "../other.rs")]
    #[case("//main.rs", "//out/Debug/", "../../main.rs")]
    fn rebases_against_build_dir(#[case] path: &str, #[case] dir: &str, #[case] expected: &str) {
        let file = SourceFile::new(path);
        assert_eq!(file.rebase_to(&SourceDir::new(dir)), Utf8PathBuf::from(expected));
    }

    #[rstest]
    fn resolve_file_joins_relative_paths() {
        let dir = SourceDir::new("//foo/");
        assert_eq!(dir.resolve_file("bar.rs").as_str(), "//foo/bar.rs");
        assert_eq!(dir.resolve_file("//abs/baz.rs").as_str(), "//abs/baz.rs");
    }
}
