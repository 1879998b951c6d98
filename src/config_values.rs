//! Per-config value blocks and their aggregation order.
//!
//! Every target owns one [`ConfigValues`] block and may have further blocks
//! attached by configs. The resolver and writers never look at a block in
//! isolation: they iterate the target's own values first and then each
//! attached config in declaration order, via [`ConfigValuesIter`]. That
//! iteration order is load-bearing: it decides the order of `-L` and `-l`
//! flags in the emitted rules.

use serde::{Deserialize, Serialize};

use crate::atom::Atom;
use crate::source_file::{SourceDir, SourceFile};

/// A library reference: either a bare name (`foo`) or a path to a file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LibFile(Atom);

impl LibFile {
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self(Atom::new(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.0.as_str()
    }

    /// True when the reference is a path rather than a `-l` style name.
    #[must_use]
    pub fn is_path(&self) -> bool {
        self.0.as_str().contains('/')
    }
}

impl std::fmt::Display for LibFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The values one config contributes to a target.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigValues {
    pub lib_dirs: Vec<SourceDir>,
    pub libs: Vec<LibFile>,
    pub framework_dirs: Vec<SourceDir>,
    pub frameworks: Vec<String>,
    pub weak_frameworks: Vec<String>,
    pub rustflags: Vec<String>,
    pub rustenv: Vec<String>,
    pub inputs: Vec<SourceFile>,
}

impl ConfigValues {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lib_dirs.is_empty()
            && self.libs.is_empty()
            && self.framework_dirs.is_empty()
            && self.frameworks.is_empty()
            && self.weak_frameworks.is_empty()
            && self.rustflags.is_empty()
            && self.rustenv.is_empty()
            && self.inputs.is_empty()
    }
}

/// Iterates a target's own values followed by each attached config.
pub struct ConfigValuesIter<'a> {
    own: Option<&'a ConfigValues>,
    configs: std::slice::Iter<'a, ConfigValues>,
}

impl<'a> ConfigValuesIter<'a> {
    #[must_use]
    pub fn new(own: &'a ConfigValues, configs: &'a [ConfigValues]) -> Self {
        Self {
            own: Some(own),
            configs: configs.iter(),
        }
    }
}

impl<'a> Iterator for ConfigValuesIter<'a> {
    type Item = &'a ConfigValues;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(own) = self.own.take() {
            return Some(own);
        }
        self.configs.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn iterates_own_values_before_configs() {
        let mut own = ConfigValues::default();
        own.libs.push(LibFile::new("own"));
        let mut attached = ConfigValues::default();
        attached.libs.push(LibFile::new("attached"));
        let configs = vec![attached];

        let seen: Vec<&str> = ConfigValuesIter::new(&own, &configs)
            .flat_map(|values| values.libs.iter().map(LibFile::as_str))
            .collect();
        assert_eq!(seen, vec!["own", "attached"]);
    }

    #[rstest]
    #[case("foo", false)]
    #[case("//third_party/libfoo.a", true)]
    fn lib_file_path_detection(#[case] value: &str, #[case] is_path: bool) {
        assert_eq!(LibFile::new(value).is_path(), is_path);
    }
}
