//! Interned string atoms.
//!
//! An [`Atom`] is a copyable handle to a string in a process-wide interning
//! table. Interning byte-equal content twice yields the identical handle, so
//! equality is a pointer comparison and a clone is free. The table never
//! frees its storage: every handle stays valid for the lifetime of the
//! process, which is what lets the resolver treat atoms as plain words.
//!
//! Two orderings are available. The default [`Ord`] compares content
//! lexicographically and is stable across runs; [`Atom::ptr_cmp`] compares
//! handle addresses and is only meaningful within a single process. Anything
//! serialised to disk must use the default ordering.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, OnceLock};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The canonical empty string, shared by every default-constructed atom.
static EMPTY: &str = "";

static TABLE: OnceLock<Mutex<HashSet<&'static str>>> = OnceLock::new();

fn table() -> &'static Mutex<HashSet<&'static str>> {
    TABLE.get_or_init(|| Mutex::new(HashSet::new()))
}

/// A handle to an interned string.
#[derive(Clone, Copy)]
pub struct Atom(&'static str);

impl Atom {
    /// Intern `content` and return its canonical handle.
    ///
    /// The insertion path takes the table lock; repeated lookups of content
    /// that is already interned still lock but do not allocate.
    #[must_use]
    pub fn new(content: &str) -> Self {
        if content.is_empty() {
            return Self(EMPTY);
        }
        let mut table = table().lock().expect("atom table poisoned");
        if let Some(existing) = table.get(content) {
            return Self(existing);
        }
        let stored: &'static str = Box::leak(content.to_owned().into_boxed_str());
        table.insert(stored);
        Self(stored)
    }

    /// Borrow the interned content.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// True for the canonical empty atom.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Order by handle address rather than content.
    ///
    /// This is cheaper than the default ordering but process-local: the
    /// relative order of two atoms can differ between runs, so it must never
    /// decide anything that reaches serialised output.
    #[must_use]
    pub fn ptr_cmp(&self, other: &Self) -> Ordering {
        (self.0.as_ptr() as usize).cmp(&(other.0.as_ptr() as usize))
    }
}

impl Default for Atom {
    fn default() -> Self {
        Self(EMPTY)
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        // Interned handles are pointer-equal exactly when their content is
        // byte-equal.
        std::ptr::eq(self.0, other.0)
    }
}

impl Eq for Atom {}

impl Hash for Atom {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.as_ptr().hash(state);
    }
}

impl PartialOrd for Atom {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Atom {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(other.0)
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.0, f)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl From<&str> for Atom {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}

impl AsRef<str> for Atom {
    fn as_ref(&self) -> &str {
        self.0
    }
}

impl Serialize for Atom {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

impl<'de> Deserialize<'de> for Atom {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let content = String::deserialize(deserializer)?;
        Ok(Self::new(&content))
    }
}
