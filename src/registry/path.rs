//! Path canonicalization for lock comparisons.
//!
//! Every equality or prefix test in the registry runs on [`CanonicalPath`]:
//! forward slashes only, no repeated slashes, no trailing slash. The root path
//! (`/`, `\`, or the empty string) canonicalizes to the empty string.

use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Deserializer, Serialize};

pub const SEPARATOR: char = '/';

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CanonicalPath(String);

/// Canonicalize a raw path string. Idempotent.
pub fn normalize(raw: &str) -> CanonicalPath {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        let ch = if ch == '\\' { SEPARATOR } else { ch };
        if ch == SEPARATOR && out.ends_with(SEPARATOR) {
            continue;
        }
        out.push(ch);
    }
    // Repeated slashes are already collapsed, so at most one trails.
    if out.ends_with(SEPARATOR) {
        out.pop();
    }
    CanonicalPath(out)
}

impl CanonicalPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// `self + "/"`, the prefix every strict descendant starts with.
    pub fn child_prefix(&self) -> String {
        let mut prefix = String::with_capacity(self.0.len() + 1);
        prefix.push_str(&self.0);
        prefix.push(SEPARATOR);
        prefix
    }

    /// Separator-bounded prefix test: `a` is an ancestor of `a/b` but not of `ab`.
    pub fn is_strict_ancestor_of(&self, other: &CanonicalPath) -> bool {
        if self.is_root() {
            return !other.is_root();
        }
        other.0.len() > self.0.len()
            && other.0.starts_with(self.0.as_str())
            && other.0.as_bytes()[self.0.len()] == SEPARATOR as u8
    }

    /// Proper ancestors, shortest first. Excludes root and `self`.
    pub fn ancestors(&self) -> impl Iterator<Item = CanonicalPath> + '_ {
        self.0
            .match_indices(SEPARATOR)
            .filter(|(idx, _)| *idx > 0)
            .map(move |(idx, _)| CanonicalPath(self.0[..idx].to_string()))
    }

    /// Append a relative remainder under this path.
    pub fn join(&self, rest: &str) -> CanonicalPath {
        if self.is_root() {
            return normalize(rest);
        }
        normalize(&format!("{}{}{}", self.0, SEPARATOR, rest))
    }

    /// Re-root a strict descendant of `from` under `to`. Returns `None` when
    /// `self` is not strictly under `from`, or when `from` is root.
    pub fn rebase(&self, from: &CanonicalPath, to: &CanonicalPath) -> Option<CanonicalPath> {
        if from.is_root() || !from.is_strict_ancestor_of(self) {
            return None;
        }
        Some(to.join(&self.0[from.0.len() + 1..]))
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CanonicalPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CanonicalPath {
    fn from(raw: &str) -> Self {
        normalize(raw)
    }
}

impl From<String> for CanonicalPath {
    fn from(raw: String) -> Self {
        normalize(&raw)
    }
}

impl<'de> Deserialize<'de> for CanonicalPath {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(normalize(&raw))
    }
}
