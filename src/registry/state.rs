use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{
    index::{first_under, AncestorIndex},
    path::CanonicalPath,
};
use crate::{Error, Result};

/// The locked set of one instance together with its derived ancestor index.
///
/// Neither collection is reachable mutably from outside; every change runs
/// through [`LockState::mutate`], which rebuilds the index whenever the locked
/// set changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockState {
    locked: BTreeSet<CanonicalPath>,
    index: AncestorIndex,
}

/// Outcome of a batch check. `locked_paths` holds one entry per offending
/// input, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockQueryResult {
    pub has_locked: bool,
    pub locked_paths: Vec<CanonicalPath>,
}

impl LockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from persisted entries. Entries are re-normalized by the caller's
    /// deserializer; root entries are dropped.
    pub fn from_paths<I>(paths: I) -> Self
    where
        I: IntoIterator<Item = CanonicalPath>,
    {
        let locked: BTreeSet<CanonicalPath> =
            paths.into_iter().filter(|p| !p.is_root()).collect();
        let index = AncestorIndex::rebuild(&locked);
        Self { locked, index }
    }

    pub fn len(&self) -> usize {
        self.locked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locked.is_empty()
    }

    pub fn index(&self) -> &AncestorIndex {
        &self.index
    }

    /// Locked entries in sorted order.
    pub fn locked_paths(&self) -> impl Iterator<Item = &CanonicalPath> {
        self.locked.iter()
    }

    /// Ancestor index entries in sorted order.
    pub fn ancestor_paths(&self) -> impl Iterator<Item = &CanonicalPath> {
        self.index.iter()
    }

    /// Exact membership, ignoring ancestors. Drives the per-entry `locked`
    /// flag of directory listings.
    pub fn is_directly_locked(&self, path: &CanonicalPath) -> bool {
        self.locked.contains(path)
    }

    /// `path` or one of its ancestors is locked.
    pub fn is_locked(&self, path: &CanonicalPath) -> bool {
        self.locking_entry(path).is_some()
    }

    /// The registry entry that makes `path` effectively locked: `path` itself,
    /// else its outermost locked ancestor.
    pub fn locking_entry(&self, path: &CanonicalPath) -> Option<&CanonicalPath> {
        if path.is_root() {
            return None;
        }
        if let Some(entry) = self.locked.get(path) {
            return Some(entry);
        }
        path.ancestors().find_map(|a| self.locked.get(&a))
    }

    /// Some locked entry strictly nested under `path`, if any.
    pub fn contains_locked_descendant(&self, path: &CanonicalPath) -> Option<&CanonicalPath> {
        if !self.index.may_contain_lock(path) {
            return None;
        }
        first_under(&self.locked, path)
    }

    /// `path` itself when it is effectively locked, else a locked descendant.
    pub fn is_locked_or_contains(&self, path: &CanonicalPath) -> Option<CanonicalPath> {
        if self.is_locked(path) {
            return Some(path.clone());
        }
        self.contains_locked_descendant(path).cloned()
    }

    pub fn check_many<'a, I>(&self, paths: I, check_contents: bool) -> LockQueryResult
    where
        I: IntoIterator<Item = &'a CanonicalPath>,
    {
        let locked_paths: Vec<CanonicalPath> = paths
            .into_iter()
            .filter(|path| {
                if check_contents {
                    self.is_locked_or_contains(path).is_some()
                } else {
                    self.is_locked(path)
                }
            })
            .cloned()
            .collect();
        LockQueryResult {
            has_locked: !locked_paths.is_empty(),
            locked_paths,
        }
    }

    /// Explicit lock action. Rejects root before touching anything.
    pub fn add_locks<'a, I>(&mut self, paths: I) -> Result<bool>
    where
        I: IntoIterator<Item = &'a CanonicalPath>,
    {
        let paths: Vec<&CanonicalPath> = paths.into_iter().collect();
        if paths.iter().any(|p| p.is_root()) {
            return Err(Error::InvalidPath("the root directory cannot be locked".into()).into());
        }
        Ok(self.mutate(|locked| {
            paths
                .into_iter()
                .fold(false, |changed, p| locked.insert(p.clone()) | changed)
        }))
    }

    /// Explicit unlock action. Absent entries are ignored.
    pub fn remove_locks<'a, I>(&mut self, paths: I) -> bool
    where
        I: IntoIterator<Item = &'a CanonicalPath>,
    {
        self.mutate(|locked| {
            paths
                .into_iter()
                .fold(false, |changed, p| locked.remove(p) | changed)
        })
    }

    /// Single mutation entry point: apply `f` to the locked set and rebuild
    /// the index if it reports a change.
    pub(super) fn mutate<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(&mut BTreeSet<CanonicalPath>) -> bool,
    {
        let changed = f(&mut self.locked);
        if changed {
            self.index = AncestorIndex::rebuild(&self.locked);
        }
        changed
    }
}
