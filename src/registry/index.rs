//! Ancestor index: every folder that has at least one locked descendant.

use std::{collections::BTreeSet, ops::Bound};

use super::path::CanonicalPath;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AncestorIndex {
    folders: BTreeSet<CanonicalPath>,
}

impl AncestorIndex {
    /// Full rebuild from the locked set. Cost is linear in the total length of
    /// the locked paths, independent of the size of the underlying tree.
    pub fn rebuild<'a, I>(locked: I) -> Self
    where
        I: IntoIterator<Item = &'a CanonicalPath>,
    {
        let folders = locked
            .into_iter()
            .flat_map(|path| path.ancestors())
            .collect();
        Self { folders }
    }

    pub fn contains(&self, path: &CanonicalPath) -> bool {
        self.folders.contains(path)
    }

    /// Fast-path filter for descendant checks. `false` means no lock can live
    /// under `path`; `true` means the registry must be consulted.
    pub fn may_contain_lock(&self, path: &CanonicalPath) -> bool {
        // Top-level locks have no indexed ancestor, so root can't be ruled out.
        if path.is_root() {
            return true;
        }
        self.folders.contains(path) || first_under(&self.folders, path).is_some()
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanonicalPath> {
        self.folders.iter()
    }
}

/// First member of `set` strictly nested under `path`, via one range probe.
pub(crate) fn first_under<'a>(
    set: &'a BTreeSet<CanonicalPath>,
    path: &CanonicalPath,
) -> Option<&'a CanonicalPath> {
    if path.is_root() {
        return set.iter().find(|entry| !entry.is_root());
    }
    let prefix = path.child_prefix();
    set.range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
        .next()
        .filter(|entry| entry.as_str().starts_with(prefix.as_str()))
}

/// Every member of `set` strictly nested under `path`, in order.
pub(crate) fn all_under<'a>(
    set: &'a BTreeSet<CanonicalPath>,
    path: &'a CanonicalPath,
) -> impl Iterator<Item = &'a CanonicalPath> + 'a {
    let prefix = if path.is_root() {
        String::new()
    } else {
        path.child_prefix()
    };
    set.range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
        .take_while(move |entry| entry.as_str().starts_with(prefix.as_str()))
        .filter(|entry| !entry.is_root())
}
