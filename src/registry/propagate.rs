//! Keeps the locked set consistent with create/delete/copy/move of the
//! underlying tree.
//!
//! Every operation is a no-op for root. Copy locks only the copied root while
//! move re-roots the whole locked subtree.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{index::all_under, path::CanonicalPath, state::LockState};

/// An identity-affecting filesystem change that already succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Mutation {
    Create { path: CanonicalPath, folder: bool },
    Delete { path: CanonicalPath },
    Copy { from: CanonicalPath, to: CanonicalPath },
    Move { from: CanonicalPath, to: CanonicalPath },
}

impl Mutation {
    pub fn create(path: CanonicalPath, folder: bool) -> Self {
        Self::Create { path, folder }
    }

    pub fn delete(path: CanonicalPath) -> Self {
        Self::Delete { path }
    }

    pub fn copy(from: CanonicalPath, to: CanonicalPath) -> Self {
        Self::Copy { from, to }
    }

    pub fn rename(from: CanonicalPath, to: CanonicalPath) -> Self {
        Self::Move { from, to }
    }

    fn apply_to(&self, locked: &mut BTreeSet<CanonicalPath>) -> bool {
        match self {
            Mutation::Create { path, folder } => clear(locked, path, *folder),
            Mutation::Delete { path } => clear(locked, path, true),
            Mutation::Copy { from, to } => copy_root(locked, from, to),
            Mutation::Move { from, to } => move_subtree(locked, from, to),
        }
    }
}

impl LockState {
    /// A path was (re)created. Drops a stale direct entry and, for folders,
    /// every stale nested entry.
    pub fn on_create(&mut self, path: &CanonicalPath, folder: bool) -> bool {
        self.mutate(|locked| clear(locked, path, folder))
    }

    pub fn on_delete(&mut self, path: &CanonicalPath) -> bool {
        self.mutate(|locked| clear(locked, path, true))
    }

    pub fn on_copy(&mut self, from: &CanonicalPath, to: &CanonicalPath) -> bool {
        self.mutate(|locked| copy_root(locked, from, to))
    }

    pub fn on_move(&mut self, from: &CanonicalPath, to: &CanonicalPath) -> bool {
        self.mutate(|locked| move_subtree(locked, from, to))
    }

    pub fn apply(&mut self, mutation: &Mutation) -> bool {
        self.mutate(|locked| mutation.apply_to(locked))
    }

    /// Apply a batch in order with a single index rebuild at the end.
    pub fn apply_all(&mut self, mutations: &[Mutation]) -> bool {
        self.mutate(|locked| {
            mutations
                .iter()
                .fold(false, |changed, m| m.apply_to(locked) | changed)
        })
    }
}

fn clear(locked: &mut BTreeSet<CanonicalPath>, path: &CanonicalPath, nested: bool) -> bool {
    if path.is_root() {
        return false;
    }
    let mut changed = locked.remove(path);
    if nested {
        let doomed: Vec<CanonicalPath> = all_under(locked, path).cloned().collect();
        for entry in &doomed {
            locked.remove(entry);
        }
        changed |= !doomed.is_empty();
    }
    changed
}

fn copy_root(locked: &mut BTreeSet<CanonicalPath>, from: &CanonicalPath, to: &CanonicalPath) -> bool {
    if from.is_root() || to.is_root() || from == to {
        return false;
    }
    locked.contains(from) && locked.insert(to.clone())
}

fn move_subtree(
    locked: &mut BTreeSet<CanonicalPath>,
    from: &CanonicalPath,
    to: &CanonicalPath,
) -> bool {
    if from.is_root() || from == to {
        return false;
    }
    let nested: Vec<CanonicalPath> = all_under(locked, from).cloned().collect();
    let direct = locked.remove(from);
    if !direct && nested.is_empty() {
        return false;
    }
    for old in &nested {
        locked.remove(old);
    }
    let relocated = nested.iter().filter_map(|old| old.rebase(from, to));
    locked.extend(relocated.filter(|p| !p.is_root()));
    if direct && !to.is_root() {
        locked.insert(to.clone());
    }
    true
}
