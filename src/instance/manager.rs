//! Per-instance lock state with single-writer mutation.
//!
//! Each instance gets one `RwLock` slot. A mutation holds the write half from
//! the read of the current registry through the persist call, so two
//! mutations on one instance never interleave; different instances never
//! contend. Queries take the read half and therefore always see the last
//! completed mutation together with its rebuilt index.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::{validate_instance_id, ConfigKind, ConfigStore, InstanceConfig};
use crate::{
    logging,
    registry::{CanonicalPath, LockQueryResult, LockState, Mutation},
    Error, Result,
};

#[derive(Debug)]
struct Loaded {
    config: InstanceConfig,
    locks: LockState,
}

pub struct LockManager {
    store: Arc<dyn ConfigStore>,
    instances: DashMap<String, Arc<RwLock<Loaded>>>,
}

impl LockManager {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            store,
            instances: DashMap::new(),
        }
    }

    /// Get or lazily load the slot for an instance, returning the Arc so the
    /// map shard is released before the caller locks the slot.
    fn slot(&self, instance_id: &str) -> Result<Arc<RwLock<Loaded>>> {
        if let Some(slot) = self.instances.get(instance_id) {
            return Ok(slot.clone());
        }
        validate_instance_id(instance_id)?;

        let config = self
            .store
            .load(ConfigKind::Instance, instance_id)?
            .unwrap_or_else(|| InstanceConfig::new(instance_id));
        let locks = config.lock_state();
        debug!(
            instance = %instance_id,
            locked = locks.len(),
            "loaded instance lock state"
        );

        // A concurrent loader may have won; both read the same durable record.
        Ok(self
            .instances
            .entry(instance_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(Loaded { config, locks })))
            .clone())
    }

    /// Run a read-only query against the current state of an instance.
    pub fn read<T, F>(&self, instance_id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&LockState) -> T,
    {
        let slot = self.slot(instance_id)?;
        let guard = slot.read();
        Ok(f(&guard.locks))
    }

    /// Apply a mutation as one atomic unit: mutate in memory (the index is
    /// rebuilt inside [`LockState`]), then persist the snapshot. A persist
    /// failure is returned as [`Error::Persistence`]; the in-memory state keeps
    /// the mutation and is rewritten in full by the next successful persist.
    pub fn update<F>(&self, instance_id: &str, action: &'static str, f: F) -> Result<bool>
    where
        F: FnOnce(&mut LockState) -> Result<bool>,
    {
        let slot = self.slot(instance_id)?;
        let mut guard = slot.write();
        let changed = f(&mut guard.locks)?;
        if !changed {
            debug!(instance = %instance_id, action, "lock state unchanged");
            return Ok(false);
        }

        let Loaded { config, locks } = &mut *guard;
        config.record_locks(locks);
        if let Err(err) = self.store.store(ConfigKind::Instance, instance_id, config) {
            let reason = format!("{err:#}");
            warn!(
                instance = %instance_id,
                action,
                error = %reason,
                "failed to persist lock state; memory is ahead of the stored record"
            );
            return Err(Error::Persistence {
                instance: instance_id.to_string(),
                reason,
            }
            .into());
        }

        info!(instance = %instance_id, action, locked = locks.len(), "lock state updated");
        logging::log_registry_snapshot(instance_id, locks);
        Ok(true)
    }

    pub fn lock(&self, instance_id: &str, paths: &[CanonicalPath]) -> Result<bool> {
        self.update(instance_id, "lock", |s| s.add_locks(paths))
    }

    pub fn unlock(&self, instance_id: &str, paths: &[CanonicalPath]) -> Result<bool> {
        self.update(instance_id, "unlock", |s| Ok(s.remove_locks(paths)))
    }

    /// Propagate completed filesystem mutations with one index rebuild and at
    /// most one persist.
    pub fn propagate(&self, instance_id: &str, mutations: &[Mutation]) -> Result<bool> {
        if mutations.is_empty() {
            return Ok(false);
        }
        self.update(instance_id, "propagate", |s| Ok(s.apply_all(mutations)))
    }

    pub fn is_directly_locked(&self, instance_id: &str, path: &CanonicalPath) -> Result<bool> {
        self.read(instance_id, |s| s.is_directly_locked(path))
    }

    pub fn is_locked(&self, instance_id: &str, path: &CanonicalPath) -> Result<bool> {
        self.read(instance_id, |s| s.is_locked(path))
    }

    pub fn contains_locked_descendant(
        &self,
        instance_id: &str,
        path: &CanonicalPath,
    ) -> Result<Option<CanonicalPath>> {
        self.read(instance_id, |s| s.contains_locked_descendant(path).cloned())
    }

    pub fn is_locked_or_contains(
        &self,
        instance_id: &str,
        path: &CanonicalPath,
    ) -> Result<Option<CanonicalPath>> {
        self.read(instance_id, |s| s.is_locked_or_contains(path))
    }

    pub fn check_many(
        &self,
        instance_id: &str,
        paths: &[CanonicalPath],
        check_contents: bool,
    ) -> Result<LockQueryResult> {
        self.read(instance_id, |s| s.check_many(paths, check_contents))
    }

    pub fn locked_paths(&self, instance_id: &str) -> Result<Vec<CanonicalPath>> {
        self.read(instance_id, |s| s.locked_paths().cloned().collect())
    }

    /// The configuration snapshot as it would be persisted right now.
    pub fn snapshot(&self, instance_id: &str) -> Result<InstanceConfig> {
        let slot = self.slot(instance_id)?;
        let guard = slot.read();
        let mut config = guard.config.clone();
        config.record_locks(&guard.locks);
        Ok(config)
    }
}

impl std::fmt::Debug for LockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockManager")
            .field("instances", &self.instances.len())
            .finish()
    }
}
