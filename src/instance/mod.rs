//! Instance configuration snapshots and the per-instance lock manager.
//!
//! The lock registry of an instance is persisted as part of that instance's
//! configuration. Everything else in the configuration is opaque here and
//! round-trips untouched.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    registry::{CanonicalPath, LockState},
    Error, Result,
};

pub mod manager;
pub mod store;

pub use manager::LockManager;
pub use store::{ConfigStore, JsonFileStore, MemoryStore};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ConfigKind {
    Instance,
}

impl ConfigKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKind::Instance => "instance",
        }
    }
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceConfig {
    /// Older records may omit it; stores fill it from the record's key.
    #[serde(default)]
    pub instance_id: String,
    #[serde(default)]
    pub locked_paths: Vec<CanonicalPath>,
    /// Written for readers of the stored file; never trusted on load.
    #[serde(default)]
    pub locked_ancestors: Vec<CanonicalPath>,
    /// Remaining configuration fields, owned by other parts of the service.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InstanceConfig {
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            ..Self::default()
        }
    }

    /// Rebuild the in-memory lock state from the persisted entries.
    pub fn lock_state(&self) -> LockState {
        let state = LockState::from_paths(self.locked_paths.iter().cloned());
        if !index_matches(&state, &self.locked_ancestors) {
            debug!(
                instance = %self.instance_id,
                persisted = self.locked_ancestors.len(),
                rebuilt = state.index().len(),
                "persisted ancestor index is stale; using rebuilt index"
            );
        }
        state
    }

    /// Copy the registry and its index into the snapshot fields.
    pub fn record_locks(&mut self, state: &LockState) {
        self.locked_paths = state.locked_paths().cloned().collect();
        self.locked_ancestors = state.ancestor_paths().cloned().collect();
    }
}

fn index_matches(state: &LockState, persisted: &[CanonicalPath]) -> bool {
    let mut persisted: Vec<&CanonicalPath> = persisted.iter().collect();
    persisted.sort();
    persisted.dedup();
    state.ancestor_paths().eq(persisted.into_iter())
}

/// Instance ids become file names in [`JsonFileStore`], so they must be a
/// single plain path component.
pub fn validate_instance_id(instance_id: &str) -> Result<()> {
    let bad = instance_id.is_empty()
        || instance_id == "."
        || instance_id == ".."
        || instance_id.contains(['/', '\\', '\0']);
    if bad {
        return Err(Error::InvalidInstanceId(instance_id.to_string()).into());
    }
    Ok(())
}
