//! Persistence collaborators for instance configuration snapshots.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{validate_instance_id, ConfigKind, InstanceConfig};
use crate::{Error, Result};

/// Durable storage for instance configuration. Retries and durability
/// guarantees belong to the implementation.
pub trait ConfigStore: Send + Sync {
    fn load(&self, kind: ConfigKind, instance_id: &str) -> Result<Option<InstanceConfig>>;

    fn store(&self, kind: ConfigKind, instance_id: &str, snapshot: &InstanceConfig) -> Result<()>;
}

/// One pretty-printed JSON file per instance: `<root>/<kind>/<instance_id>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if root.exists() && !root.is_dir() {
            return Err(Error::Cli(format!(
                "state directory is not a directory: {}",
                root.display()
            ))
            .into());
        }
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, kind: ConfigKind, instance_id: &str) -> Result<PathBuf> {
        validate_instance_id(instance_id)?;
        Ok(self
            .root
            .join(kind.as_str())
            .join(format!("{instance_id}.json")))
    }
}

impl ConfigStore for JsonFileStore {
    fn load(&self, kind: ConfigKind, instance_id: &str) -> Result<Option<InstanceConfig>> {
        let path = self.path_for(kind, instance_id)?;
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read(&path)?;
        let mut config: InstanceConfig = serde_json::from_slice(&contents)?;
        if config.instance_id.is_empty() {
            config.instance_id = instance_id.to_string();
        } else if config.instance_id != instance_id {
            warn!(
                path = %path.display(),
                stored = %config.instance_id,
                requested = %instance_id,
                "stored instance id does not match file name; using file name"
            );
            config.instance_id = instance_id.to_string();
        }
        Ok(Some(config))
    }

    /// Write to a uniquely named sibling, then rename over the target so a
    /// reader never sees a half-written file.
    fn store(&self, kind: ConfigKind, instance_id: &str, snapshot: &InstanceConfig) -> Result<()> {
        let path = self.path_for(kind, instance_id)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension(format!("json.{}.tmp", Uuid::new_v4()));
        let data = serde_json::to_vec_pretty(snapshot)?;
        fs::write(&tmp, data)?;
        if let Err(err) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(Error::Io(err).into());
        }
        debug!(path = %path.display(), "instance configuration written");
        Ok(())
    }
}

/// Process-local store, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<(ConfigKind, String), InstanceConfig>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: ConfigKind, instance_id: &str) -> Option<InstanceConfig> {
        self.records
            .lock()
            .get(&(kind, instance_id.to_string()))
            .cloned()
    }

    pub fn insert(&self, kind: ConfigKind, config: InstanceConfig) {
        self.records
            .lock()
            .insert((kind, config.instance_id.clone()), config);
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self, kind: ConfigKind, instance_id: &str) -> Result<Option<InstanceConfig>> {
        Ok(self.get(kind, instance_id))
    }

    fn store(&self, kind: ConfigKind, instance_id: &str, snapshot: &InstanceConfig) -> Result<()> {
        self.records
            .lock()
            .insert((kind, instance_id.to_string()), snapshot.clone());
        Ok(())
    }
}
