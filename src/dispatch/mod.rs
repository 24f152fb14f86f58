//! Remote file-operation dispatch: guard, then file manager, then lock
//! propagation.
//!
//! The file manager performs the real filesystem work and is supplied by the
//! embedding worker. Lock state for identity-changing operations is updated
//! and persisted before `dispatch` returns, so a caller that saw the result
//! can never observe a stale registry.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::{
    guard::{Decision, Guard, LockViolation, Role},
    instance::LockManager,
    operation::Operation,
    registry::{normalize, CanonicalPath, Mutation},
    Error, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub size: u64,
    /// Direct lock of this entry, ignoring ancestors.
    #[serde(default)]
    pub locked: bool,
}

impl FileEntry {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            size,
            locked: false,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Dir,
            size: 0,
            locked: false,
        }
    }
}

/// The worker's filesystem. Paths are canonical and relative to the
/// instance's working directory.
pub trait FileManager: Send + Sync {
    fn list(&self, instance_id: &str, dir: &CanonicalPath) -> Result<Vec<FileEntry>>;

    /// Write `text` when given; return the current contents otherwise.
    fn edit(&self, instance_id: &str, target: &CanonicalPath, text: Option<&str>)
        -> Result<Option<String>>;

    fn chmod(&self, instance_id: &str, target: &CanonicalPath, mode: u32, deep: bool) -> Result<()>;

    fn copy(&self, instance_id: &str, from: &CanonicalPath, to: &CanonicalPath) -> Result<()>;

    fn rename(&self, instance_id: &str, from: &CanonicalPath, to: &CanonicalPath) -> Result<()>;

    fn delete(&self, instance_id: &str, target: &CanonicalPath) -> Result<()>;

    fn compress(&self, instance_id: &str, archive: &CanonicalPath, targets: &[CanonicalPath])
        -> Result<()>;

    fn create_file(&self, instance_id: &str, target: &CanonicalPath) -> Result<()>;

    fn create_dir(&self, instance_id: &str, target: &CanonicalPath) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub operation: String,
    pub instance_id: String,
    #[serde(default)]
    pub payload: Value,
}

impl Request {
    pub fn new(operation: Operation, instance_id: impl Into<String>, payload: Value) -> Self {
        Self {
            operation: operation.name().to_string(),
            instance_id: instance_id.into(),
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed(Value),
    Rejected(LockViolation),
}

impl Outcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected(_))
    }

    /// Collapse a rejection into [`Error::Locked`].
    pub fn into_result(self) -> Result<Value> {
        match self {
            Outcome::Completed(value) => Ok(value),
            Outcome::Rejected(violation) => Err(Error::from(violation).into()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TargetRequest {
    target: String,
}

#[derive(Debug, Deserialize)]
struct EditRequest {
    target: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChmodRequest {
    target: String,
    chmod: u32,
    #[serde(default)]
    deep: bool,
}

#[derive(Debug, Deserialize)]
struct PairsRequest {
    targets: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct TargetsRequest {
    targets: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CompressRequest {
    source: String,
    targets: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CheckLockRequest {
    targets: Vec<String>,
    #[serde(default)]
    check_contents: bool,
}

pub struct Dispatcher<F> {
    files: F,
    locks: Arc<LockManager>,
    guard: Guard,
}

impl<F: FileManager> Dispatcher<F> {
    pub fn new(files: F, locks: Arc<LockManager>, guard: Guard) -> Self {
        Self {
            files,
            locks,
            guard,
        }
    }

    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    pub fn files(&self) -> &F {
        &self.files
    }

    #[instrument(skip(self, request), fields(operation = %request.operation, instance = %request.instance_id))]
    pub fn dispatch(&self, request: &Request, role: Role) -> Result<Outcome> {
        let operation: Operation = request.operation.parse()?;
        let decision = self.guard.check(
            &self.locks,
            &request.operation,
            &request.instance_id,
            &request.payload,
            role,
        )?;
        if let Decision::Reject(violation) = decision {
            return Ok(Outcome::Rejected(violation));
        }
        let value = self.execute(operation, &request.instance_id, &request.payload, role)?;
        Ok(Outcome::Completed(value))
    }

    fn execute(
        &self,
        operation: Operation,
        instance_id: &str,
        payload: &Value,
        role: Role,
    ) -> Result<Value> {
        match operation {
            Operation::List => {
                let req: TargetRequest = parse(operation, payload)?;
                let dir = normalize(&req.target);
                let mut entries = self.files.list(instance_id, &dir)?;
                self.locks.read(instance_id, |state| {
                    for entry in &mut entries {
                        entry.locked = state.is_directly_locked(&dir.join(&entry.name));
                    }
                })?;
                Ok(serde_json::to_value(entries)?)
            }
            Operation::Edit => {
                let req: EditRequest = parse(operation, payload)?;
                let text = self
                    .files
                    .edit(instance_id, &normalize(&req.target), req.text.as_deref())?;
                Ok(json!({ "text": text }))
            }
            Operation::Chmod => {
                let req: ChmodRequest = parse(operation, payload)?;
                self.files
                    .chmod(instance_id, &normalize(&req.target), req.chmod, req.deep)?;
                Ok(Value::Bool(true))
            }
            Operation::Copy => {
                let req: PairsRequest = parse(operation, payload)?;
                self.run_pairs(instance_id, &req.targets, |from, to| {
                    self.files.copy(instance_id, from, to)?;
                    Ok(Mutation::copy(from.clone(), to.clone()))
                })
            }
            Operation::Move => {
                let req: PairsRequest = parse(operation, payload)?;
                self.run_pairs(instance_id, &req.targets, |from, to| {
                    self.files.rename(instance_id, from, to)?;
                    Ok(Mutation::rename(from.clone(), to.clone()))
                })
            }
            Operation::Delete => {
                let req: TargetsRequest = parse(operation, payload)?;
                let targets: Vec<CanonicalPath> = req.targets.iter().map(|t| normalize(t)).collect();
                let mut applied = Vec::with_capacity(targets.len());
                let result = targets.iter().try_for_each(|target| {
                    self.files.delete(instance_id, target)?;
                    applied.push(Mutation::delete(target.clone()));
                    Ok::<_, anyhow::Error>(())
                });
                self.settle(instance_id, &applied, result)
            }
            Operation::Compress => {
                let req: CompressRequest = parse(operation, payload)?;
                let archive = normalize(&req.source);
                let targets: Vec<CanonicalPath> = req.targets.iter().map(|t| normalize(t)).collect();
                self.files.compress(instance_id, &archive, &targets)?;
                self.locks
                    .propagate(instance_id, &[Mutation::create(archive, false)])?;
                Ok(Value::Bool(true))
            }
            Operation::Touch | Operation::Mkdir => {
                let req: TargetRequest = parse(operation, payload)?;
                let target = normalize(&req.target);
                let folder = operation == Operation::Mkdir;
                if folder {
                    self.files.create_dir(instance_id, &target)?;
                } else {
                    self.files.create_file(instance_id, &target)?;
                }
                self.locks
                    .propagate(instance_id, &[Mutation::create(target, folder)])?;
                Ok(Value::Bool(true))
            }
            Operation::Lock | Operation::Unlock => {
                if !role.is_admin() {
                    return Err(Error::Forbidden(operation.name().to_string()).into());
                }
                let req: TargetsRequest = parse(operation, payload)?;
                let targets: Vec<CanonicalPath> = req.targets.iter().map(|t| normalize(t)).collect();
                let changed = if operation == Operation::Lock {
                    self.locks.lock(instance_id, &targets)?
                } else {
                    self.locks.unlock(instance_id, &targets)?
                };
                info!(
                    operation = %operation,
                    instance = %instance_id,
                    targets = targets.len(),
                    changed,
                    "administrative lock action"
                );
                Ok(json!({ "changed": changed }))
            }
            Operation::CheckLock => {
                let req: CheckLockRequest = parse(operation, payload)?;
                let targets: Vec<CanonicalPath> = req.targets.iter().map(|t| normalize(t)).collect();
                let result = self
                    .locks
                    .check_many(instance_id, &targets, req.check_contents)?;
                Ok(serde_json::to_value(result)?)
            }
        }
    }

    /// Run a copy/move batch pair by pair. Pairs that completed before a
    /// failure still have their lock state propagated.
    fn run_pairs<G>(&self, instance_id: &str, pairs: &[(String, String)], mut step: G) -> Result<Value>
    where
        G: FnMut(&CanonicalPath, &CanonicalPath) -> Result<Mutation>,
    {
        let mut applied = Vec::with_capacity(pairs.len());
        let result = pairs.iter().try_for_each(|(from, to)| {
            applied.push(step(&normalize(from), &normalize(to))?);
            Ok::<_, anyhow::Error>(())
        });
        self.settle(instance_id, &applied, result)
    }

    fn settle(&self, instance_id: &str, applied: &[Mutation], result: Result<()>) -> Result<Value> {
        let propagated = self.locks.propagate(instance_id, applied);
        result?;
        propagated?;
        Ok(Value::Bool(true))
    }
}

fn parse<T: DeserializeOwned>(operation: Operation, payload: &Value) -> Result<T> {
    serde_json::from_value(payload.clone())
        .map_err(|err| Error::InvalidRequest(format!("{operation}: {err}")).into())
}
