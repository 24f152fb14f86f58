//! Lock enforcement for named file operations.
//!
//! Runs before the mutating handler. Each governed operation has a rule
//! naming every payload path the handler may overwrite or clear locks on, and
//! whether the check covers descendant content. Admins always pass; empty candidate lists
//! pass; otherwise the first locked candidate rejects the whole request.

use std::{collections::BTreeMap, fmt, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::{
    instance::LockManager, logging, operation::Operation, registry::CanonicalPath, Error, Result,
};

pub mod extract;

pub use extract::extract_targets;

/// Privilege of the caller, decided by the upstream authentication layer and
/// passed in alongside the request rather than read from its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetExtractor {
    /// One path string at `field`.
    Single { field: String },
    /// An array of path strings at `field`.
    List { field: String },
    /// An array of `[source, destination]` pairs at `field`.
    PairSources { field: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardRule {
    /// Candidates are the union of every extractor's output, in order.
    pub extractors: Vec<TargetExtractor>,
    /// Also reject when a locked path lives below a candidate.
    #[serde(default)]
    pub check_contents: bool,
}

impl GuardRule {
    fn from_extractor(extractor: TargetExtractor, check_contents: bool) -> Self {
        Self {
            extractors: vec![extractor],
            check_contents,
        }
    }

    pub fn single(field: &str, check_contents: bool) -> Self {
        Self::from_extractor(
            TargetExtractor::Single {
                field: field.to_string(),
            },
            check_contents,
        )
    }

    pub fn list(field: &str, check_contents: bool) -> Self {
        Self::from_extractor(
            TargetExtractor::List {
                field: field.to_string(),
            },
            check_contents,
        )
    }

    pub fn pair_sources(field: &str, check_contents: bool) -> Self {
        Self::from_extractor(
            TargetExtractor::PairSources {
                field: field.to_string(),
            },
            check_contents,
        )
    }

    /// Add the single path at `field` to the candidates.
    pub fn and_single(mut self, field: &str) -> Self {
        self.extractors.push(TargetExtractor::Single {
            field: field.to_string(),
        });
        self
    }

    pub fn candidates(&self, payload: &Value) -> Vec<CanonicalPath> {
        self.extractors
            .iter()
            .flat_map(|extractor| extract_targets(payload, extractor))
            .collect()
    }
}

/// Rule table keyed by operation name. Operations without a rule pass through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuardConfig {
    rules: BTreeMap<String, GuardRule>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        let rules = [
            (Operation::List, GuardRule::single("target", false)),
            (Operation::Edit, GuardRule::single("target", true)),
            (Operation::Chmod, GuardRule::single("target", true)),
            (Operation::Copy, GuardRule::pair_sources("targets", true)),
            (Operation::Move, GuardRule::pair_sources("targets", true)),
            (Operation::Delete, GuardRule::list("targets", true)),
            (
                Operation::Compress,
                GuardRule::list("targets", true).and_single("source"),
            ),
            (Operation::Touch, GuardRule::single("target", true)),
            (Operation::Mkdir, GuardRule::single("target", true)),
        ]
        .into_iter()
        .map(|(op, rule)| (op.name().to_string(), rule))
        .collect();
        Self { rules }
    }
}

impl GuardConfig {
    pub fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&data)?)
    }

    pub fn rule(&self, operation: &str) -> Option<&GuardRule> {
        self.rules.get(operation)
    }

    pub fn insert(&mut self, operation: impl Into<String>, rule: GuardRule) -> Option<GuardRule> {
        self.rules.insert(operation.into(), rule)
    }

    pub fn remove(&mut self, operation: &str) -> Option<GuardRule> {
        self.rules.remove(operation)
    }

    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }
}

/// Structured rejection returned instead of running the operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockViolation {
    pub operation: String,
    /// The candidate target that was refused.
    pub target: CanonicalPath,
    /// The registry entry responsible; equals `target` or one of its
    /// ancestors, or lies below `target` for content checks.
    pub locked: CanonicalPath,
}

impl LockViolation {
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LockViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.locked.is_strict_ancestor_of(&self.target) || self.locked == self.target {
            write!(f, "{} is locked", self.target)
        } else {
            write!(f, "{} contains locked path {}", self.target, self.locked)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    Reject(LockViolation),
}

#[derive(Debug, Clone, Default)]
pub struct Guard {
    config: GuardConfig,
}

impl Guard {
    pub fn new(config: GuardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn check(
        &self,
        locks: &LockManager,
        operation: &str,
        instance_id: &str,
        payload: &Value,
        role: Role,
    ) -> Result<Decision> {
        if role.is_admin() {
            return Ok(Decision::Proceed);
        }
        let Some(rule) = self.config.rule(operation) else {
            return Ok(Decision::Proceed);
        };
        let candidates = rule.candidates(payload);
        if candidates.is_empty() {
            return Ok(Decision::Proceed);
        }

        let hit = locks.read(instance_id, |state| {
            candidates.iter().find_map(|target| {
                let locked = state.locking_entry(target).or_else(|| {
                    if rule.check_contents {
                        state.contains_locked_descendant(target)
                    } else {
                        None
                    }
                });
                locked.map(|locked| (target.clone(), locked.clone()))
            })
        })?;

        match hit {
            None => {
                logging::log_guard_pass(operation, instance_id, candidates.len());
                Ok(Decision::Proceed)
            }
            Some((target, locked)) => {
                let violation = LockViolation {
                    operation: operation.to_string(),
                    target,
                    locked,
                };
                warn!(
                    operation = %operation,
                    instance = %instance_id,
                    target = %violation.target,
                    "rejected operation on locked path"
                );
                Ok(Decision::Reject(violation))
            }
        }
    }
}

impl From<LockViolation> for Error {
    fn from(v: LockViolation) -> Self {
        Error::Locked {
            operation: v.operation,
            path: v.target.to_string(),
        }
    }
}
