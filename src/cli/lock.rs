//! Implementation of `pathlock lock` and `pathlock unlock`.

use clap::Args;
use tracing::info;

use super::{canonical_paths, StoreArgs};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Lock,
    Unlock,
}

#[derive(Debug, Clone, Args, Default)]
pub struct LockArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Paths relative to the instance working directory
    pub paths: Vec<String>,
}

pub fn execute(args: LockArgs, action: Action) -> Result<()> {
    let (manager, instance) = args.store.open()?;
    let paths = canonical_paths(&args.paths)?;

    let changed = match action {
        Action::Lock => manager.lock(&instance, &paths)?,
        Action::Unlock => manager.unlock(&instance, &paths)?,
    };
    info!(instance = %instance, ?action, paths = paths.len(), changed, "lock command finished");

    let verb = match (action, changed) {
        (Action::Lock, true) => "locked",
        (Action::Unlock, true) => "unlocked",
        (_, false) => "unchanged",
    };
    for path in &paths {
        println!("{verb}\t{path}");
    }
    Ok(())
}
