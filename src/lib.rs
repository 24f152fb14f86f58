use thiserror::Error;

pub mod cli;
pub mod dispatch;
pub mod guard;
pub mod instance;
pub mod logging;
pub mod operation;
pub mod registry;

pub use dispatch::{Dispatcher, FileManager, Outcome, Request};
pub use guard::{Guard, GuardConfig, LockViolation, Role};
pub use instance::{ConfigStore, InstanceConfig, JsonFileStore, LockManager, MemoryStore};
pub use operation::Operation;
pub use registry::{normalize, CanonicalPath, LockQueryResult, LockState, Mutation};

pub type Result<T> = anyhow::Result<T>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("invalid instance id: {0:?}")]
    InvalidInstanceId(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
    #[error("operation requires admin role: {0}")]
    Forbidden(String),
    #[error("{operation} refused: {path} is locked")]
    Locked { operation: String, path: String },
    #[error("failed to persist lock state for instance {instance}: {reason}")]
    Persistence { instance: String, reason: String },
    #[error("serialization error")]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("cli error: {0}")]
    Cli(String),
}

/// Entry point for the library, called by the CLI thin wrapper.
pub fn run<I, S>(args: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let cli_args = cli::parse_args(args.into_iter().map(Into::into))?;
    logging::init_logging(cli_args.log_format)?;
    cli::dispatch(cli_args)
}
