//! Administrative CLI over instance lock state kept by [`JsonFileStore`].

use std::{path::PathBuf, sync::Arc};

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};

use crate::{
    instance::{validate_instance_id, JsonFileStore, LockManager},
    logging::LogFormat,
    registry::{normalize, CanonicalPath},
    Error, Result,
};

pub mod check;
pub mod lock;
pub mod show;

#[derive(Debug, Clone)]
pub enum Command {
    Lock(lock::LockArgs),
    Unlock(lock::LockArgs),
    Check(check::CheckArgs),
    Show(show::ShowArgs),
    None,
}

#[derive(Debug, Clone)]
pub struct CliArgs {
    pub command: Command,
    pub log_format: LogFormat,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            command: Command::None,
            log_format: LogFormat::Human,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Location of the lock state shared by every subcommand.
#[derive(Debug, Clone, Args, Default)]
pub struct StoreArgs {
    /// Root directory of the instance configuration store
    #[arg(long = "state-dir", env = "PATHLOCK_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Instance identifier
    #[arg(long = "instance")]
    pub instance: Option<String>,
}

impl StoreArgs {
    /// Validate the arguments and open a manager over the store.
    pub fn open(&self) -> Result<(LockManager, String)> {
        let state_dir = self
            .state_dir
            .as_ref()
            .ok_or_else(|| Error::Cli("state_dir is required".into()))?;
        let instance = self
            .instance
            .clone()
            .ok_or_else(|| Error::Cli("instance is required".into()))?;
        validate_instance_id(&instance)?;

        let store = JsonFileStore::new(state_dir)?;
        Ok((LockManager::new(Arc::new(store)), instance))
    }
}

pub(crate) fn canonical_paths(raw: &[String]) -> Result<Vec<CanonicalPath>> {
    if raw.is_empty() {
        return Err(Error::Cli("at least one path is required".into()).into());
    }
    Ok(raw.iter().map(|p| normalize(p)).collect())
}

pub fn dispatch(args: CliArgs) -> Result<()> {
    match args.command {
        Command::Lock(a) => lock::execute(a, lock::Action::Lock),
        Command::Unlock(a) => lock::execute(a, lock::Action::Unlock),
        Command::Check(c) => check::execute(c),
        Command::Show(s) => show::execute(s),
        Command::None => Ok(()),
    }
}

#[derive(Parser, Debug)]
#[command(name = "pathlock", version, about = "Inspect and edit instance file locks")]
struct Cli {
    /// Log output format (stderr)
    #[arg(long = "log-format", value_enum, default_value = "human", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Subcommands>,
}

#[derive(Subcommand, Debug)]
enum Subcommands {
    /// Lock one or more paths of an instance.
    Lock(lock::LockArgs),
    /// Remove direct locks from one or more paths of an instance.
    Unlock(lock::LockArgs),
    /// Report which of the given paths are locked.
    Check(check::CheckArgs),
    /// Print the locked paths and the derived ancestor index of an instance.
    Show(show::ShowArgs),
}

/// Parse CLI arguments into internal representation.
pub fn parse_args<I, S>(args: I) -> Result<CliArgs>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let argv: Vec<String> = args.into_iter().map(Into::into).collect();
    let cli = Cli::parse_from(argv);
    let command = match cli.command {
        Some(Subcommands::Lock(args)) => Command::Lock(args),
        Some(Subcommands::Unlock(args)) => Command::Unlock(args),
        Some(Subcommands::Check(args)) => Command::Check(args),
        Some(Subcommands::Show(args)) => Command::Show(args),
        None => Command::None,
    };

    Ok(CliArgs {
        command,
        log_format: cli.log_format,
    })
}

/// Build the underlying clap `Command` (useful for help/usage contract tests).
pub fn clap_command() -> clap::Command {
    Cli::command()
}
