//! Implementation of `pathlock check`.

use clap::Args;

use super::{canonical_paths, OutputFormat, StoreArgs};
use crate::{registry::LockQueryResult, Result};

#[derive(Debug, Clone, Args, Default)]
pub struct CheckArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Also report paths that contain a locked descendant
    #[arg(long = "contents", default_value_t = false)]
    pub contents: bool,

    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Paths relative to the instance working directory
    pub paths: Vec<String>,
}

pub fn execute(args: CheckArgs) -> Result<()> {
    let (manager, instance) = args.store.open()?;
    let paths = canonical_paths(&args.paths)?;
    let result = manager.check_many(&instance, &paths, args.contents)?;
    println!("{}", render(&result, args.format)?);
    Ok(())
}

pub fn render(result: &LockQueryResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Text if !result.has_locked => Ok("no locked paths".to_string()),
        OutputFormat::Text => Ok(result
            .locked_paths
            .iter()
            .map(|p| format!("locked\t{p}"))
            .collect::<Vec<_>>()
            .join("\n")),
    }
}
