//! Implementation of `pathlock show`.

use clap::Args;
use serde_json::json;

use super::{OutputFormat, StoreArgs};
use crate::{instance::InstanceConfig, Result};

#[derive(Debug, Clone, Args, Default)]
pub struct ShowArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,
}

pub fn execute(args: ShowArgs) -> Result<()> {
    let (manager, instance) = args.store.open()?;
    let snapshot = manager.snapshot(&instance)?;
    println!("{}", render(&snapshot, args.format)?);
    Ok(())
}

pub fn render(snapshot: &InstanceConfig, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
            "instanceId": snapshot.instance_id,
            "lockedPaths": snapshot.locked_paths,
            "lockedAncestors": snapshot.locked_ancestors,
        }))?),
        OutputFormat::Text => {
            let mut out = format!("instance={}\n", snapshot.instance_id);
            for path in &snapshot.locked_paths {
                out.push_str(&format!("locked={path}\n"));
            }
            for path in &snapshot.locked_ancestors {
                out.push_str(&format!("ancestor={path}\n"));
            }
            Ok(out)
        }
    }
}
