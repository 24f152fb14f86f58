//! Logging initialization using `tracing` and `tracing-subscriber`.

use tracing::{debug, info};
use tracing_subscriber::{fmt, util::SubscriberInitExt, EnvFilter};

use crate::{registry::LockState, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

/// Initialize global tracing subscriber writing to stderr, leaving stdout to
/// CLI command output. Safe to call multiple times; subsequent calls will no-op.
pub fn init_logging(format: LogFormat) -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Human => {
            let _ = builder.finish().try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().finish().try_init();
        }
    };

    Ok(())
}

/// Registry and index sizes after a persisted mutation.
pub fn log_registry_snapshot(instance_id: &str, state: &LockState) {
    info!(
        target: "pathlock::registry",
        instance = %instance_id,
        locked = state.len(),
        indexed_ancestors = state.index().len(),
        "lock_registry_snapshot"
    );
}

/// Trace a single guard decision. Rejections are logged separately at `warn`.
pub fn log_guard_pass(operation: &str, instance_id: &str, candidates: usize) {
    debug!(
        target: "pathlock::guard",
        operation = %operation,
        instance = %instance_id,
        candidates,
        "guard_pass"
    );
}
