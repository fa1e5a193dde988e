// Command handlers module
pub mod config;
pub mod locate;
pub mod snapshot;
pub mod watch;

// Re-exports for cleaner imports
pub use locate::execute as locate;
pub use snapshot::execute as snapshot;
pub use watch::execute as watch;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ArgMatches;

use crate::core::MonitorConfig;

/// Load the saved config and apply the `--tool` / `--interval` overrides shared by commands
pub(crate) fn load_config(matches: &ArgMatches) -> Result<MonitorConfig> {
    let mut config = MonitorConfig::load().context("Failed to load configuration")?;

    if let Some(tool) = matches.try_get_one::<PathBuf>("tool").ok().flatten() {
        config.set_tool_path(tool.clone());
    }
    if let Some(interval) = matches.try_get_one::<f64>("interval").ok().flatten() {
        config
            .set_update_interval(*interval)
            .context("Invalid --interval")?;
    }

    Ok(config)
}
