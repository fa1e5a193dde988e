use anyhow::{Context, Result};
use clap::ArgMatches;

use crate::core::system_monitor::{poll_once, MonitorPayload};
use crate::ui::print_snapshot;

/// Execute the snapshot command: one poll cycle, printed and done
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let config = super::load_config(matches)?;
    let snapshot = poll_once(&config).context("Failed to collect GPU snapshot")?;

    if matches.get_flag("json") {
        let payload = MonitorPayload::from_snapshot(&snapshot);
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_snapshot(&snapshot);
    }

    Ok(())
}
