use anyhow::Result;
use clap::ArgMatches;
use colored::Colorize;

use crate::error::MonitorError;
use crate::platform::gpu::ToolLocator;
use crate::ui::print_search_locations;

/// Execute the locate command
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let config = super::load_config(matches)?;
    let locator = ToolLocator::new().with_preferred(config.tool_path);

    if matches.get_flag("verbose") {
        print_search_locations(&locator);
        println!();
    }

    match locator.locate() {
        Some(path) => {
            println!("{}", path.display().to_string().cyan().bold());
            Ok(())
        }
        None => {
            println!("{}", "No rocm-smi or amd-smi found.".yellow());
            println!(
                "{}",
                "Install ROCm or point to the tool with 'amdgpu-monitor config set-tool <path>'"
                    .dimmed()
            );
            Err(MonitorError::ToolNotFound.into())
        }
    }
}
