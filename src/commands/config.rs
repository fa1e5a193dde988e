use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;

use crate::core::MonitorConfig;

pub fn handle_config(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("show", _)) => show(),
        Some(("path", _)) => path(),
        Some(("set-interval", sub_matches)) => set_interval(sub_matches),
        Some(("set-tool", sub_matches)) => set_tool(sub_matches),
        Some(("clear-tool", _)) => clear_tool(),
        Some(("reset", _)) => reset(),
        _ => {
            println!("Use 'amdgpu-monitor config --help' for more information.");
            Ok(())
        }
    }
}

fn show() -> Result<()> {
    let config = MonitorConfig::load()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn path() -> Result<()> {
    let path = MonitorConfig::get_config_path()?;
    println!("{}", path.display().to_string().cyan().bold());
    Ok(())
}

fn set_interval(matches: &ArgMatches) -> Result<()> {
    let secs = matches
        .get_one::<f64>("seconds")
        .copied()
        .context("Interval argument is required")?;

    let mut config = MonitorConfig::load()?;
    let stored = config.set_update_interval(secs)?;
    config.save()?;

    if stored != secs {
        println!(
            "{}",
            format!("⚠️  {}s is out of range, clamped to {}s", secs, stored).yellow()
        );
    }
    println!("{} {}s", "✓ Update interval set to:".green(), stored);
    Ok(())
}

fn set_tool(matches: &ArgMatches) -> Result<()> {
    let path = matches
        .get_one::<PathBuf>("path")
        .context("Path argument is required")?;

    if !crate::platform::gpu::is_executable(path) {
        println!(
            "{}",
            format!("⚠️  Warning: '{}' is not an executable file", path.display()).yellow()
        );
        println!(
            "{}",
            "The path will be saved but the default search order is used until it is.".dimmed()
        );
    }

    let mut config = MonitorConfig::load()?;
    config.set_tool_path(path.clone());
    config.save()?;

    println!("{} {}", "✓ SMI tool set to:".green(), path.display());
    Ok(())
}

fn clear_tool() -> Result<()> {
    let mut config = MonitorConfig::load()?;
    config.clear_tool_path();
    config.save()?;

    println!("{}", "✓ SMI tool path cleared".green());
    Ok(())
}

fn reset() -> Result<()> {
    MonitorConfig::default().save()?;
    println!("{}", "✓ Configuration reset to defaults".green());
    Ok(())
}
