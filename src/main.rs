use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;

use amdgpu_monitor::commands;

fn tool_arg() -> Arg {
    Arg::new("tool")
        .short('t')
        .long("tool")
        .value_name("PATH")
        .help("Path to rocm-smi or amd-smi (overrides the config file)")
        .value_parser(clap::value_parser!(PathBuf))
}

fn build_cli() -> Command {
    Command::new("amdgpu-monitor")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Poll AMD GPU utilization, VRAM and temperature through rocm-smi / amd-smi")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("watch")
                .about("Poll continuously and print every update")
                .arg(
                    Arg::new("interval")
                        .short('i')
                        .long("interval")
                        .value_name("SECONDS")
                        .help("Seconds between polls, clamped to [0.1, 10.0]")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(tool_arg())
                .arg(
                    Arg::new("format")
                        .short('f')
                        .long("format")
                        .help("Output format")
                        .value_parser(["summary", "json"])
                        .default_value("summary"),
                )
                .arg(
                    Arg::new("count")
                        .short('n')
                        .long("count")
                        .value_name("N")
                        .help("Exit after N updates")
                        .value_parser(clap::value_parser!(u64).range(1..)),
                ),
        )
        .subcommand(
            Command::new("snapshot")
                .about("Collect and print a single snapshot")
                .arg(tool_arg())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the event payload as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("locate")
                .about("Show which SMI tool would be used")
                .arg(tool_arg())
                .arg(
                    Arg::new("verbose")
                        .short('v')
                        .long("verbose")
                        .help("Also list every location searched")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Manage the configuration file (use 'amdgpu-monitor config --help' for subcommands)")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(Command::new("show").about("Print the current configuration"))
                .subcommand(Command::new("path").about("Print the configuration file path"))
                .subcommand(
                    Command::new("set-interval")
                        .about("Set the default poll interval")
                        .arg(
                            Arg::new("seconds")
                                .help("Seconds between polls")
                                .required(true)
                                .index(1)
                                .value_parser(clap::value_parser!(f64)),
                        ),
                )
                .subcommand(
                    Command::new("set-tool")
                        .about("Use a specific rocm-smi / amd-smi executable")
                        .arg(
                            Arg::new("path")
                                .help("Path to the executable")
                                .required(true)
                                .index(1)
                                .value_parser(clap::value_parser!(PathBuf)),
                        ),
                )
                .subcommand(
                    Command::new("clear-tool").about("Go back to the default tool search"),
                )
                .subcommand(Command::new("reset").about("Restore the default configuration")),
        )
}

fn main() -> Result<()> {
    amdgpu_monitor::init_logging();

    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("watch", sub_matches)) => commands::watch(sub_matches)?,
        Some(("snapshot", sub_matches)) => commands::snapshot(sub_matches)?,
        Some(("locate", sub_matches)) => commands::locate(sub_matches)?,
        Some(("config", sub_matches)) => commands::config::handle_config(sub_matches)?,
        _ => {
            println!("Use 'amdgpu-monitor --help' for more information.");
        }
    }

    Ok(())
}
