//! Continuous monitoring: start the background poller and print every update.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use tokio::sync::mpsc::error::TryRecvError;

use crate::core::system_monitor::{ChannelSink, GpuMonitor, MonitorEvent, MonitorPayload};
use crate::ui::format_summary_line;

const RECV_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Summary,
    Json,
}

impl OutputFormat {
    fn from_arg(value: Option<&String>) -> Self {
        match value.map(String::as_str) {
            Some("json") => OutputFormat::Json,
            _ => OutputFormat::Summary,
        }
    }
}

/// Render one received event; never reads newer state than the event itself.
fn render(format: OutputFormat, event: MonitorEvent) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(&event.payload)?),
        OutputFormat::Summary => {
            let payload: MonitorPayload =
                serde_json::from_value(event.payload).context("Malformed monitor event")?;
            Ok(format_summary_line(&payload.into_snapshot()))
        }
    }
}

/// Execute the watch command
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let config = super::load_config(matches)?;
    let format = OutputFormat::from_arg(matches.get_one::<String>("format"));
    let count = matches.get_one::<u64>("count").copied();

    let cancel_flag = Arc::new(AtomicBool::new(false));
    let cancel_flag_clone = cancel_flag.clone();
    ctrlc::set_handler(move || {
        cancel_flag_clone.store(true, Ordering::Relaxed);
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    let (sink, mut events) = ChannelSink::channel(config.event_buffer);
    let interval = config.update_interval();
    let monitor = GpuMonitor::new(config, Arc::new(sink));
    monitor.start().context("Failed to start GPU monitor")?;

    if format == OutputFormat::Summary {
        println!(
            "{}",
            format!("Watching AMD GPUs every {:?} (Ctrl+C to stop)", interval).dimmed()
        );
    }

    let mut received = 0u64;
    while !cancel_flag.load(Ordering::Relaxed) {
        match events.try_recv() {
            Ok(event) => {
                println!("{}", render(format, event)?);

                received += 1;
                if count.is_some_and(|limit| received >= limit) {
                    break;
                }
            }
            Err(TryRecvError::Empty) => thread::sleep(RECV_POLL),
            Err(TryRecvError::Disconnected) => break,
        }
    }

    monitor.stop();
    Ok(())
}
