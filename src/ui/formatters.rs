use chrono::{Local, TimeZone};
use colored::*;

use crate::core::system_monitor::{DeviceRecord, DriverInfo, Snapshot, NO_DEVICES_SUMMARY};
use crate::platform::gpu::ToolLocator;

/// Format a megabyte count, switching to GB from 1024 MB up
pub fn format_mb(mb: u64) -> String {
    if mb < 1024 {
        format!("{}MB", mb)
    } else {
        format!("{:.1}GB", mb as f64 / 1024.0)
    }
}

/// Format a snapshot timestamp (ms since epoch) in local time
pub fn format_timestamp(timestamp_ms: i64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms).single() {
        Some(time) => time.format("%H:%M:%S").to_string(),
        None => "--:--:--".to_string(),
    }
}

fn colored_temperature(celsius: i64) -> ColoredString {
    let text = format!("{}°C", celsius);
    if celsius > 85 {
        text.red()
    } else if celsius > 70 {
        text.yellow()
    } else {
        text.green()
    }
}

fn colored_percent(percent: i64) -> ColoredString {
    let text = format!("{}%", percent);
    if percent >= 90 {
        text.red()
    } else if percent >= 60 {
        text.yellow()
    } else {
        text.normal()
    }
}

fn print_section_header(title: &str) {
    println!("\n{}", title.bold().green());
    println!("{}", "-".repeat(title.len()));
}

pub fn print_driver_info(driver: &DriverInfo) {
    print_section_header("DRIVER");
    println!("  Backend: {}", driver.device_type);

    let or_unknown = |s: &str| {
        if s.is_empty() {
            "unknown".dimmed().to_string()
        } else {
            s.to_string()
        }
    };
    println!("  Driver Version: {}", or_unknown(&driver.driver_version));
    println!("  SMI Version: {}", or_unknown(&driver.smi_version));
}

fn print_device(index: usize, device: &DeviceRecord) {
    println!(
        "  [{}] {} {}",
        index,
        device.display_label(index).bold(),
        format!("({})", device.device_id).dimmed()
    );
    println!(
        "      Utilization: {}",
        colored_percent(device.gpu_utilization_percent)
    );
    println!(
        "      VRAM: {} / {} ({})",
        format_mb(device.vram_used_mb),
        format_mb(device.vram_total_mb),
        colored_percent(device.vram_used_percent as i64)
    );
    println!(
        "      Temperature: {}",
        colored_temperature(device.gpu_temperature_celsius)
    );
}

/// Full human-readable report for one snapshot
pub fn print_snapshot(snapshot: &Snapshot) {
    println!("\n{}", "AMD GPU STATUS".bold().bright_cyan());
    println!("{}", "=".repeat(60));

    print_driver_info(&snapshot.driver);
    print_section_header("GPUS");

    if snapshot.is_empty() {
        println!("  {}", NO_DEVICES_SUMMARY.yellow());
        return;
    }

    for (index, device) in snapshot.devices.iter().enumerate() {
        if index > 0 {
            println!();
        }
        print_device(index, device);
    }
}

/// `[HH:MM:SS] <summary>` line used by `watch`
pub fn format_summary_line(snapshot: &Snapshot) -> String {
    format!(
        "{} {}",
        format!("[{}]", format_timestamp(snapshot.timestamp)).dimmed(),
        snapshot.summary()
    )
}

/// Show where the SMI tool is searched for
pub fn print_search_locations(locator: &ToolLocator) {
    print_section_header("SEARCH ORDER");
    for (i, candidate) in locator.candidates().iter().enumerate() {
        println!("  {}. {}", i + 1, candidate);
    }
}
