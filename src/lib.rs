// AMD GPU monitor library - Public API

// Re-export error types
pub mod error;
pub use error::{MonitorError, Result};

// Module declarations
pub mod commands;
pub mod core;
pub mod platform;
pub mod ui;

// Re-export commonly used types
pub use crate::core::config::MonitorConfig;
pub use crate::core::system_monitor::{
    poll_once, ChannelSink, DeviceRecord, DriverInfo, EventSink, GpuMonitor, MonitorEvent,
    MonitorPayload, MonitorState, Snapshot, StateStore, EVENT_NAME,
};
pub use platform::gpu::{AmdSmi, CommandRunner, ToolLocator};

// Initialize logging; RUST_LOG overrides the default `info` level
pub fn init_logging() {
    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}
