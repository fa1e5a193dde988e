// Core monitoring logic

pub mod config;
pub mod system_monitor;

// Re-export commonly used items
pub use config::MonitorConfig;
pub use system_monitor::{GpuMonitor, MonitorState, Snapshot};
