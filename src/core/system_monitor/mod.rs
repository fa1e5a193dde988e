//! AMD GPU monitoring core.
//!
//! Parses rocm-smi / amd-smi output into per-card records, keeps the latest
//! snapshot and pushes it to an event sink on every poll cycle.

pub mod collector;
mod metrics;
pub mod parser;
mod publisher;
mod runtime;
mod state;

pub use metrics::{
    DeviceMap, DeviceRecord, DriverInfo, Snapshot, DEVICE_PREFIX, DEVICE_TYPE, NO_DEVICES_SUMMARY,
};
pub use parser::FieldError;
pub use publisher::{
    ChannelSink, DriverPayload, EventSink, GpuPayload, MonitorEvent, MonitorPayload, Publisher,
    EVENT_NAME,
};
pub use runtime::{poll_once, GpuMonitor, MonitorState};
pub use state::StateStore;
