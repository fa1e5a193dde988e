use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Every device key reported by the SMI tool starts with this prefix.
pub const DEVICE_PREFIX: &str = "card";

/// Backend identifier published with every snapshot.
pub const DEVICE_TYPE: &str = "rocm";

/// Summary shown when the last cycle reported no devices.
pub const NO_DEVICES_SUMMARY: &str = "No AMD GPUs detected";

/// Per-cycle device map, ordered by device id.
pub type DeviceMap = BTreeMap<String, DeviceRecord>;

/// Normalized telemetry for one GPU.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub device_id: String,
    pub label: String,
    pub gpu_utilization_percent: i64,
    pub vram_used_mb: u64,
    pub vram_total_mb: u64,
    pub vram_used_percent: u64,
    pub gpu_temperature_celsius: i64,
}

impl DeviceRecord {
    pub fn new<S: Into<String>>(device_id: S) -> Self {
        Self {
            device_id: device_id.into(),
            ..Default::default()
        }
    }

    /// Product label, falling back to the device id and then `GPU{index}`.
    pub fn display_label(&self, index: usize) -> String {
        if !self.label.is_empty() {
            self.label.clone()
        } else if !self.device_id.is_empty() {
            self.device_id.clone()
        } else {
            format!("GPU{}", index)
        }
    }

    /// One-line status, e.g. `Radeon RX 7900: 37% | VRAM 4096MB/16384MB (25%) | 65°C`.
    pub fn summary(&self, index: usize) -> String {
        format!(
            "{}: {}% | VRAM {}MB/{}MB ({}%) | {}°C",
            self.display_label(index),
            self.gpu_utilization_percent,
            self.vram_used_mb,
            self.vram_total_mb,
            self.vram_used_percent,
            self.gpu_temperature_celsius
        )
    }
}

/// Static driver metadata, fetched once per start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverInfo {
    pub device_type: String,
    pub driver_version: String,
    pub smi_version: String,
}

impl Default for DriverInfo {
    fn default() -> Self {
        Self {
            device_type: DEVICE_TYPE.to_string(),
            driver_version: String::new(),
            smi_version: String::new(),
        }
    }
}

/// Complete result of one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unix timestamp (milliseconds) of the cycle, 0 before the first one.
    pub timestamp: i64,
    pub driver: DriverInfo,
    /// Ordered by `device_id`; a device's index is its position here.
    pub devices: Vec<DeviceRecord>,
}

impl Snapshot {
    pub fn new(driver: DriverInfo, devices: DeviceMap) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis(),
            driver,
            devices: devices.into_values().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn device(&self, device_id: &str) -> Option<&DeviceRecord> {
        self.devices.iter().find(|d| d.device_id == device_id)
    }

    /// Host-facing status string, one segment per device in index order.
    pub fn summary(&self) -> String {
        if self.devices.is_empty() {
            return NO_DEVICES_SUMMARY.to_string();
        }

        self.devices
            .iter()
            .enumerate()
            .map(|(index, device)| device.summary(index))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}
