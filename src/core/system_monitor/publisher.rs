//! Wire payload and delivery to the host event sink.
//!
//! Publication is fire-and-forget: a failed delivery is logged and dropped, the
//! next cycle sends fresh data anyway.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::metrics::{DeviceRecord, DriverInfo, Snapshot};
use crate::error::{MonitorError, Result};

/// Event name the front-end listens on.
pub const EVENT_NAME: &str = "amd_gpu_monitor";

/// Host-provided push target with a `send(event_name, payload)` contract.
pub trait EventSink: Send + Sync {
    fn send(&self, event: &str, payload: &Value) -> Result<()>;
}

impl<F> EventSink for F
where
    F: Fn(&str, &Value) -> Result<()> + Send + Sync,
{
    fn send(&self, event: &str, payload: &Value) -> Result<()> {
        self(event, payload)
    }
}

/// One delivered event.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorEvent {
    pub name: String,
    pub payload: Value,
}

/// Single-subscriber push channel.
///
/// Never blocks the poll thread: a full or closed channel is a publish failure.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<MonitorEvent>,
}

impl ChannelSink {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<MonitorEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn send(&self, event: &str, payload: &Value) -> Result<()> {
        let event = MonitorEvent {
            name: event.to_string(),
            payload: payload.clone(),
        };
        self.tx.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => MonitorError::publish("subscriber is not keeping up"),
            TrySendError::Closed(_) => MonitorError::publish("subscriber has gone away"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverPayload {
    pub driver_version: String,
    pub smi_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuPayload {
    pub index: usize,
    pub card: String,
    pub label: String,
    pub gpu_utilization: i64,
    pub gpu_temperature: i64,
    pub vram_total: u64,
    pub vram_used: u64,
    pub vram_used_percent: u64,
}

/// Payload published under [`EVENT_NAME`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorPayload {
    pub device_type: String,
    pub driver: DriverPayload,
    pub gpus: Vec<GpuPayload>,
    #[serde(default)]
    pub timestamp: i64,
}

impl MonitorPayload {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let gpus = snapshot
            .devices
            .iter()
            .enumerate()
            .map(|(index, device)| GpuPayload {
                index,
                card: device.device_id.clone(),
                label: device.display_label(index),
                gpu_utilization: device.gpu_utilization_percent,
                gpu_temperature: device.gpu_temperature_celsius,
                vram_total: device.vram_total_mb,
                vram_used: device.vram_used_mb,
                vram_used_percent: device.vram_used_percent,
            })
            .collect();

        Self {
            device_type: snapshot.driver.device_type.clone(),
            driver: DriverPayload {
                driver_version: snapshot.driver.driver_version.clone(),
                smi_version: snapshot.driver.smi_version.clone(),
            },
            gpus,
            timestamp: snapshot.timestamp,
        }
    }

    /// Rebuild the snapshot this payload was made from.
    pub fn into_snapshot(self) -> Snapshot {
        Snapshot {
            timestamp: self.timestamp,
            driver: DriverInfo {
                device_type: self.device_type,
                driver_version: self.driver.driver_version,
                smi_version: self.driver.smi_version,
            },
            devices: self
                .gpus
                .into_iter()
                .map(|gpu| DeviceRecord {
                    device_id: gpu.card,
                    label: gpu.label,
                    gpu_utilization_percent: gpu.gpu_utilization,
                    vram_used_mb: gpu.vram_used,
                    vram_total_mb: gpu.vram_total,
                    vram_used_percent: gpu.vram_used_percent,
                    gpu_temperature_celsius: gpu.gpu_temperature,
                })
                .collect(),
        }
    }
}

/// Formats snapshots and pushes them to the sink.
pub struct Publisher {
    event_name: String,
    sink: Arc<dyn EventSink>,
}

impl Publisher {
    pub fn new<S: Into<String>>(event_name: S, sink: Arc<dyn EventSink>) -> Self {
        Self {
            event_name: event_name.into(),
            sink,
        }
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Publish, discarding any delivery failure.
    pub fn publish(&self, snapshot: &Snapshot) {
        if let Err(e) = self.try_publish(snapshot) {
            log::debug!("Dropping {} update: {}", self.event_name, e);
        }
    }

    pub fn try_publish(&self, snapshot: &Snapshot) -> Result<()> {
        let payload = serde_json::to_value(MonitorPayload::from_snapshot(snapshot))?;
        self.sink.send(&self.event_name, &payload)
    }
}
