use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::system_monitor::EVENT_NAME;
use crate::error::{MonitorError, Result};

pub const DEFAULT_UPDATE_INTERVAL_SECS: f64 = 1.0;
pub const MIN_UPDATE_INTERVAL_SECS: f64 = 0.1;
pub const MAX_UPDATE_INTERVAL_SECS: f64 = 10.0;
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_STOP_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_EVENT_BUFFER: usize = 16;

/// Clamp a poll interval to the supported range.
pub fn clamp_interval(secs: f64) -> f64 {
    secs.clamp(MIN_UPDATE_INTERVAL_SECS, MAX_UPDATE_INTERVAL_SECS)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between poll cycles
    pub update_interval_secs: f64,
    /// Explicit rocm-smi / amd-smi path tried before the built-in search
    pub tool_path: Option<PathBuf>,
    pub command_timeout_secs: u64,
    pub stop_timeout_secs: u64,
    pub event_name: String,
    /// Capacity of the subscriber channel
    pub event_buffer: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
            tool_path: None,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            stop_timeout_secs: DEFAULT_STOP_TIMEOUT_SECS,
            event_name: EVENT_NAME.to_string(),
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl MonitorConfig {
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load from `path`; a missing, empty or unreadable-format file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if !path.exists() {
            MonitorConfig::default()
        } else {
            let data = fs::read(path).map_err(|e| {
                MonitorError::config(format!("Failed to read config file {:?}: {}", path, e))
            })?;

            if data.iter().all(u8::is_ascii_whitespace) {
                MonitorConfig::default()
            } else {
                serde_json::from_slice(&data).unwrap_or_else(|e| {
                    log::warn!("Ignoring invalid config file {:?}: {}", path, e);
                    MonitorConfig::default()
                })
            }
        };

        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                MonitorError::config(format!(
                    "Failed to create config directory {:?}: {}",
                    parent, e
                ))
            })?;
        }

        let data = serde_json::to_vec_pretty(self)?;
        fs::write(path, data).map_err(|e| {
            MonitorError::config(format!("Failed to write config file {:?}: {}", path, e))
        })?;

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| MonitorError::config("Could not determine config directory"))?;

        Ok(config_dir.join("amdgpu-monitor").join("config.json"))
    }

    /// Set the poll interval, clamped to [0.1, 10.0] seconds. Returns the stored value.
    pub fn set_update_interval(&mut self, secs: f64) -> Result<f64> {
        if !secs.is_finite() {
            return Err(MonitorError::config(format!(
                "Update interval must be a number of seconds, got {}",
                secs
            )));
        }
        self.update_interval_secs = clamp_interval(secs);
        Ok(self.update_interval_secs)
    }

    pub fn set_tool_path(&mut self, path: PathBuf) {
        self.tool_path = Some(path);
    }

    pub fn clear_tool_path(&mut self) {
        self.tool_path = None;
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs_f64(self.update_interval_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    /// Bring hand-edited values back into range
    fn normalize(&mut self) {
        self.update_interval_secs = if self.update_interval_secs.is_finite() {
            clamp_interval(self.update_interval_secs)
        } else {
            DEFAULT_UPDATE_INTERVAL_SECS
        };
        if self.command_timeout_secs == 0 {
            self.command_timeout_secs = DEFAULT_COMMAND_TIMEOUT_SECS;
        }
        if self.stop_timeout_secs == 0 {
            self.stop_timeout_secs = DEFAULT_STOP_TIMEOUT_SECS;
        }
        if self.event_name.trim().is_empty() {
            self.event_name = EVENT_NAME.to_string();
        }
        self.event_buffer = self.event_buffer.max(1);
    }
}
