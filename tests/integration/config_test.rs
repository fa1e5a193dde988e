use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use amdgpu_monitor::core::config::{MAX_UPDATE_INTERVAL_SECS, MIN_UPDATE_INTERVAL_SECS};
use amdgpu_monitor::MonitorConfig;
use tempfile::TempDir;

#[test]
fn test_config_default() {
    let config = MonitorConfig::default();
    assert_eq!(config.update_interval(), Duration::from_secs(1));
    assert!(config.tool_path.is_none());
    assert_eq!(config.event_buffer, 16);
}

#[test]
fn test_config_path_is_namespaced() {
    // Fails only on hosts without a config directory, which is OK
    if let Ok(path) = MonitorConfig::get_config_path() {
        assert!(path.ends_with("amdgpu-monitor/config.json"));
    }
}

#[test]
fn test_config_file_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("amdgpu-monitor").join("config.json");

    let mut config = MonitorConfig::default();
    config.set_update_interval(0.5).unwrap();
    config.set_tool_path(PathBuf::from("/opt/rocm/bin/rocm-smi"));
    config.save_to(&path).unwrap();

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["update_interval_secs"], 0.5);
    assert_eq!(raw["tool_path"], "/opt/rocm/bin/rocm-smi");

    assert_eq!(MonitorConfig::load_from(&path).unwrap(), config);
}

#[test]
fn test_hand_edited_values_are_clamped() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");

    fs::write(&path, r#"{"update_interval_secs": 600}"#).unwrap();
    assert_eq!(
        MonitorConfig::load_from(&path).unwrap().update_interval_secs,
        MAX_UPDATE_INTERVAL_SECS
    );

    fs::write(&path, r#"{"update_interval_secs": -1, "command_timeout_secs": 0}"#).unwrap();
    let config = MonitorConfig::load_from(&path).unwrap();
    assert_eq!(config.update_interval_secs, MIN_UPDATE_INTERVAL_SECS);
    assert_eq!(config.command_timeout(), Duration::from_secs(5));
}

#[test]
fn test_unknown_fields_are_ignored() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(&path, r#"{"theme": "dark", "event_name": "gpu"}"#).unwrap();

    let config = MonitorConfig::load_from(&path).unwrap();
    assert_eq!(config.event_name, "gpu");
}
