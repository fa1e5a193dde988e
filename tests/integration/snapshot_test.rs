#![cfg(unix)]

use amdgpu_monitor::core::system_monitor::collector::{collect_devices, collect_snapshot};
use amdgpu_monitor::core::system_monitor::{DeviceRecord, MonitorPayload};
use amdgpu_monitor::platform::gpu::{AmdSmi, CommandRunner};
use amdgpu_monitor::{poll_once, MonitorConfig};

use super::fake_smi::{self, FakeSmi};

fn tool(smi: &FakeSmi) -> AmdSmi {
    AmdSmi::new(smi.path(), CommandRunner::default())
}

#[tokio::test]
async fn test_reference_card() {
    let smi = FakeSmi::single_card();
    let snapshot = collect_snapshot(&tool(&smi)).await;

    assert_eq!(
        snapshot.devices,
        vec![DeviceRecord {
            device_id: "card0".into(),
            label: "Radeon RX 7900".into(),
            gpu_utilization_percent: 37,
            vram_used_mb: 4096,
            vram_total_mb: 16384,
            vram_used_percent: 25,
            gpu_temperature_celsius: 65,
        }]
    );
    assert_eq!(snapshot.driver.device_type, "rocm");
    assert_eq!(snapshot.driver.driver_version, "Driver version: 6.3.6");
    assert_eq!(snapshot.driver.smi_version, "ROCM-SMI version: 2.0.0");
    assert_eq!(
        snapshot.summary(),
        "Radeon RX 7900: 37% | VRAM 4096MB/16384MB (25%) | 65°C"
    );
}

#[tokio::test]
async fn test_one_failing_query_keeps_the_others() {
    let smi = FakeSmi::single_card();
    smi.remove(fake_smi::MEMORY);
    smi.set(fake_smi::TEMPERATURE, "not json at all");

    let devices = collect_devices(&tool(&smi)).await;
    let card = &devices["card0"];
    assert_eq!(card.gpu_utilization_percent, 37);
    assert_eq!(card.label, "Radeon RX 7900");
    assert_eq!(card.vram_total_mb, 0);
    assert_eq!(card.gpu_temperature_celsius, 0);
}

#[tokio::test]
async fn test_multiple_cards_ordered_and_metadata_ignored() {
    let smi = FakeSmi::new();
    smi.set(
        fake_smi::UTILIZATION,
        r#"{"system": {"Driver version": "6.3.6"}, "card1": {"GPU use (%)": "5"}, "card0": {"GPU use (%)": "99.9"}}"#,
    );
    smi.set(
        fake_smi::TEMPERATURE,
        r#"{"card1": {"Temperature (Sensor junction) (C)": "48.0"}}"#,
    );

    let snapshot = collect_snapshot(&tool(&smi)).await;
    let ids: Vec<&str> = snapshot.devices.iter().map(|d| d.device_id.as_str()).collect();
    assert_eq!(ids, ["card0", "card1"]);
    assert_eq!(snapshot.devices[0].gpu_utilization_percent, 99);
    assert_eq!(snapshot.devices[1].gpu_temperature_celsius, 48);

    // Driver queries fail: metadata stays at defaults.
    assert!(snapshot.driver.driver_version.is_empty());

    let payload = MonitorPayload::from_snapshot(&snapshot);
    assert_eq!(payload.gpus[1].index, 1);
    assert_eq!(payload.gpus[1].label, "card1");
}

#[test]
fn test_poll_once_with_configured_tool() {
    let smi = FakeSmi::single_card();
    let config = MonitorConfig {
        tool_path: Some(smi.path().to_path_buf()),
        ..Default::default()
    };

    let snapshot = poll_once(&config).unwrap();
    assert_eq!(snapshot.devices.len(), 1);
    assert_eq!(snapshot.devices[0].vram_used_percent, 25);
    assert!(snapshot.timestamp > 0);
}
