#![cfg(unix)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use amdgpu_monitor::core::system_monitor::{MonitorPayload, NO_DEVICES_SUMMARY};
use amdgpu_monitor::error::MonitorError;
use amdgpu_monitor::{
    ChannelSink, EventSink, GpuMonitor, MonitorConfig, MonitorEvent, MonitorState, ToolLocator,
    EVENT_NAME,
};
use serde_json::Value;
use tokio::sync::mpsc::{error::TryRecvError, Receiver};

use super::fake_smi::{self, FakeSmi};

const WAIT: Duration = Duration::from_secs(5);

fn fast_config(smi: &FakeSmi) -> MonitorConfig {
    MonitorConfig {
        update_interval_secs: 0.1,
        tool_path: Some(smi.path().to_path_buf()),
        ..Default::default()
    }
}

fn watched(smi: &FakeSmi) -> (GpuMonitor, Receiver<MonitorEvent>) {
    let (sink, rx) = ChannelSink::channel(64);
    (GpuMonitor::new(fast_config(smi), Arc::new(sink)), rx)
}

fn next_event(rx: &mut Receiver<MonitorEvent>, within: Duration) -> Option<MonitorEvent> {
    let deadline = Instant::now() + within;
    while Instant::now() < deadline {
        match rx.try_recv() {
            Ok(event) => return Some(event),
            Err(TryRecvError::Empty) => thread::sleep(Duration::from_millis(10)),
            Err(TryRecvError::Disconnected) => return None,
        }
    }
    None
}

fn wait_for_payload<F>(rx: &mut Receiver<MonitorEvent>, mut accept: F) -> Option<MonitorPayload>
where
    F: FnMut(&MonitorPayload) -> bool,
{
    let deadline = Instant::now() + WAIT;
    while let Some(event) = next_event(rx, deadline.saturating_duration_since(Instant::now())) {
        let payload: MonitorPayload = serde_json::from_value(event.payload).ok()?;
        if accept(&payload) {
            return Some(payload);
        }
    }
    None
}

fn drain(rx: &mut Receiver<MonitorEvent>) -> usize {
    let mut drained = 0;
    while rx.try_recv().is_ok() {
        drained += 1;
    }
    drained
}

#[test]
fn test_start_publishes_cycles() {
    let smi = FakeSmi::single_card();
    let (monitor, mut rx) = watched(&smi);

    monitor.start().unwrap();
    let event = next_event(&mut rx, WAIT).expect("no event published");
    assert_eq!(event.name, EVENT_NAME);
    assert_eq!(monitor.state(), MonitorState::Running);

    let payload: MonitorPayload = serde_json::from_value(event.payload).unwrap();
    assert_eq!(payload.device_type, "rocm");
    assert_eq!(payload.driver.driver_version, "Driver version: 6.3.6");
    assert_eq!(payload.gpus.len(), 1);
    assert_eq!(payload.gpus[0].card, "card0");
    assert_eq!(payload.gpus[0].label, "Radeon RX 7900");
    assert_eq!(payload.gpus[0].gpu_utilization, 37);
    assert_eq!(payload.gpus[0].vram_total, 16384);
    assert_eq!(payload.gpus[0].vram_used, 4096);
    assert_eq!(payload.gpus[0].vram_used_percent, 25);
    assert_eq!(payload.gpus[0].gpu_temperature, 65);

    assert_eq!(
        monitor.summary(),
        "Radeon RX 7900: 37% | VRAM 4096MB/16384MB (25%) | 65°C"
    );

    // Keeps polling.
    assert!(next_event(&mut rx, WAIT).is_some());

    monitor.stop();
    assert_eq!(monitor.state(), MonitorState::Stopped);
}

#[test]
fn test_driver_info_fetched_once() {
    let smi = FakeSmi::single_card();
    let (monitor, mut rx) = watched(&smi);

    monitor.start().unwrap();
    for _ in 0..3 {
        next_event(&mut rx, WAIT).expect("no event published");
    }
    monitor.stop();

    let driver_calls = smi
        .calls()
        .iter()
        .filter(|c| c.as_str() == "--showdriverversion")
        .count();
    assert_eq!(driver_calls, 1);
}

#[test]
fn test_missing_card_disappears_next_cycle() {
    let smi = FakeSmi::single_card();
    smi.set(
        fake_smi::UTILIZATION,
        r#"{"card0": {"GPU use (%)": "10"}, "card1": {"GPU use (%)": "20"}}"#,
    );
    let (monitor, mut rx) = watched(&smi);
    monitor.start().unwrap();

    wait_for_payload(&mut rx, |p| p.gpus.len() == 2).expect("never saw both cards");

    smi.set(fake_smi::UTILIZATION, r#"{"card0": {"GPU use (%)": "10"}}"#);
    let payload =
        wait_for_payload(&mut rx, |p| p.gpus.len() == 1).expect("card1 never disappeared");
    assert_eq!(payload.gpus[0].card, "card0");
    assert!(monitor.snapshot().device("card1").is_none());

    monitor.stop();
}

#[test]
fn test_set_interval_applies_without_restart() {
    let smi = FakeSmi::single_card();
    let (monitor, mut rx) = watched(&smi);
    monitor.start().unwrap();
    next_event(&mut rx, WAIT).expect("no event published");

    assert_eq!(monitor.set_interval(10.0), Duration::from_secs(10));

    // Let the sleep already in progress and one more cycle finish.
    thread::sleep(Duration::from_millis(600));
    drain(&mut rx);
    assert!(next_event(&mut rx, Duration::from_millis(800)).is_none());
    assert!(monitor.is_running());

    // The long sleep is interrupted by stop.
    let started = Instant::now();
    monitor.stop();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(monitor.state(), MonitorState::Stopped);
}

#[test]
fn test_detached_worker_leaves_state_alone() {
    let smi = FakeSmi::single_card();
    let config = MonitorConfig {
        stop_timeout_secs: 1,
        ..fast_config(&smi)
    };
    let (sink, mut rx) = ChannelSink::channel(64);
    let monitor = GpuMonitor::new(config, Arc::new(sink));

    monitor.start().unwrap();
    next_event(&mut rx, WAIT).expect("no event published");

    // Next cycle blocks in the utilization query past the stop timeout.
    smi.set_delay(fake_smi::UTILIZATION, 2);
    thread::sleep(Duration::from_millis(500));
    drain(&mut rx);
    let before = monitor.snapshot();

    monitor.stop();
    assert_eq!(monitor.state(), MonitorState::Stopped);

    // Give the detached worker time to finish its slow query.
    thread::sleep(Duration::from_millis(2500));
    assert!(next_event(&mut rx, Duration::from_millis(200)).is_none());
    assert!(Arc::ptr_eq(&before, &monitor.snapshot()));
}

#[test]
fn test_stop_while_starting_keeps_driver_info_empty() {
    let smi = FakeSmi::single_card();
    smi.set_delay(fake_smi::DRIVER, 2);
    let config = MonitorConfig {
        stop_timeout_secs: 1,
        ..fast_config(&smi)
    };
    let (sink, mut rx) = ChannelSink::channel(64);
    let monitor = GpuMonitor::new(config, Arc::new(sink));

    monitor.start().unwrap();
    assert_eq!(monitor.state(), MonitorState::Starting);
    monitor.stop();
    assert_eq!(monitor.state(), MonitorState::Stopped);

    thread::sleep(Duration::from_millis(2500));
    assert!(monitor.snapshot().driver.driver_version.is_empty());
    assert!(monitor.snapshot().devices.is_empty());
    assert!(next_event(&mut rx, Duration::from_millis(200)).is_none());
}

#[test]
fn test_start_and_stop_are_idempotent() {
    let smi = FakeSmi::single_card();
    let (monitor, mut rx) = watched(&smi);

    monitor.start().unwrap();
    monitor.start().unwrap();
    next_event(&mut rx, WAIT).expect("no event published");

    monitor.stop();
    monitor.stop();
    assert_eq!(monitor.state(), MonitorState::Stopped);

    // And it can be started again.
    drain(&mut rx);
    monitor.start().unwrap();
    assert!(next_event(&mut rx, WAIT).is_some());
    monitor.stop();
}

#[test]
fn test_missing_tool_never_runs() {
    let (sink, mut rx) = ChannelSink::channel(4);
    let locator = ToolLocator::new()
        .with_search_paths(Vec::<std::path::PathBuf>::new())
        .with_tool_names(Vec::<String>::new());
    let monitor = GpuMonitor::with_locator(MonitorConfig::default(), locator, Arc::new(sink));

    assert!(matches!(monitor.start(), Err(MonitorError::ToolNotFound)));
    assert_eq!(monitor.state(), MonitorState::Stopped);
    assert!(monitor.snapshot().devices.is_empty());
    assert_eq!(monitor.summary(), NO_DEVICES_SUMMARY);
    assert!(next_event(&mut rx, Duration::from_millis(200)).is_none());
}

#[test]
fn test_failing_sink_does_not_stop_polling() {
    let smi = FakeSmi::single_card();
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let sink = move |_: &str, _: &Value| -> amdgpu_monitor::Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(MonitorError::publish("host went away"))
    };

    let monitor = GpuMonitor::new(fast_config(&smi), Arc::new(sink));
    monitor.start().unwrap();

    let deadline = Instant::now() + WAIT;
    while attempts.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
    assert!(attempts.load(Ordering::SeqCst) >= 3);
    assert!(monitor.is_running());
    monitor.stop();
}

struct PanickingSink {
    calls: AtomicUsize,
}

impl EventSink for PanickingSink {
    fn send(&self, _event: &str, _payload: &Value) -> amdgpu_monitor::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        panic!("sink exploded");
    }
}

#[test]
fn test_panicking_cycle_is_contained() {
    let smi = FakeSmi::single_card();
    let sink = Arc::new(PanickingSink {
        calls: AtomicUsize::new(0),
    });

    let monitor = GpuMonitor::new(fast_config(&smi), sink.clone());
    monitor.start().unwrap();

    let deadline = Instant::now() + WAIT;
    while sink.calls.load(Ordering::SeqCst) < 2 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
    assert!(sink.calls.load(Ordering::SeqCst) >= 2);
    assert!(monitor.is_running());

    // State was replaced before the publish panicked.
    assert_eq!(monitor.snapshot().devices.len(), 1);
    monitor.stop();
}

#[test]
fn test_drop_stops_the_worker() {
    let smi = FakeSmi::single_card();
    let (monitor, mut rx) = watched(&smi);
    monitor.start().unwrap();
    next_event(&mut rx, WAIT).expect("no event published");

    drop(monitor);
    drain(&mut rx);
    // Sender side is gone once the worker thread has exited.
    assert!(next_event(&mut rx, Duration::from_millis(500)).is_none());
}
