//! Background poll loop and its lifecycle.
//!
//! The loop runs on a dedicated `gpu-monitor` thread that owns a single-threaded
//! Tokio runtime. `start`, `stop` and `set_interval` may be called from any
//! thread while the loop is running.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::sync::watch;

use super::collector;
use super::metrics::Snapshot;
use super::publisher::{EventSink, Publisher};
use super::state::StateStore;
use crate::core::config::{clamp_interval, MonitorConfig};
use crate::error::{MonitorError, Result};
use crate::platform::gpu::{AmdSmi, CommandRunner, ToolLocator};

const THREAD_NAME: &str = "gpu-monitor";
const JOIN_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Stopped,
    /// Tool resolved, driver info being fetched.
    Starting,
    Running,
}

/// State shared with the poll thread.
struct Shared {
    store: StateStore,
    state: Mutex<MonitorState>,
    interval_ms: AtomicU64,
}

impl Shared {
    fn new(interval: Duration) -> Self {
        Self {
            store: StateStore::new(),
            state: Mutex::new(MonitorState::Stopped),
            interval_ms: AtomicU64::new(interval.as_millis() as u64),
        }
    }

    fn state(&self) -> MonitorState {
        *self.state.lock()
    }

    fn set_state(&self, next: MonitorState) {
        *self.state.lock() = next;
    }

    /// Move `from -> to`; false if the state changed underneath us.
    fn transition(&self, from: MonitorState, to: MonitorState) -> bool {
        let mut state = self.state.lock();
        if *state != from {
            return false;
        }
        *state = to;
        true
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::Relaxed))
    }
}

struct Worker {
    shutdown_tx: watch::Sender<bool>,
    handle: thread::JoinHandle<()>,
}

/// AMD GPU monitor: polls the SMI tool and publishes every cycle.
pub struct GpuMonitor {
    config: MonitorConfig,
    locator: ToolLocator,
    publisher: Arc<Publisher>,
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
}

impl GpuMonitor {
    pub fn new(config: MonitorConfig, sink: Arc<dyn EventSink>) -> Self {
        let locator = ToolLocator::new().with_preferred(config.tool_path.clone());
        Self::with_locator(config, locator, sink)
    }

    pub fn with_locator(config: MonitorConfig, locator: ToolLocator, sink: Arc<dyn EventSink>) -> Self {
        let publisher = Arc::new(Publisher::new(config.event_name.clone(), sink));
        let shared = Arc::new(Shared::new(config.update_interval()));

        Self {
            config,
            locator,
            publisher,
            shared,
            worker: Mutex::new(None),
        }
    }

    /// Start polling in the background.
    ///
    /// Does nothing if the monitor is already starting or running. A missing
    /// tool is logged and returned as [`MonitorError::ToolNotFound`]; the monitor
    /// then stays stopped.
    pub fn start(&self) -> Result<()> {
        let mut worker = self.worker.lock();

        if self.shared.state() != MonitorState::Stopped {
            log::debug!("GPU monitor already running");
            return Ok(());
        }

        // The previous thread may have exited on its own.
        if let Some(stale) = worker.take() {
            let _ = stale.handle.join();
        }

        let runner = CommandRunner::new(self.config.command_timeout());
        let smi = match AmdSmi::locate(&self.locator, runner) {
            Ok(smi) => smi,
            Err(e) => {
                log::error!("{}; AMD GPU monitoring disabled", e);
                return Err(e);
            }
        };
        log::info!("Using AMD SMI tool at {}", smi.path().display());

        self.shared.set_state(MonitorState::Starting);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shared = Arc::clone(&self.shared);
        let publisher = Arc::clone(&self.publisher);

        let spawned = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || run_worker(smi, shared, publisher, shutdown_rx));

        match spawned {
            Ok(handle) => {
                *worker = Some(Worker {
                    shutdown_tx,
                    handle,
                });
                Ok(())
            }
            Err(e) => {
                self.shared.set_state(MonitorState::Stopped);
                Err(MonitorError::runtime(format!(
                    "Failed to spawn {} thread: {}",
                    THREAD_NAME, e
                )))
            }
        }
    }

    /// Signal the loop to exit and wait up to the configured stop timeout.
    ///
    /// A command in flight is allowed to finish or time out first. If the wait
    /// runs out the thread is detached. Calling this when stopped is a no-op.
    pub fn stop(&self) {
        let Some(worker) = self.worker.lock().take() else {
            return;
        };

        let _ = worker.shutdown_tx.send(true);

        let deadline = Instant::now() + self.config.stop_timeout();
        while !worker.handle.is_finished() && Instant::now() < deadline {
            thread::sleep(JOIN_POLL);
        }

        if worker.handle.is_finished() {
            if worker.handle.join().is_err() {
                log::error!("GPU monitor thread panicked");
            }
        } else {
            log::warn!(
                "GPU monitor did not stop within {:?}; detaching it",
                self.config.stop_timeout()
            );
        }

        self.shared.set_state(MonitorState::Stopped);
        log::info!("GPU monitor stopped");
    }

    /// Change the delay used from the next sleep on, clamped to [0.1, 10.0] seconds.
    ///
    /// Non-finite values are ignored. Returns the interval now in effect.
    pub fn set_interval(&self, secs: f64) -> Duration {
        if !secs.is_finite() {
            log::warn!("Ignoring invalid update interval {}", secs);
            return self.interval();
        }

        let millis = (clamp_interval(secs) * 1000.0).round() as u64;
        self.shared.interval_ms.store(millis, Ordering::Relaxed);
        self.interval()
    }

    pub fn interval(&self) -> Duration {
        self.shared.interval()
    }

    pub fn state(&self) -> MonitorState {
        self.shared.state()
    }

    pub fn is_running(&self) -> bool {
        self.state() == MonitorState::Running
    }

    /// Latest complete snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.shared.store.read_all()
    }

    pub fn summary(&self) -> String {
        self.snapshot().summary()
    }

    /// Host control surface: apply a new interval and report the current state.
    pub fn set_interval_and_summarize(&self, secs: f64) -> String {
        self.set_interval(secs);
        self.summary()
    }
}

impl Drop for GpuMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(
    smi: AmdSmi,
    shared: Arc<Shared>,
    publisher: Arc<Publisher>,
    shutdown: watch::Receiver<bool>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to build GPU monitor runtime: {}", e);
            shared.set_state(MonitorState::Stopped);
            return;
        }
    };

    runtime.block_on(monitor_loop(smi, &shared, &publisher, shutdown));
    log::debug!("GPU monitor loop exited");
}

async fn monitor_loop(
    smi: AmdSmi,
    shared: &Shared,
    publisher: &Publisher,
    mut shutdown: watch::Receiver<bool>,
) {
    let driver = collector::fetch_driver_info(&smi).await;
    if *shutdown.borrow_and_update() {
        return;
    }
    shared.store.set_driver_info(driver);
    if !shared.transition(MonitorState::Starting, MonitorState::Running) {
        return;
    }
    log::info!("GPU monitor running every {:?}", shared.interval());

    loop {
        if *shutdown.borrow_and_update() {
            break;
        }

        let cycle = AssertUnwindSafe(run_cycle(&smi, shared, publisher, &shutdown))
            .catch_unwind()
            .await;
        if cycle.is_err() {
            log::error!("GPU monitor cycle panicked; continuing with the next one");
        }

        tokio::select! {
            _ = tokio::time::sleep(shared.interval()) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow_and_update() {
                    break;
                }
            }
        }
    }
}

/// Collect, store and publish one cycle.
///
/// Nothing is stored or published once shutdown has been requested, so a
/// worker detached by `stop` cannot touch the store after it reports Stopped.
async fn run_cycle(
    smi: &AmdSmi,
    shared: &Shared,
    publisher: &Publisher,
    shutdown: &watch::Receiver<bool>,
) {
    let stopping = || *shutdown.borrow();

    let Some(devices) = collector::collect_devices_until(smi, stopping).await else {
        return;
    };
    if stopping() {
        log::debug!("Discarding cycle finished after stop");
        return;
    }

    let snapshot = shared.store.replace(devices);
    log::trace!("GPU cycle: {}", snapshot.summary());
    publisher.publish(&snapshot);
}

/// Resolve the tool and collect a single snapshot, without starting a monitor.
pub fn poll_once(config: &MonitorConfig) -> Result<Snapshot> {
    let locator = ToolLocator::new().with_preferred(config.tool_path.clone());
    let smi = AmdSmi::locate(&locator, CommandRunner::new(config.command_timeout()))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| MonitorError::runtime(format!("Failed to build runtime: {}", e)))?;

    Ok(runtime.block_on(collector::collect_snapshot(&smi)))
}
