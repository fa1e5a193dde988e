//! Last-known GPU state shared between the poll thread and readers.

use std::sync::Arc;

use parking_lot::RwLock;

use super::metrics::{DeviceMap, DriverInfo, Snapshot};

/// Holds the current snapshot.
///
/// Snapshots are immutable once stored: `replace` swaps in a whole new one
/// under a short write lock and readers get a shared handle, so a reader never
/// sees devices from two different cycles.
#[derive(Debug, Default)]
pub struct StateStore {
    current: RwLock<Arc<Snapshot>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in the devices of a new cycle, keeping the driver metadata.
    pub fn replace(&self, devices: DeviceMap) -> Arc<Snapshot> {
        let mut current = self.current.write();
        let next = Arc::new(Snapshot::new(current.driver.clone(), devices));
        *current = Arc::clone(&next);
        next
    }

    /// Latest snapshot.
    pub fn read_all(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    /// Set driver metadata; done once per tool resolution.
    pub fn set_driver_info(&self, driver: DriverInfo) {
        let mut current = self.current.write();
        let mut next = Snapshot::clone(&current);
        next.driver = driver;
        *current = Arc::new(next);
    }

    pub fn driver_info(&self) -> DriverInfo {
        self.current.read().driver.clone()
    }
}
