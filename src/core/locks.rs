use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::device::DeviceName;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("drive {0} is busy with another operation")]
pub struct DeviceBusy(pub String);

type LockTable = Arc<Mutex<HashMap<DeviceName, Arc<AsyncMutex<()>>>>>;

/// One mutex per drive. Holding a `DeviceGuard` gives exclusive use of the
/// hardware; a second caller is turned away instead of racing for it.
///
/// Entries live only while someone holds or is acquiring them, so the table
/// never outgrows the set of drives currently in use.
#[derive(Clone, Default)]
pub struct DeviceLocks {
    table: LockTable,
}

pub struct DeviceGuard {
    device: DeviceName,
    table: LockTable,
    guard: Option<OwnedMutexGuard<()>>,
}

impl DeviceGuard {
    pub fn device(&self) -> &DeviceName {
        &self.device
    }
}

impl Drop for DeviceGuard {
    fn drop(&mut self) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        drop(self.guard.take());

        // Anyone else about to lock this drive cloned the Arc under the table
        // lock, so a count of one means the entry is ours alone.
        if table
            .get(&self.device)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            table.remove(&self.device);
        }
    }
}

impl DeviceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, device: &DeviceName) -> Result<DeviceGuard, DeviceBusy> {
        let lock = self
            .table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(device.clone())
            .or_default()
            .clone();

        let guard = lock
            .try_lock_owned()
            .map_err(|_| DeviceBusy(device.to_string()))?;

        Ok(DeviceGuard {
            device: device.clone(),
            table: self.table.clone(),
            guard: Some(guard),
        })
    }
}
