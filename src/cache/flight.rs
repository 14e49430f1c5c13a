//! Opt-in coalescing of warm-up batches.
//!
//! With `cache.coalesce_batches` enabled, a device has at most one regeneration batch in
//! flight. A caller that loses the race skips its batch; its own cache lookup and synchronous
//! fallback still produce an artifact.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;

use crate::domain::device::DeviceKey;

#[derive(Default, Clone)]
pub struct InFlightBatches {
    devices: Arc<DashMap<DeviceKey, ()>>,
}

#[derive(Debug, Error)]
pub enum InFlightError {
    #[error("warm-up batch already in progress for device {device}")]
    AlreadyRunning { device: DeviceKey },
}

impl InFlightBatches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, device: &DeviceKey) -> Result<BatchGuard, InFlightError> {
        match self.devices.entry(device.clone()) {
            Entry::Vacant(vacant) => {
                vacant.insert(());
                Ok(BatchGuard {
                    device: device.clone(),
                    devices: Arc::clone(&self.devices),
                })
            }
            Entry::Occupied(_) => Err(InFlightError::AlreadyRunning {
                device: device.clone(),
            }),
        }
    }

    pub fn is_running(&self, device: &DeviceKey) -> bool {
        self.devices.contains_key(device)
    }
}

/// Releases the device's batch slot when dropped.
pub struct BatchGuard {
    device: DeviceKey,
    devices: Arc<DashMap<DeviceKey, ()>>,
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        self.devices.remove(&self.device);
    }
}
