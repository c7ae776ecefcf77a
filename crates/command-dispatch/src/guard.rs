//! Service and device eligibility checks run before any resource is touched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cache::DeviceCache;
use crate::error::CommandError;
use crate::profile::{AdminState, Device, OperatingState};

/// Shared handle over the service-wide administrative state.
#[derive(Debug, Clone, Default)]
pub struct ServiceState {
    locked: Arc<AtomicBool>,
}

impl ServiceState {
    #[must_use]
    pub fn new(admin_state: AdminState) -> Self {
        let state = Self::default();
        state.set_admin_state(admin_state);
        state
    }

    #[must_use]
    pub fn admin_state(&self) -> AdminState {
        if self.locked.load(Ordering::Acquire) {
            AdminState::Locked
        } else {
            AdminState::Unlocked
        }
    }

    pub fn set_admin_state(&self, admin_state: AdminState) {
        self.locked
            .store(admin_state == AdminState::Locked, Ordering::Release);
    }
}

/// Resolve the device snapshot for an invocation, failing on the first of:
/// service locked, device unknown, device locked or down.
pub fn check_device(
    service: AdminState,
    cache: &dyn DeviceCache,
    device_name: &str,
) -> Result<Device, CommandError> {
    if service == AdminState::Locked {
        return Err(CommandError::ServiceLocked("service locked".into()));
    }
    let device = cache.device(device_name).ok_or_else(|| {
        CommandError::EntityNotFound(format!("device {device_name} not found").into())
    })?;
    if device.admin_state == AdminState::Locked {
        return Err(CommandError::ServiceLocked(
            format!("device {} locked", device.name).into(),
        ));
    }
    if device.operating_state == OperatingState::Down {
        return Err(CommandError::ServiceLocked(
            format!("device {} OperatingState is DOWN", device.name).into(),
        ));
    }
    Ok(device)
}
