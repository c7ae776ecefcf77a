//! Read-only device and profile lookup used by the dispatcher.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use smol_str::SmolStr;

use crate::profile::{Device, DeviceCommand, DeviceProfile, ResourceDeclaration};

/// Device and profile lookups.
///
/// Implementations must allow concurrent readers. A dispatcher fetches the
/// profile once per invocation and resolves everything against that snapshot.
pub trait DeviceCache: Send + Sync {
    fn device(&self, name: &str) -> Option<Device>;

    fn profile(&self, name: &str) -> Option<Arc<DeviceProfile>>;

    fn device_resource(&self, profile: &str, name: &str) -> Option<ResourceDeclaration> {
        self.profile(profile)?.resource(name).cloned()
    }

    fn device_command(&self, profile: &str, name: &str) -> Option<DeviceCommand> {
        self.profile(profile)?.command(name).cloned()
    }
}

/// Map-backed cache; profiles are replaced whole so readers never observe a
/// half-updated profile.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    devices: RwLock<HashMap<SmolStr, Device>>,
    profiles: RwLock<HashMap<SmolStr, Arc<DeviceProfile>>>,
}

impl InMemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_device(&self, device: Device) {
        self.devices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(device.name.clone(), device);
    }

    pub fn remove_device(&self, name: &str) -> Option<Device> {
        self.devices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    pub fn add_profile(&self, profile: DeviceProfile) {
        self.profiles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(profile.name.clone(), Arc::new(profile));
    }

    /// Apply `update` to a device in place; returns false if it is unknown.
    pub fn update_device(&self, name: &str, update: impl FnOnce(&mut Device)) -> bool {
        let mut devices = self.devices.write().unwrap_or_else(PoisonError::into_inner);
        match devices.get_mut(name) {
            Some(device) => {
                update(device);
                true
            }
            None => false,
        }
    }
}

impl DeviceCache for InMemoryCache {
    fn device(&self, name: &str) -> Option<Device> {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn profile(&self, name: &str) -> Option<Arc<DeviceProfile>> {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}
