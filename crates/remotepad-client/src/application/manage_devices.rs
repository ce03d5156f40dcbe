//! DeviceRegistry: the client's durable list of known hosts.
//!
//! The registry owns every [`Device`].  Other components read clones; all
//! mutations go through here and are written back to the injected
//! [`PreferenceStore`] before the call returns.

use std::collections::HashSet;
use std::sync::Arc;

use remotepad_core::{Device, DeviceId, SettingKey, Settings};
use thiserror::Error;

/// Errors reported by a preference store backend.
#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("failed to load preferences: {0}")]
    Load(String),
    #[error("failed to save preferences: {0}")]
    Save(String),
}

/// Errors from registry operations.
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("device {0} is already registered")]
    AlreadyExists(DeviceId),
    #[error("device {0} is not registered")]
    NotFound(DeviceId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything loaded once at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preferences {
    pub devices: Vec<Device>,
    pub settings: Settings,
}

/// Durable key/value storage for devices and settings.
///
/// Each setting is written under its own key; the device list is written as
/// a whole.
pub trait PreferenceStore: Send + Sync {
    fn load(&self) -> Result<Preferences, StoreError>;
    fn save_devices(&self, devices: &[Device]) -> Result<(), StoreError>;
    fn save_setting(&self, key: SettingKey, value: f64) -> Result<(), StoreError>;
}

/// Counts reported after merging discovery results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub added: usize,
    pub refreshed: usize,
}

pub struct DeviceRegistry {
    devices: Vec<Device>,
    store: Arc<dyn PreferenceStore>,
}

impl DeviceRegistry {
    /// Builds a registry from already-loaded devices, dropping duplicate ids.
    pub fn new(devices: Vec<Device>, store: Arc<dyn PreferenceStore>) -> Self {
        let mut seen = HashSet::new();
        let devices = devices
            .into_iter()
            .filter(|d| seen.insert(d.id()))
            .collect();
        Self { devices, store }
    }

    /// Loads preferences from `store` and returns the registry plus settings.
    pub fn load(store: Arc<dyn PreferenceStore>) -> Result<(Self, Settings), StoreError> {
        let prefs = store.load()?;
        tracing::debug!("loaded {} known device(s)", prefs.devices.len());
        Ok((Self::new(prefs.devices, store), prefs.settings.sanitized()))
    }

    pub fn list(&self) -> &[Device] {
        &self.devices
    }

    pub fn get(&self, id: &DeviceId) -> Option<&Device> {
        self.devices.iter().find(|d| &d.id() == id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn add(&mut self, device: Device) -> Result<(), RegistryError> {
        let id = device.id();
        if self.get(&id).is_some() {
            return Err(RegistryError::AlreadyExists(id));
        }
        self.devices.push(device);
        self.persist()?;
        tracing::info!("added device {id}");
        Ok(())
    }

    pub fn remove(&mut self, id: &DeviceId) -> Result<Device, RegistryError> {
        let index = self.index_of(id)?;
        let removed = self.devices.remove(index);
        self.persist()?;
        tracing::info!("removed device {id}");
        Ok(removed)
    }

    /// Replaces the device stored under `id`.
    ///
    /// The replacement may change address or port (and therefore its id), as
    /// long as the new id does not collide with another entry.
    pub fn update(&mut self, id: &DeviceId, replacement: Device) -> Result<(), RegistryError> {
        let index = self.index_of(id)?;
        let new_id = replacement.id();
        if &new_id != id && self.get(&new_id).is_some() {
            return Err(RegistryError::AlreadyExists(new_id));
        }
        self.devices[index] = replacement;
        self.persist()
    }

    pub fn set_credential(&mut self, id: &DeviceId, credential: &str) -> Result<(), RegistryError> {
        let index = self.index_of(id)?;
        self.devices[index].set_credential(credential);
        self.persist()
    }

    /// Folds discovery results into the registry and persists the result.
    ///
    /// Known endpoints keep their name and credential and are marked
    /// reachable.  New endpoints are appended with an empty credential.
    /// Duplicates within `found` are collapsed, first occurrence wins.
    pub fn merge_discovered(&mut self, found: Vec<Device>) -> Result<MergeSummary, RegistryError> {
        let mut summary = MergeSummary::default();
        let mut seen = HashSet::new();
        for mut candidate in found {
            let id = candidate.id();
            if !seen.insert(id.clone()) {
                continue;
            }
            match self.devices.iter_mut().find(|d| d.id() == id) {
                Some(existing) => {
                    existing.set_reachable(true);
                    summary.refreshed += 1;
                }
                None => {
                    candidate.set_credential("");
                    candidate.set_reachable(true);
                    self.devices.push(candidate);
                    summary.added += 1;
                }
            }
        }
        self.persist()?;
        Ok(summary)
    }

    /// Records probe results for known devices.  Unknown ids are ignored.
    pub fn apply_reachability(&mut self, results: &[(DeviceId, bool)]) -> Result<(), RegistryError> {
        for (id, reachable) in results {
            if let Some(device) = self.devices.iter_mut().find(|d| &d.id() == id) {
                device.set_reachable(*reachable);
            }
        }
        self.persist()
    }

    fn index_of(&self, id: &DeviceId) -> Result<usize, RegistryError> {
        self.devices
            .iter()
            .position(|d| &d.id() == id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    fn persist(&self) -> Result<(), RegistryError> {
        self.store.save_devices(&self.devices)?;
        Ok(())
    }
}
