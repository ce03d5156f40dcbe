//! In-memory [`PreferenceStore`] for tests.
//!
//! Records every write so tests can assert on what was persisted, and can be
//! built in a failing mode to exercise error paths.

use std::sync::Mutex;

use remotepad_core::{Device, SettingKey, Settings};

use crate::application::manage_devices::{PreferenceStore, Preferences, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_writes: bool,
}

#[derive(Default)]
struct MemoryState {
    prefs: Preferences,
    device_writes: usize,
    setting_writes: usize,
}

impl MemoryStore {
    pub fn with_preferences(prefs: Preferences) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                prefs,
                ..MemoryState::default()
            }),
            fail_writes: false,
        }
    }

    /// A store whose every write fails.
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn devices(&self) -> Vec<Device> {
        self.lock().prefs.devices.clone()
    }

    pub fn settings(&self) -> Settings {
        self.lock().prefs.settings
    }

    pub fn device_writes(&self) -> usize {
        self.lock().device_writes
    }

    pub fn setting_writes(&self) -> usize {
        self.lock().setting_writes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> Result<T, StoreError> {
        Ok(f(&mut self.lock()))
    }
}

impl PreferenceStore for MemoryStore {
    fn load(&self) -> Result<Preferences, StoreError> {
        self.with_state(|s| s.prefs.clone())
    }

    fn save_devices(&self, devices: &[Device]) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Save("writes disabled".to_string()));
        }
        self.with_state(|s| {
            s.prefs.devices = devices.to_vec();
            s.device_writes += 1;
        })
    }

    fn save_setting(&self, key: SettingKey, value: f64) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Save("writes disabled".to_string()));
        }
        let mut state = self.lock();
        state
            .prefs
            .settings
            .set(key, value)
            .map_err(|e| StoreError::Save(e.to_string()))?;
        state.setting_writes += 1;
        Ok(())
    }
}
