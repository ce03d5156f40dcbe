//! TuneSettings use case: live preview while a control moves, persist on release.
//!
//! A running session subscribes to [`SettingsController::subscribe`] and
//! picks up every previewed value on its next tick.  Only
//! [`SettingsController::commit`] touches storage, and only for the one key
//! that changed.

use std::sync::Arc;

use remotepad_core::{SettingKey, Settings, SettingsError};
use thiserror::Error;
use tokio::sync::watch;

use crate::application::manage_devices::{PreferenceStore, StoreError};

#[derive(Debug, Error)]
pub enum TuneError {
    #[error(transparent)]
    Invalid(#[from] SettingsError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct SettingsController {
    live: watch::Sender<Settings>,
    store: Arc<dyn PreferenceStore>,
}

impl SettingsController {
    pub fn new(initial: Settings, store: Arc<dyn PreferenceStore>) -> Self {
        let (live, _) = watch::channel(initial);
        Self { live, store }
    }

    pub fn current(&self) -> Settings {
        *self.live.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.live.subscribe()
    }

    /// Applies `value` to subscribers without persisting it.
    pub fn preview(&self, key: SettingKey, value: f64) -> Result<(), SettingsError> {
        let mut next = self.current();
        next.set(key, value)?;
        self.live.send_replace(next);
        Ok(())
    }

    /// Applies and persists `value`.
    pub fn commit(&self, key: SettingKey, value: f64) -> Result<(), TuneError> {
        self.preview(key, value)?;
        self.store.save_setting(key, value)?;
        tracing::debug!("saved setting {key} = {value}");
        Ok(())
    }
}
