//! ConnectDevice use case: the credential gate in front of the session.
//!
//! The connection manager trusts whatever credential it is handed.  This
//! module is where a missing password is caught: connecting to a device with
//! no stored credential and none supplied fails with
//! [`ConnectError::AuthRequired`], and the caller is expected to prompt for
//! one and retry.  A supplied credential is saved before the session opens so
//! the next connect goes through without prompting.
//!
//! It also tracks the app lifecycle so a return to the foreground can revive
//! a dropped session.

use async_trait::async_trait;
use remotepad_core::{Device, DeviceId};
use thiserror::Error;

use crate::application::manage_devices::{DeviceRegistry, RegistryError};

#[derive(Debug, Error)]
pub enum ConnectError {
    /// The device has no stored credential and none was supplied.
    #[error("device {0} requires a password")]
    AuthRequired(DeviceId),
    #[error("device {0} is not registered")]
    UnknownDevice(DeviceId),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("connection failed: {0}")]
    Transport(String),
}

/// The parts of the session layer this use case drives.
#[async_trait]
pub trait SessionControl: Send + Sync {
    /// Opens a session to `device`, replacing any live one.
    async fn open_session(&self, device: Device, credential: Option<String>) -> Result<(), String>;

    /// Reopens the last session if nothing is live.  Returns whether a
    /// connection attempt was made.
    async fn resume_session(&self) -> Result<bool, String>;
}

/// Connects to a registered device, enforcing the credential policy.
///
/// # Errors
///
/// - [`ConnectError::UnknownDevice`] if `id` is not registered.
/// - [`ConnectError::AuthRequired`] if no credential is stored or supplied.
/// - [`ConnectError::Registry`] if the supplied credential cannot be saved.
/// - [`ConnectError::Transport`] if the session could not be opened.
pub async fn connect_known_device(
    registry: &mut DeviceRegistry,
    session: &dyn SessionControl,
    id: &DeviceId,
    credential: Option<String>,
) -> Result<(), ConnectError> {
    if registry.get(id).is_none() {
        return Err(ConnectError::UnknownDevice(id.clone()));
    }

    if let Some(supplied) = credential.filter(|c| !c.is_empty()) {
        registry.set_credential(id, &supplied)?;
    }

    let device = registry
        .get(id)
        .cloned()
        .ok_or_else(|| ConnectError::UnknownDevice(id.clone()))?;
    if !device.has_credential() {
        return Err(ConnectError::AuthRequired(id.clone()));
    }

    tracing::info!("connecting to {} ({})", device.name(), device.id());
    let token = device.credential().to_string();
    session
        .open_session(device, Some(token))
        .await
        .map_err(ConnectError::Transport)
}

/// Foreground state of the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppLifecycle {
    Active,
    Inactive,
    Background,
}

/// Remembers the last lifecycle state and spots returns to the foreground.
#[derive(Debug)]
pub struct LifecycleTracker {
    current: AppLifecycle,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self {
            current: AppLifecycle::Active,
        }
    }

    pub fn current(&self) -> AppLifecycle {
        self.current
    }

    /// Records `next` and returns `true` if it is a return to the foreground.
    pub fn observe(&mut self, next: AppLifecycle) -> bool {
        let previous = std::mem::replace(&mut self.current, next);
        previous != AppLifecycle::Active && next == AppLifecycle::Active
    }
}

impl Default for LifecycleTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Feeds a lifecycle change through `tracker` and resumes the session on a
/// return to the foreground.  Returns whether a reconnect was attempted.
pub async fn handle_lifecycle(
    tracker: &mut LifecycleTracker,
    next: AppLifecycle,
    session: &dyn SessionControl,
) -> Result<bool, ConnectError> {
    if !tracker.observe(next) {
        return Ok(false);
    }
    tracing::debug!("app returned to foreground");
    session.resume_session().await.map_err(ConnectError::Transport)
}
