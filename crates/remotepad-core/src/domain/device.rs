//! Known host entity.
//!
//! A [`Device`] is identified by its endpoint.  The id is computed from
//! `address:port` every time it is asked for, so two records describing the
//! same endpoint always collide, whichever way they were created.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::protocol::{DEFAULT_HOST_PORT, HEALTH_PATH, WS_PATH};

/// Stable identity of a host, of the form `address:port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(address: &str, port: u16) -> Self {
        Self(format!("{address}:{port}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A host the client can connect to.
///
/// `credential` is the shared password the host agent checks on every frame.
/// It is empty for hosts that have not been unlocked yet.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    name: String,
    address: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    credential: String,
    #[serde(default)]
    reachable: bool,
}

fn default_port() -> u16 {
    DEFAULT_HOST_PORT
}

impl Device {
    /// Creates a device with no credential, not yet known to be reachable.
    pub fn new(name: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            port,
            credential: String::new(),
            reachable: false,
        }
    }

    /// Builder-style credential, mostly useful when restoring or in tests.
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = credential.into();
        self
    }

    pub fn id(&self) -> DeviceId {
        DeviceId::new(&self.address, self.port)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn has_credential(&self) -> bool {
        !self.credential.is_empty()
    }

    pub fn reachable(&self) -> bool {
        self.reachable
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_credential(&mut self, credential: impl Into<String>) {
        self.credential = credential.into();
    }

    pub fn set_reachable(&mut self, reachable: bool) {
        self.reachable = reachable;
    }

    /// WebSocket endpoint of the host agent, e.g. `ws://10.0.0.5:1212/ws`.
    pub fn ws_url(&self) -> String {
        format!("ws://{}{}", authority(&self.address, self.port), WS_PATH)
    }

    /// Health endpoint of the host agent, e.g. `http://10.0.0.5:1212/health`.
    pub fn health_url(&self) -> String {
        health_url(&self.address, self.port)
    }
}

/// Health endpoint for an arbitrary endpoint, used before a [`Device`] exists.
pub fn health_url(address: &str, port: u16) -> String {
    format!("http://{}{}", authority(address, port), HEALTH_PATH)
}

// IPv6 literals need brackets inside a URL authority.
fn authority(address: &str, port: u16) -> String {
    if address.contains(':') && !address.starts_with('[') {
        format!("[{address}]:{port}")
    } else {
        format!("{address}:{port}")
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("port", &self.port)
            .field(
                "credential",
                &if self.credential.is_empty() { "" } else { "<redacted>" },
            )
            .field("reachable", &self.reachable)
            .finish()
    }
}
