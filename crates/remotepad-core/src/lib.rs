//! # remotepad-core
//!
//! Shared library for RemotePad containing the JSON wire protocol spoken with
//! the host agent, and the domain entities (known hosts and tuning settings)
//! that the client persists.
//!
//! It has no dependencies on sockets, timers, or the file system; everything
//! here is plain data plus pure functions, so it can be tested in isolation.
//!
//! # Architecture overview (for beginners)
//!
//! RemotePad turns a handheld device into a trackpad and keyboard for a
//! computer on the same network (the "host").  The host runs a small agent
//! that listens on a WebSocket and replays whatever it receives as real input.
//!
//! This crate defines:
//!
//! - **`protocol`** – What travels over the WebSocket.  Every outbound frame is
//!   one JSON object such as `{"type":"move","x":3.0,"y":-1.5,"token":"…"}`.
//!   The host may push `{"type":"clipboard","value":"…"}` back.
//!
//! - **`domain`** – The [`Device`] record for a known host (its id is derived
//!   from `address:port`) and the four user-tunable [`Settings`] that shape how
//!   finger motion becomes cursor motion.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `remotepad_core::Command` instead of `remotepad_core::protocol::messages::Command`.
pub use domain::device::{Device, DeviceId};
pub use domain::settings::{SettingKey, Settings, SettingsError};
pub use protocol::codec::{decode_inbound, encode_command, ProtocolError};
pub use protocol::messages::{Command, HostMessage, MediaAction, MouseButton, SystemAction};
