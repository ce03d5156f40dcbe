//! RemotePad wire protocol.
//!
//! The client keeps one WebSocket open to the host agent at
//! `ws://<address>:<port>/ws` and exchanges UTF-8 text frames, each carrying
//! exactly one JSON object:
//!
//! ```text
//! client -> host   { "type": <command>, ...fields, "token": <credential> }
//! host -> client   { "type": "clipboard", "value": <text> }
//! ```
//!
//! Reachability is checked out of band with `GET http://<address>:<port>/health`;
//! any 2xx answer means the agent is up.

pub mod codec;
pub mod keys;
pub mod messages;

pub use codec::{decode_inbound, encode_command, ProtocolError};
pub use messages::{Command, HostMessage, MediaAction, MouseButton, SystemAction};

/// TCP port the host agent listens on unless configured otherwise.
pub const DEFAULT_HOST_PORT: u16 = 1212;

/// DNS-SD service type the host agent advertises.
pub const SERVICE_TYPE: &str = "_remotepad._tcp.local.";

/// Path of the WebSocket endpoint on the host agent.
pub const WS_PATH: &str = "/ws";

/// Path of the HTTP health endpoint on the host agent.
pub const HEALTH_PATH: &str = "/health";
