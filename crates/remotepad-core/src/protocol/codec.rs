//! JSON codec for the RemotePad wire protocol.
//!
//! Outbound frames are a [`Command`] with the session token appended:
//!
//! ```text
//! {"type":"click","button":"left","token":"x"}
//! ```
//!
//! The token is always present, even when the device has no credential (it is
//! then the empty string), so the host agent can apply one rule to every frame.

use serde::Serialize;
use thiserror::Error;

use crate::protocol::messages::{Command, HostMessage};

/// Errors that can occur while encoding or decoding protocol frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Serialization failed.  Only reachable with non-finite floats.
    #[error("failed to encode '{kind}' command: {source}")]
    Encode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The inbound text is not valid JSON or names an unknown message type.
    #[error("malformed inbound message: {0}")]
    Decode(#[source] serde_json::Error),

    /// The host sent a binary frame; the protocol is text only.
    #[error("unexpected binary frame ({0} bytes)")]
    UnexpectedBinary(usize),
}

#[derive(Serialize)]
struct Envelope<'a> {
    #[serde(flatten)]
    command: &'a Command,
    token: &'a str,
}

/// Encodes `command` into one text frame, stamping it with `token`.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if a coordinate is NaN or infinite.
///
/// # Examples
///
/// ```rust
/// use remotepad_core::protocol::{encode_command, Command, MouseButton};
///
/// let frame = encode_command(&Command::Click { button: MouseButton::Left }, "x").unwrap();
/// assert_eq!(frame, r#"{"type":"click","button":"left","token":"x"}"#);
/// ```
pub fn encode_command(command: &Command, token: &str) -> Result<String, ProtocolError> {
    if let Command::Move { x, y } | Command::Scroll { x, y } = command {
        if !x.is_finite() || !y.is_finite() {
            return Err(ProtocolError::Encode {
                kind: command.kind(),
                source: <serde_json::Error as serde::ser::Error>::custom(
                    "coordinates must be finite",
                ),
            });
        }
    }
    serde_json::to_string(&Envelope { command, token }).map_err(|source| ProtocolError::Encode {
        kind: command.kind(),
        source,
    })
}

/// Decodes one inbound text frame from the host agent.
///
/// # Errors
///
/// Returns [`ProtocolError::Decode`] for invalid JSON, a missing `"type"`, an
/// unknown type, or missing fields.  Callers log and drop such frames.
pub fn decode_inbound(text: &str) -> Result<HostMessage, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Decode)
}
