//! JSON message types exchanged with the host agent.
//!
//! # JSON discriminant
//!
//! Every message is a JSON object with a `"type"` field naming the variant in
//! `snake_case`.  All other fields sit in the same object:
//!
//! ```json
//! {"type":"key_down","key":"alt"}
//! {"type":"clipboard_get"}
//! ```
//!
//! The credential (`"token"`) is not part of [`Command`]; it belongs to the
//! session, and [`crate::protocol::codec::encode_command`] adds it when the
//! frame is built.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Client → Host ─────────────────────────────────────────────────────────────

/// Everything the client can ask the host agent to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Relative cursor motion in host pixels.
    Move { x: f64, y: f64 },
    /// Relative wheel motion.  The client only ever fills `y`.
    Scroll { x: f64, y: f64 },
    /// Press and release a mouse button.
    Click { button: MouseButton },
    /// Press and release a named key.
    Tap { key: String },
    /// Press a named key and keep it held.
    KeyDown { key: String },
    /// Release a previously held key.
    KeyUp { key: String },
    /// Type a run of text on the host keyboard.
    TypeString { value: String },
    /// Media key, see [`MediaAction`] for the values the agent understands.
    Media { value: String },
    /// Power and session action, see [`SystemAction`].
    System { value: String },
    /// Ask the host to push its clipboard back as a [`HostMessage::Clipboard`].
    ClipboardGet,
    /// Replace the host clipboard.
    ClipboardSet { value: String },
    /// Open a URL in the host's default browser.
    OpenUrl { value: String },
}

impl Command {
    pub fn tap(key: impl Into<String>) -> Self {
        Self::Tap { key: key.into() }
    }

    pub fn key_down(key: impl Into<String>) -> Self {
        Self::KeyDown { key: key.into() }
    }

    pub fn key_up(key: impl Into<String>) -> Self {
        Self::KeyUp { key: key.into() }
    }

    pub fn media(action: MediaAction) -> Self {
        Self::Media {
            value: action.as_str().to_string(),
        }
    }

    pub fn system(action: SystemAction) -> Self {
        Self::System {
            value: action.as_str().to_string(),
        }
    }

    /// The wire name of this command's `"type"` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Move { .. } => "move",
            Self::Scroll { .. } => "scroll",
            Self::Click { .. } => "click",
            Self::Tap { .. } => "tap",
            Self::KeyDown { .. } => "key_down",
            Self::KeyUp { .. } => "key_up",
            Self::TypeString { .. } => "type_string",
            Self::Media { .. } => "media",
            Self::System { .. } => "system",
            Self::ClipboardGet => "clipboard_get",
            Self::ClipboardSet { .. } => "clipboard_set",
            Self::OpenUrl { .. } => "open_url",
        }
    }
}

/// Mouse buttons the agent can click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
}

// ── Host → Client ─────────────────────────────────────────────────────────────

/// Messages the host agent pushes to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    /// Current contents of the host clipboard.
    Clipboard { value: String },
}

// ── Well-known command values ─────────────────────────────────────────────────

/// Returned when a media or system action name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action '{0}'")]
pub struct UnknownAction(pub String);

/// Media keys understood by the host agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaAction {
    Previous,
    PlayPause,
    Next,
    VolumeDown,
    Mute,
    VolumeUp,
}

impl MediaAction {
    /// Every action, in the order a remote-control panel lists them.
    pub const ALL: [MediaAction; 6] = [
        MediaAction::Previous,
        MediaAction::PlayPause,
        MediaAction::Next,
        MediaAction::VolumeDown,
        MediaAction::Mute,
        MediaAction::VolumeUp,
    ];

    /// Value sent in the command's `"value"` field.
    pub fn as_str(self) -> &'static str {
        match self {
            MediaAction::Previous => "audio_prev",
            MediaAction::PlayPause => "audio_play_pause",
            MediaAction::Next => "audio_next",
            MediaAction::VolumeDown => "audio_vol_down",
            MediaAction::Mute => "audio_mute",
            MediaAction::VolumeUp => "audio_vol_up",
        }
    }
}

impl FromStr for MediaAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MediaAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

impl fmt::Display for MediaAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Power and session actions understood by the host agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemAction {
    Shutdown,
    Restart,
    Lock,
    Sleep,
}

impl SystemAction {
    pub const ALL: [SystemAction; 4] = [
        SystemAction::Shutdown,
        SystemAction::Restart,
        SystemAction::Lock,
        SystemAction::Sleep,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SystemAction::Shutdown => "shutdown",
            SystemAction::Restart => "restart",
            SystemAction::Lock => "lock",
            SystemAction::Sleep => "sleep",
        }
    }
}

impl FromStr for SystemAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SystemAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

impl fmt::Display for SystemAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_down_serializes_with_snake_case_type() {
        // Arrange
        let cmd = Command::key_down("alt");

        // Act
        let json = serde_json::to_string(&cmd).unwrap();

        // Assert
        assert_eq!(json, r#"{"type":"key_down","key":"alt"}"#);
    }

    #[test]
    fn test_clipboard_get_serializes_as_bare_type() {
        let json = serde_json::to_string(&Command::ClipboardGet).unwrap();
        assert_eq!(json, r#"{"type":"clipboard_get"}"#);
    }

    #[test]
    fn test_click_button_is_lowercase() {
        let json = serde_json::to_string(&Command::Click {
            button: MouseButton::Right,
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"click","button":"right"}"#);
    }

    #[test]
    fn test_kind_matches_serialized_type_for_every_variant() {
        // Arrange
        let all = vec![
            Command::Move { x: 1.0, y: 2.0 },
            Command::Scroll { x: 0.0, y: 2.0 },
            Command::Click { button: MouseButton::Left },
            Command::tap("tab"),
            Command::key_down("alt"),
            Command::key_up("alt"),
            Command::TypeString { value: "hi".into() },
            Command::media(MediaAction::Mute),
            Command::system(SystemAction::Lock),
            Command::ClipboardGet,
            Command::ClipboardSet { value: "x".into() },
            Command::OpenUrl { value: "https://a.b".into() },
        ];

        for cmd in all {
            // Act
            let value = serde_json::to_value(&cmd).unwrap();

            // Assert
            assert_eq!(value["type"], cmd.kind(), "variant {cmd:?}");
        }
    }

    #[test]
    fn test_media_action_wire_names() {
        assert_eq!(MediaAction::PlayPause.as_str(), "audio_play_pause");
        assert_eq!(MediaAction::VolumeUp.to_string(), "audio_vol_up");
        assert_eq!(MediaAction::ALL.len(), 6);
    }

    #[test]
    fn test_system_action_parses_from_wire_name() {
        assert_eq!("sleep".parse::<SystemAction>(), Ok(SystemAction::Sleep));
        assert_eq!(
            "hibernate".parse::<SystemAction>(),
            Err(UnknownAction("hibernate".to_string()))
        );
    }

    #[test]
    fn test_every_action_parses_back_from_its_wire_name() {
        for action in MediaAction::ALL {
            assert_eq!(action.as_str().parse::<MediaAction>(), Ok(action));
        }
        for action in SystemAction::ALL {
            assert_eq!(action.as_str().parse::<SystemAction>(), Ok(action));
        }
    }

    #[test]
    fn test_unknown_action_is_a_std_error() {
        // Arrange
        let err: Box<dyn std::error::Error> = Box::new(UnknownAction("hibernate".into()));

        // Act
        let message = err.to_string();

        // Assert
        assert_eq!(message, "unknown action 'hibernate'");
    }

    #[test]
    fn test_host_clipboard_deserializes() {
        // Arrange
        let json = r#"{"type":"clipboard","value":"copied text"}"#;

        // Act
        let msg: HostMessage = serde_json::from_str(json).unwrap();

        // Assert
        assert_eq!(
            msg,
            HostMessage::Clipboard {
                value: "copied text".to_string()
            }
        );
    }
}
