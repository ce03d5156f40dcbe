//! Keyboard helpers: text entry, special keys and key chords.
//!
//! The on-screen keyboard writes into a hidden text field.  Each time the
//! field changes, [`TypedText::update`] works out what was appended and sends
//! only that.  Long runs are cleared so the field never grows unbounded.

use remotepad_core::protocol::keys;
use remotepad_core::Command;

/// Field length (in characters) after which the caller should clear it.
pub const CLEAR_AFTER_CHARS: usize = 30;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextUpdate {
    pub commands: Vec<Command>,
    /// The caller should empty the text field.
    pub clear_field: bool,
}

/// Tracks what has already been sent from the text field.
#[derive(Debug, Default)]
pub struct TypedText {
    previous: String,
}

impl TypedText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, text: &str) -> TextUpdate {
        let prev_len = self.previous.chars().count();
        let len = text.chars().count();

        let mut update = TextUpdate::default();
        if len > prev_len {
            let appended: String = text.chars().skip(prev_len).collect();
            update.commands.push(Command::TypeString { value: appended });
        }

        if len > CLEAR_AFTER_CHARS {
            update.clear_field = true;
            self.previous.clear();
        } else {
            self.previous = text.to_string();
        }
        update
    }
}

/// Keys the text field reports separately from its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialKey {
    Backspace,
    Enter,
}

pub fn special_key(key: SpecialKey) -> Command {
    match key {
        SpecialKey::Backspace => Command::tap(keys::BACKSPACE),
        SpecialKey::Enter => Command::tap(keys::ENTER),
    }
}

/// Holds `modifier` while tapping `key`.
pub fn chord(modifier: &str, key: &str) -> Vec<Command> {
    vec![
        Command::key_down(modifier),
        Command::tap(key),
        Command::key_up(modifier),
    ]
}

/// Switches the host's input language (`command+space`).
pub fn switch_language() -> Vec<Command> {
    chord(keys::COMMAND, keys::SPACE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(update: &TextUpdate) -> Option<&str> {
        match update.commands.first() {
            Some(Command::TypeString { value }) => Some(value),
            _ => None,
        }
    }

    #[test]
    fn test_sends_only_appended_characters() {
        // Arrange
        let mut t = TypedText::new();

        // Act
        let a = t.update("he");
        let b = t.update("hello");

        // Assert
        assert_eq!(typed(&a), Some("he"));
        assert_eq!(typed(&b), Some("llo"));
    }

    #[test]
    fn test_deletion_sends_nothing() {
        let mut t = TypedText::new();
        t.update("abc");
        assert!(t.update("ab").commands.is_empty());
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let mut t = TypedText::new();
        t.update("héllo");
        assert_eq!(typed(&t.update("héllo wörld")), Some(" wörld"));
    }

    #[test]
    fn test_long_text_requests_clear_and_restarts() {
        // Arrange
        let mut t = TypedText::new();
        let long = "a".repeat(31);

        // Act
        let update = t.update(&long);
        let after = t.update("b");

        // Assert
        assert!(update.clear_field);
        assert_eq!(typed(&after), Some("b"));
    }

    #[test]
    fn test_special_keys_tap() {
        assert_eq!(special_key(SpecialKey::Backspace), Command::tap("backspace"));
        assert_eq!(special_key(SpecialKey::Enter), Command::tap("enter"));
    }

    #[test]
    fn test_language_switch_chord() {
        assert_eq!(
            switch_language(),
            vec![
                Command::key_down("command"),
                Command::tap("space"),
                Command::key_up("command")
            ]
        );
    }
}
