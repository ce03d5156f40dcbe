//! Key names understood by the host agent in `tap`, `key_down` and `key_up`.
//!
//! The agent accepts any name its input backend knows; these are the ones the
//! client itself emits.

pub const ALT: &str = "alt";
pub const TAB: &str = "tab";
pub const SHIFT: &str = "shift";
pub const COMMAND: &str = "command";
pub const SPACE: &str = "space";
pub const ENTER: &str = "enter";
pub const BACKSPACE: &str = "backspace";
