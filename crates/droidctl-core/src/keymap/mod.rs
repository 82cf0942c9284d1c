//! Android key codes.
//!
//! The wire representation is the raw `KeyEvent.KEYCODE_*` integer.  Names are
//! only a convenience for callers; [`KeyCode::parse`] accepts the integer, the
//! full constant name (`KEYCODE_BACK`) or the short name (`back`).

pub mod android;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned by [`KeyCode::parse`] for input that is neither a number nor a
/// known key name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown key code: {0}")]
pub struct UnknownKeyName(pub String);

/// An Android `KEYCODE_*` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCode(pub i32);

impl KeyCode {
    pub const HOME: KeyCode = KeyCode(3);
    pub const BACK: KeyCode = KeyCode(4);
    pub const DPAD_UP: KeyCode = KeyCode(19);
    pub const DPAD_DOWN: KeyCode = KeyCode(20);
    pub const DPAD_LEFT: KeyCode = KeyCode(21);
    pub const DPAD_RIGHT: KeyCode = KeyCode(22);
    pub const DPAD_CENTER: KeyCode = KeyCode(23);
    pub const VOLUME_UP: KeyCode = KeyCode(24);
    pub const VOLUME_DOWN: KeyCode = KeyCode(25);
    pub const POWER: KeyCode = KeyCode(26);
    pub const TAB: KeyCode = KeyCode(61);
    pub const SPACE: KeyCode = KeyCode(62);
    pub const ENTER: KeyCode = KeyCode(66);
    pub const DEL: KeyCode = KeyCode(67);
    pub const MENU: KeyCode = KeyCode(82);
    pub const SEARCH: KeyCode = KeyCode(84);
    pub const ESCAPE: KeyCode = KeyCode(111);
    pub const APP_SWITCH: KeyCode = KeyCode(187);
    pub const SLEEP: KeyCode = KeyCode(223);
    pub const WAKEUP: KeyCode = KeyCode(224);

    /// Parses a key given as a number or a name.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownKeyName`] when `input` is neither a non-negative
    /// integer nor a name in [`android::KEY_NAMES`].
    pub fn parse(input: &str) -> Result<Self, UnknownKeyName> {
        let trimmed = input.trim();
        if let Ok(code) = trimmed.parse::<i32>() {
            if code >= 0 {
                return Ok(KeyCode(code));
            }
            return Err(UnknownKeyName(input.to_string()));
        }
        let upper = trimmed.to_ascii_uppercase();
        let short = upper.strip_prefix("KEYCODE_").unwrap_or(upper.as_str());
        android::code_for_name(short).ok_or_else(|| UnknownKeyName(input.to_string()))
    }

    /// The short name (`BACK`) if this code is in the name table.
    pub fn name(self) -> Option<&'static str> {
        android::name_for_code(self)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for KeyCode {
    type Err = UnknownKeyName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyCode::parse(s)
    }
}
