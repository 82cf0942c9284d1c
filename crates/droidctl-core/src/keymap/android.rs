//! Name table for the `KEYCODE_*` constants droidctl callers use.
//!
//! Only keys that make sense to inject from an automation process are
//! listed; anything else can still be sent by number.

use super::KeyCode;

/// `(short name, code)` pairs.  Names are upper case without the
/// `KEYCODE_` prefix.
pub const KEY_NAMES: &[(&str, KeyCode)] = &[
    ("HOME", KeyCode::HOME),
    ("BACK", KeyCode::BACK),
    ("CALL", KeyCode(5)),
    ("ENDCALL", KeyCode(6)),
    ("DPAD_UP", KeyCode::DPAD_UP),
    ("DPAD_DOWN", KeyCode::DPAD_DOWN),
    ("DPAD_LEFT", KeyCode::DPAD_LEFT),
    ("DPAD_RIGHT", KeyCode::DPAD_RIGHT),
    ("DPAD_CENTER", KeyCode::DPAD_CENTER),
    ("VOLUME_UP", KeyCode::VOLUME_UP),
    ("VOLUME_DOWN", KeyCode::VOLUME_DOWN),
    ("POWER", KeyCode::POWER),
    ("CAMERA", KeyCode(27)),
    ("TAB", KeyCode::TAB),
    ("SPACE", KeyCode::SPACE),
    ("ENTER", KeyCode::ENTER),
    ("DEL", KeyCode::DEL),
    ("MENU", KeyCode::MENU),
    ("NOTIFICATION", KeyCode(83)),
    ("SEARCH", KeyCode::SEARCH),
    ("MEDIA_PLAY_PAUSE", KeyCode(85)),
    ("MEDIA_STOP", KeyCode(86)),
    ("MEDIA_NEXT", KeyCode(87)),
    ("MEDIA_PREVIOUS", KeyCode(88)),
    ("PAGE_UP", KeyCode(92)),
    ("PAGE_DOWN", KeyCode(93)),
    ("ESCAPE", KeyCode::ESCAPE),
    ("FORWARD_DEL", KeyCode(112)),
    ("MOVE_HOME", KeyCode(122)),
    ("MOVE_END", KeyCode(123)),
    ("VOLUME_MUTE", KeyCode(164)),
    ("APP_SWITCH", KeyCode::APP_SWITCH),
    ("SLEEP", KeyCode::SLEEP),
    ("WAKEUP", KeyCode::WAKEUP),
];

/// Looks up a short upper-case name.
pub fn code_for_name(name: &str) -> Option<KeyCode> {
    KEY_NAMES
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, code)| *code)
}

/// Reverse lookup; returns the first name registered for `code`.
pub fn name_for_code(code: KeyCode) -> Option<&'static str> {
    KEY_NAMES
        .iter()
        .find(|(_, candidate)| *candidate == code)
        .map(|(name, _)| *name)
}
