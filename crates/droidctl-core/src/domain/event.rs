//! Synthetic input events.
//!
//! A [`SyntheticEvent`] describes one touch or key event that droidctl is
//! about to inject.  It is built for a single injection call and then dropped;
//! nothing keeps events around between calls.
//!
//! # Timestamps
//!
//! Android input events carry two times: `down_time` (when the gesture
//! started) and `event_time` (when this particular event happened).  droidctl
//! never replays recorded input, so both are stamped with the moment of
//! injection via [`EventTime::now`].

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::display::DisplayId;
use crate::keymap::KeyCode;

/// Returned when an integer does not correspond to a supported [`MotionAction`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown motion action: {0}")]
pub struct UnknownActionCode(pub String);

// ── Actions ───────────────────────────────────────────────────────────────────

/// Touch gesture phase.  Discriminants match `MotionEvent.ACTION_*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionAction {
    Down,
    Up,
    Move,
    Cancel,
}

impl MotionAction {
    /// Returns the `MotionEvent.ACTION_*` integer for this action.
    pub fn code(self) -> i32 {
        match self {
            MotionAction::Down => 0,
            MotionAction::Up => 1,
            MotionAction::Move => 2,
            MotionAction::Cancel => 3,
        }
    }

    /// Maps a raw `MotionEvent.ACTION_*` integer back to a [`MotionAction`].
    ///
    /// # Errors
    ///
    /// Returns [`UnknownActionCode`] for pointer-index encoded or other
    /// multi-touch actions, which droidctl does not synthesize.
    pub fn from_code(code: i32) -> Result<Self, UnknownActionCode> {
        match code {
            0 => Ok(MotionAction::Down),
            1 => Ok(MotionAction::Up),
            2 => Ok(MotionAction::Move),
            3 => Ok(MotionAction::Cancel),
            other => Err(UnknownActionCode(other.to_string())),
        }
    }

    /// The upper-case name used by the `input motionevent` command.
    pub fn as_str(self) -> &'static str {
        match self {
            MotionAction::Down => "DOWN",
            MotionAction::Up => "UP",
            MotionAction::Move => "MOVE",
            MotionAction::Cancel => "CANCEL",
        }
    }
}

impl fmt::Display for MotionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MotionAction {
    type Err = UnknownActionCode;

    /// Accepts `down`/`DOWN`/`0` style spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = s.parse::<i32>() {
            return MotionAction::from_code(code);
        }
        match s.to_ascii_lowercase().as_str() {
            "down" => Ok(MotionAction::Down),
            "up" => Ok(MotionAction::Up),
            "move" => Ok(MotionAction::Move),
            "cancel" => Ok(MotionAction::Cancel),
            _ => Err(UnknownActionCode(s.to_string())),
        }
    }
}

/// Key phase.  Discriminants match `KeyEvent.ACTION_*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAction {
    Down,
    Up,
}

impl KeyAction {
    pub fn code(self) -> i32 {
        match self {
            KeyAction::Down => 0,
            KeyAction::Up => 1,
        }
    }
}

/// Input device class the event claims to come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputSource {
    Touchscreen,
    Keyboard,
}

impl InputSource {
    /// The `InputDevice.SOURCE_*` bit pattern.
    pub fn code(self) -> u32 {
        match self {
            InputSource::Touchscreen => 0x0000_1002,
            InputSource::Keyboard => 0x0000_0101,
        }
    }
}

// ── Time ──────────────────────────────────────────────────────────────────────

/// Monotonic event timestamp in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventTime(pub u64);

impl EventTime {
    /// Milliseconds elapsed on a monotonic clock anchored at first use in
    /// this process.
    pub fn now() -> Self {
        static ANCHOR: OnceLock<Instant> = OnceLock::new();
        let anchor = ANCHOR.get_or_init(Instant::now);
        EventTime(anchor.elapsed().as_millis() as u64)
    }

    pub fn as_millis(self) -> u64 {
        self.0
    }
}

// ── Events ────────────────────────────────────────────────────────────────────

/// A single-pointer touch event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchEvent {
    pub action: MotionAction,
    pub x: f32,
    pub y: f32,
    pub down_time: EventTime,
    pub event_time: EventTime,
    pub source: InputSource,
    /// Target display, or `None` when the event was not tagged and the OS
    /// routes it to its default display.
    display: Option<DisplayId>,
}

impl TouchEvent {
    /// Builds an untagged touchscreen event stamped with the current time for
    /// both `down_time` and `event_time`.
    pub fn at_now(action: MotionAction, x: f32, y: f32) -> Self {
        let now = EventTime::now();
        Self {
            action,
            x,
            y,
            down_time: now,
            event_time: now,
            source: InputSource::Touchscreen,
            display: None,
        }
    }

    /// Tags the event with a target display.
    pub fn set_display(&mut self, display: DisplayId) {
        self.display = Some(display);
    }

    pub fn display(&self) -> Option<DisplayId> {
        self.display
    }
}

/// A key event.  droidctl always sends keys as a down/up pair sharing one
/// timestamp, see [`KeyEvent::press_at`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub action: KeyAction,
    pub down_time: EventTime,
    pub event_time: EventTime,
    pub source: InputSource,
}

impl KeyEvent {
    pub fn new(code: KeyCode, action: KeyAction, time: EventTime) -> Self {
        Self {
            code,
            action,
            down_time: time,
            event_time: time,
            source: InputSource::Keyboard,
        }
    }

    /// Returns the `(down, up)` pair for one key press at `time`.
    pub fn press_at(code: KeyCode, time: EventTime) -> (Self, Self) {
        (
            Self::new(code, KeyAction::Down, time),
            Self::new(code, KeyAction::Up, time),
        )
    }
}

/// One event handed to an injection entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SyntheticEvent {
    Touch(TouchEvent),
    Key(KeyEvent),
}

impl SyntheticEvent {
    /// The display the event is tagged with, if any.  Key events are never
    /// tagged; they go to the focused display.
    pub fn display(&self) -> Option<DisplayId> {
        match self {
            SyntheticEvent::Touch(touch) => touch.display(),
            SyntheticEvent::Key(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SyntheticEvent::Touch(_) => "touch",
            SyntheticEvent::Key(_) => "key",
        }
    }

    pub fn source(&self) -> InputSource {
        match self {
            SyntheticEvent::Touch(touch) => touch.source,
            SyntheticEvent::Key(key) => key.source,
        }
    }

    /// The platform action code: a `MotionEvent` action for touches, a
    /// `KeyEvent` action for keys.
    pub fn action_code(&self) -> i32 {
        match self {
            SyntheticEvent::Touch(touch) => touch.action.code(),
            SyntheticEvent::Key(key) => key.action.code(),
        }
    }

    pub fn event_time(&self) -> EventTime {
        match self {
            SyntheticEvent::Touch(touch) => touch.event_time,
            SyntheticEvent::Key(key) => key.event_time,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motion_action_codes_match_android_constants() {
        assert_eq!(MotionAction::Down.code(), 0);
        assert_eq!(MotionAction::Up.code(), 1);
        assert_eq!(MotionAction::Move.code(), 2);
        assert_eq!(MotionAction::Cancel.code(), 3);
    }

    #[test]
    fn test_motion_action_from_code_rejects_pointer_actions() {
        // ACTION_POINTER_DOWN (5) is multi-touch and not supported.
        let result = MotionAction::from_code(5);
        assert_eq!(result, Err(UnknownActionCode("5".to_string())));
    }

    #[test]
    fn test_motion_action_parses_names_and_numbers() {
        assert_eq!("down".parse::<MotionAction>(), Ok(MotionAction::Down));
        assert_eq!("UP".parse::<MotionAction>(), Ok(MotionAction::Up));
        assert_eq!("2".parse::<MotionAction>(), Ok(MotionAction::Move));
        assert!("swipe".parse::<MotionAction>().is_err());
    }

    #[test]
    fn test_touch_event_uses_same_time_for_down_and_event() {
        // Arrange / Act
        let event = TouchEvent::at_now(MotionAction::Down, 10.0, 20.0);

        // Assert
        assert_eq!(event.down_time, event.event_time);
        assert_eq!(event.source, InputSource::Touchscreen);
        assert_eq!(event.display(), None);
    }

    #[test]
    fn test_touch_event_set_display_tags_event() {
        let mut event = TouchEvent::at_now(MotionAction::Up, 1.0, 2.0);
        event.set_display(DisplayId(7));
        assert_eq!(SyntheticEvent::Touch(event).display(), Some(DisplayId(7)));
    }

    #[test]
    fn test_key_press_pair_shares_timestamp() {
        // Arrange
        let time = EventTime(1234);

        // Act
        let (down, up) = KeyEvent::press_at(KeyCode::BACK, time);

        // Assert
        assert_eq!(down.action, KeyAction::Down);
        assert_eq!(up.action, KeyAction::Up);
        assert_eq!(down.event_time, up.event_time);
        assert_eq!(down.down_time, up.down_time);
        assert_eq!(down.code, up.code);
    }

    #[test]
    fn test_event_time_is_monotonic() {
        let first = EventTime::now();
        let second = EventTime::now();
        assert!(second >= first);
    }

    #[test]
    fn test_synthetic_event_exposes_platform_codes() {
        // Arrange
        let touch = SyntheticEvent::Touch(TouchEvent::at_now(MotionAction::Move, 1.0, 1.0));
        let (_, up) = KeyEvent::press_at(KeyCode::BACK, EventTime(42));
        let key = SyntheticEvent::Key(up);

        // Act / Assert
        assert_eq!(touch.action_code(), 2);
        assert_eq!(touch.source().code(), 0x1002);
        assert_eq!(key.action_code(), 1);
        assert_eq!(key.source().code(), 0x0101);
        assert_eq!(key.event_time().as_millis(), 42);
    }
}
