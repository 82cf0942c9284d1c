//! # droidctl-core
//!
//! Shared types for droidctl: synthetic input events, virtual display
//! descriptions, the input-injection capability variants, and Android key
//! code names.
//!
//! This crate is used by the server crate and by anything that wants to
//! describe an injection or a display without talking to a device.  It has
//! zero dependencies on OS APIs, subprocesses, or global state.
//!
//! # Architecture overview (for beginners)
//!
//! droidctl runs as a privileged process on an Android device and offers a
//! handful of primitives: inject a touch or key event on a display, capture a
//! display to a PNG file, create and destroy off-screen "virtual displays", and
//! launch an app onto one of them.
//!
//! This crate (`droidctl-core`) is the vocabulary those primitives share:
//!
//! - **`domain`** – What an input event and a virtual display look like.
//!   A [`SyntheticEvent`] lives for exactly one injection call; a
//!   [`DisplaySpec`] describes a display to create and a [`DisplayId`] names a
//!   live one.
//!
//! - **`capability`** – The two injection entry-point signatures that exist
//!   across OS releases ([`InjectSignature`]) and the version-gated order in
//!   which they are probed.
//!
//! - **`keymap`** – Android `KEYCODE_*` values and their names, so callers can
//!   write `back` instead of `4`.

pub mod capability;
pub mod domain;
pub mod keymap;

pub use capability::{
    CapabilityFlags, InjectMode, InjectOutcome, InjectSignature, SdkLevel,
    TARGET_UID_UNRESTRICTED,
};
pub use domain::display::{DisplayId, DisplaySpec, DisplaySpecError, DisplayToken};
pub use domain::event::{
    EventTime, InputSource, KeyAction, KeyEvent, MotionAction, SyntheticEvent, TouchEvent,
    UnknownActionCode,
};
pub use keymap::KeyCode;
