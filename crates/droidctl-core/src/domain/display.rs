//! Virtual display identifiers, creation parameters and backend tokens.
//!
//! # Identifier vs token (for beginners)
//!
//! A virtual display has two names:
//!
//! - The [`DisplayId`] is what callers see.  It is a small integer that
//!   droidctl hands out from a counter when the display is created.
//! - The [`DisplayToken`] is what the display server handed back when the
//!   surface was created.  Only the display manager holds it, and it is the
//!   only thing that can destroy the surface again.
//!
//! Keeping the two apart means a caller can never forge a token, and a stale
//! identifier simply fails to resolve instead of pointing at a new display.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Externally visible display identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayId(pub i32);

impl DisplayId {
    /// The built-in display.
    pub const DEFAULT: DisplayId = DisplayId(0);

    /// `true` for any display other than the built-in one.  Subprocess tools
    /// only get an explicit display argument when this holds.
    pub fn is_secondary(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DisplayId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(DisplayId)
    }
}

impl From<i32> for DisplayId {
    fn from(value: i32) -> Self {
        DisplayId(value)
    }
}

/// Error type for [`DisplaySpec::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisplaySpecError {
    #[error("display name must not be empty")]
    EmptyName,

    #[error("display {field} must be greater than zero")]
    ZeroDimension { field: &'static str },
}

/// Parameters for creating a virtual display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySpec {
    pub name: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Density in dots per inch.
    pub density: u32,
}

impl DisplaySpec {
    pub fn new(name: impl Into<String>, width: u32, height: u32, density: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            density,
        }
    }

    /// Checks that the spec describes a display the OS can create.
    ///
    /// # Errors
    ///
    /// Returns [`DisplaySpecError`] for an empty name or any zero dimension.
    pub fn validate(&self) -> Result<(), DisplaySpecError> {
        if self.name.trim().is_empty() {
            return Err(DisplaySpecError::EmptyName);
        }
        for (field, value) in [
            ("width", self.width),
            ("height", self.height),
            ("density", self.density),
        ] {
            if value == 0 {
                return Err(DisplaySpecError::ZeroDimension { field });
            }
        }
        Ok(())
    }
}

/// Opaque handle returned by a display server for one created surface.
///
/// The string content is backend-defined; nothing outside the backend that
/// produced it should interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayToken(String);

impl DisplayToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
