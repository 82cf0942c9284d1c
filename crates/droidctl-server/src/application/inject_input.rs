//! InputInjector: synthesizes touch and key events and hands them to the
//! resolved entry point.
//!
//! Touch events are tagged with their target display when the bound entry
//! point supports it.  When it does not, the event still goes out (to the
//! default display) and the outcome carries `display_targeted = false` so
//! the caller can tell.

use std::sync::Arc;

use droidctl_core::{
    CapabilityFlags, DisplayId, EventTime, InjectOutcome, KeyCode, KeyEvent, MotionAction,
    SyntheticEvent, TouchEvent,
};
use thiserror::Error;
use tracing::{debug, warn};

use super::resolve_capability::{CapabilityResolver, InvokeError, ResolutionError};

/// Error type for injection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InjectError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Invocation(#[from] InvokeError),
}

/// Builds synthetic events and injects them.
pub struct InputInjector {
    resolver: Arc<CapabilityResolver>,
}

impl InputInjector {
    pub fn new(resolver: Arc<CapabilityResolver>) -> Self {
        Self { resolver }
    }

    /// Injects one touch event at `(x, y)` on `target`.
    ///
    /// Coordinates are passed through unchanged; they are in the target
    /// display's pixel space.
    ///
    /// # Errors
    ///
    /// Returns [`InjectError`] if resolution fails or the entry point call
    /// itself fails.  A `false` result from the OS is not an error; it is
    /// reported through [`InjectOutcome::delivered`].
    pub fn inject_touch(
        &self,
        target: DisplayId,
        action: MotionAction,
        x: f32,
        y: f32,
    ) -> Result<InjectOutcome, InjectError> {
        let bound = self.resolver.resolve()?;

        let mut touch = TouchEvent::at_now(action, x, y);
        let display_targeted = if bound.supports_display_tagging() {
            touch.set_display(target);
            true
        } else {
            warn!(
                display = %target,
                "partial capability: display tagging unavailable, touch goes to the default display"
            );
            false
        };

        let delivered = bound.invoke(&SyntheticEvent::Touch(touch))?;
        debug!(display = %target, %action, x, y, delivered, display_targeted, "touch injected");

        Ok(InjectOutcome {
            delivered,
            flags: CapabilityFlags { display_targeted },
        })
    }

    /// Injects a key press: a down event then an up event sharing one
    /// timestamp.
    ///
    /// The up event is sent even when the down event was rejected.  The
    /// result is `true` only if both were delivered.
    ///
    /// # Errors
    ///
    /// Returns [`InjectError`] if resolution fails or either call fails.
    pub fn inject_key(&self, code: KeyCode) -> Result<bool, InjectError> {
        let bound = self.resolver.resolve()?;

        let (down, up) = KeyEvent::press_at(code, EventTime::now());
        let down_delivered = bound.invoke(&SyntheticEvent::Key(down))?;
        let up_delivered = bound.invoke(&SyntheticEvent::Key(up))?;

        if down_delivered && !up_delivered {
            // No compensating up event is attempted; the key may read as held.
            warn!(%code, "key down delivered but key up rejected");
        }
        debug!(%code, down_delivered, up_delivered, "key injected");

        Ok(down_delivered && up_delivered)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
