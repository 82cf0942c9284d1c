//! Mock display server that hands out in-memory surfaces.
//!
//! Tokens are `mock-surface-<n>`.  Set `fail_create` / `fail_destroy` to
//! drive error paths in the display manager, and `os_id_base` to report OS
//! display ids that differ from the registry's.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use droidctl_core::{DisplayId, DisplaySpec, DisplayToken};

use crate::application::manage_displays::{DisplayServer, DisplayServerError};
use crate::infrastructure::lock;

/// In-memory display server.
#[derive(Default)]
pub struct MockDisplayServer {
    /// When `true`, `create_display` fails.
    pub fail_create: bool,
    /// When `true`, `destroy_display` fails (after counting the call).
    pub fail_destroy: bool,
    /// When set, surface `n` reports OS display id `os_id_base + n`.
    pub os_id_base: Option<i32>,
    next: AtomicU64,
    live: Mutex<HashMap<DisplayToken, u64>>,
    created: Mutex<Vec<(DisplaySpec, bool)>>,
    destroyed: Mutex<Vec<DisplayToken>>,
}

impl MockDisplayServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports OS display id `base + n` for surface `n`.
    pub fn with_os_ids(mut self, base: i32) -> Self {
        self.os_id_base = Some(base);
        self
    }

    /// `(spec, secure)` for every successful create, in order.
    pub fn created(&self) -> Vec<(DisplaySpec, bool)> {
        lock(&self.created).clone()
    }

    /// Number of destroy calls, successful or not.
    pub fn destroy_calls(&self) -> usize {
        lock(&self.destroyed).len()
    }

    /// Surfaces created and not yet destroyed.
    pub fn live_count(&self) -> usize {
        lock(&self.live).len()
    }
}

impl DisplayServer for MockDisplayServer {
    fn create_display(
        &self,
        spec: &DisplaySpec,
        secure: bool,
    ) -> Result<DisplayToken, DisplayServerError> {
        if self.fail_create {
            return Err(DisplayServerError::Rejected("mock create failure".to_string()));
        }
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        let token = DisplayToken::new(format!("mock-surface-{n}"));
        lock(&self.live).insert(token.clone(), n);
        lock(&self.created).push((spec.clone(), secure));
        Ok(token)
    }

    fn destroy_display(&self, token: &DisplayToken) -> Result<(), DisplayServerError> {
        lock(&self.destroyed).push(token.clone());
        if self.fail_destroy {
            return Err(DisplayServerError::Rejected("mock destroy failure".to_string()));
        }
        if lock(&self.live).remove(token).is_none() {
            return Err(DisplayServerError::UnknownToken(token.as_str().to_string()));
        }
        Ok(())
    }

    fn os_display_id(&self, token: &DisplayToken) -> Result<Option<DisplayId>, DisplayServerError> {
        let Some(base) = self.os_id_base else {
            return Ok(None);
        };
        let n = lock(&self.live)
            .get(token)
            .copied()
            .ok_or_else(|| DisplayServerError::UnknownToken(token.as_str().to_string()))?;
        let offset = i32::try_from(n)
            .map_err(|_| DisplayServerError::Rejected(format!("surface {n} out of range")))?;
        Ok(Some(DisplayId(base.saturating_add(offset))))
    }
}
