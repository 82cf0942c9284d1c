//! Mock input backend for tests and `--dry-run`.
//!
//! `MockInputManager` offers a configurable set of entry points and records
//! every probe and every injected event, tagged with the signature of the
//! entry point that carried it.  No OS calls are made.
//!
//! # Usage in tests
//!
//! ```ignore
//! let manager = Arc::new(MockInputManager::new(&[InjectSignature::Legacy]));
//! let backend = Arc::new(MockInputBackend::new(SdkLevel(34), manager.clone()));
//! let resolver = CapabilityResolver::new(backend, ResolverSettings::default());
//!
//! resolver.resolve().unwrap();
//! assert_eq!(manager.probes(), vec![InjectSignature::WithTargetUid, InjectSignature::Legacy]);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use droidctl_core::{InjectMode, InjectSignature, KeyAction, SdkLevel, SyntheticEvent};

use crate::application::resolve_capability::{
    InputBackend, InputManagerService, InvokeError, ResolutionError,
};
use crate::infrastructure::lock;

/// Recording input manager.
pub struct MockInputManager {
    offered: Vec<InjectSignature>,
    /// Whether events may be tagged with a display.
    pub display_tagging: bool,
    /// When `true`, key-up events are reported as not delivered.
    pub reject_key_up: bool,
    /// When `true`, every injection fails with an [`InvokeError`].
    pub should_fail: bool,
    probes: Mutex<Vec<InjectSignature>>,
    injected: Mutex<Vec<(InjectSignature, SyntheticEvent)>>,
}

impl MockInputManager {
    /// A manager offering `offered`, with display tagging.
    pub fn new(offered: &[InjectSignature]) -> Self {
        Self {
            offered: offered.to_vec(),
            display_tagging: true,
            reject_key_up: false,
            should_fail: false,
            probes: Mutex::new(Vec::new()),
            injected: Mutex::new(Vec::new()),
        }
    }

    /// Same manager without display tagging.
    pub fn without_display_tagging(mut self) -> Self {
        self.display_tagging = false;
        self
    }

    /// Same manager, rejecting every key-up event.
    pub fn rejecting_key_up(mut self) -> Self {
        self.reject_key_up = true;
        self
    }

    /// Signatures probed so far, in order.
    pub fn probes(&self) -> Vec<InjectSignature> {
        lock(&self.probes).clone()
    }

    /// Events injected so far with the signature that carried each.
    pub fn injected(&self) -> Vec<(InjectSignature, SyntheticEvent)> {
        lock(&self.injected).clone()
    }

    fn record(
        &self,
        signature: InjectSignature,
        event: &SyntheticEvent,
    ) -> Result<bool, InvokeError> {
        if self.should_fail {
            return Err(InvokeError("mock failure".to_string()));
        }
        lock(&self.injected).push((signature, event.clone()));
        let rejected = self.reject_key_up
            && matches!(event, SyntheticEvent::Key(key) if key.action == KeyAction::Up);
        Ok(!rejected)
    }
}

impl InputManagerService for MockInputManager {
    fn has_entry_point(&self, signature: InjectSignature) -> bool {
        lock(&self.probes).push(signature);
        self.offered.contains(&signature)
    }

    fn supports_display_tagging(&self) -> bool {
        self.display_tagging
    }

    fn inject_input_event(
        &self,
        event: &SyntheticEvent,
        _mode: InjectMode,
    ) -> Result<bool, InvokeError> {
        self.record(InjectSignature::Legacy, event)
    }

    fn inject_input_event_to_target(
        &self,
        event: &SyntheticEvent,
        _mode: InjectMode,
        _target_uid: i32,
    ) -> Result<bool, InvokeError> {
        self.record(InjectSignature::WithTargetUid, event)
    }
}

/// Backend handing out one [`MockInputManager`], or none.
pub struct MockInputBackend {
    pub sdk: SdkLevel,
    manager: Option<Arc<MockInputManager>>,
    lookups: AtomicUsize,
}

impl MockInputBackend {
    pub fn new(sdk: SdkLevel, manager: Arc<MockInputManager>) -> Self {
        Self {
            sdk,
            manager: Some(manager),
            lookups: AtomicUsize::new(0),
        }
    }

    /// A backend whose manager lookup always fails.
    pub fn unavailable(sdk: SdkLevel) -> Self {
        Self {
            sdk,
            manager: None,
            lookups: AtomicUsize::new(0),
        }
    }

    /// Number of manager lookups so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl InputBackend for MockInputBackend {
    fn sdk_level(&self) -> SdkLevel {
        self.sdk
    }

    fn input_manager(&self) -> Result<Arc<dyn InputManagerService>, ResolutionError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        match &self.manager {
            Some(manager) => Ok(Arc::clone(manager) as Arc<dyn InputManagerService>),
            None => Err(ResolutionError::ManagerUnavailable(
                "mock backend has no input manager".to_string(),
            )),
        }
    }
}

