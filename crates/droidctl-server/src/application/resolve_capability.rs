//! Resolves the OS input-injection entry point once per process.
//!
//! # How resolution works (for beginners)
//!
//! The input manager is a process-wide service.  Which "inject event" entry
//! point it offers depends on the OS release (see
//! [`droidctl_core::capability`]).  Resolution therefore runs in three steps:
//!
//! 1. Look up the input manager through the [`InputBackend`].
//! 2. Read the device API level.
//! 3. Walk [`InjectSignature::probe_order`] and bind the first signature the
//!    manager actually offers.
//!
//! The result is cached in a [`BoundEntryPoint`] for the rest of the process
//! lifetime.  A *failed* resolution is not cached, so a later call retries.
//! Concurrent first calls are serialized so probing happens exactly once.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use droidctl_core::{InjectMode, InjectSignature, SdkLevel, SyntheticEvent, TARGET_UID_UNRESTRICTED};
use thiserror::Error;
use tracing::{error, info, warn};

/// Error type for entry-point resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// The input manager singleton could not be obtained.
    #[error("input manager unavailable: {0}")]
    ManagerUnavailable(String),

    /// The manager offers none of the signatures probed for this API level.
    #[error("no input injection entry point found (sdk {sdk})")]
    EntryPointNotFound { sdk: SdkLevel },
}

/// The bound entry point rejected or failed the call itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("entry point invocation failed: {0}")]
pub struct InvokeError(pub String);

/// The OS input manager singleton.
///
/// One method per entry-point signature.  Implementations report which
/// signatures they offer through [`has_entry_point`](Self::has_entry_point);
/// the resolver never calls a method it has not probed first.
#[cfg_attr(test, mockall::automock)]
pub trait InputManagerService: Send + Sync {
    /// Whether the manager offers the entry point with this signature.
    fn has_entry_point(&self, signature: InjectSignature) -> bool;

    /// Whether events may carry a target display.
    fn supports_display_tagging(&self) -> bool;

    /// The two-argument `(event, mode)` entry point.
    fn inject_input_event(
        &self,
        event: &SyntheticEvent,
        mode: InjectMode,
    ) -> Result<bool, InvokeError>;

    /// The three-argument `(event, mode, target_uid)` entry point.
    fn inject_input_event_to_target(
        &self,
        event: &SyntheticEvent,
        mode: InjectMode,
        target_uid: i32,
    ) -> Result<bool, InvokeError>;
}

/// Where the input manager and the API level come from.
pub trait InputBackend: Send + Sync {
    /// The device API level.
    fn sdk_level(&self) -> SdkLevel;

    /// Looks up the input manager singleton.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::ManagerUnavailable`] if the service cannot be
    /// reached.
    fn input_manager(&self) -> Result<Arc<dyn InputManagerService>, ResolutionError>;
}

// ── Entry points ──────────────────────────────────────────────────────────────

/// A callable injection entry point with its arguments other than the event
/// already fixed.
pub trait InjectEntryPoint: Send + Sync {
    fn signature(&self) -> InjectSignature;

    /// Injects one event and returns the OS's boolean result.
    fn invoke(&self, event: &SyntheticEvent) -> Result<bool, InvokeError>;
}

/// `(event, mode, target_uid)` with the target fixed to "any process".
struct TargetedEntryPoint {
    manager: Arc<dyn InputManagerService>,
    mode: InjectMode,
}

impl InjectEntryPoint for TargetedEntryPoint {
    fn signature(&self) -> InjectSignature {
        InjectSignature::WithTargetUid
    }

    fn invoke(&self, event: &SyntheticEvent) -> Result<bool, InvokeError> {
        self.manager
            .inject_input_event_to_target(event, self.mode, TARGET_UID_UNRESTRICTED)
    }
}

/// `(event, mode)`.
struct LegacyEntryPoint {
    manager: Arc<dyn InputManagerService>,
    mode: InjectMode,
}

impl InjectEntryPoint for LegacyEntryPoint {
    fn signature(&self) -> InjectSignature {
        InjectSignature::Legacy
    }

    fn invoke(&self, event: &SyntheticEvent) -> Result<bool, InvokeError> {
        self.manager.inject_input_event(event, self.mode)
    }
}

fn bind(
    signature: InjectSignature,
    manager: Arc<dyn InputManagerService>,
    mode: InjectMode,
) -> Box<dyn InjectEntryPoint> {
    match signature {
        InjectSignature::WithTargetUid => Box::new(TargetedEntryPoint { manager, mode }),
        InjectSignature::Legacy => Box::new(LegacyEntryPoint { manager, mode }),
    }
}

/// The resolved entry point plus the capabilities probed alongside it.
pub struct BoundEntryPoint {
    entry_point: Box<dyn InjectEntryPoint>,
    display_tagging: bool,
    sdk: SdkLevel,
}

impl BoundEntryPoint {
    pub fn signature(&self) -> InjectSignature {
        self.entry_point.signature()
    }

    /// Whether events injected through this entry point can be tagged with a
    /// display.  Probed once at resolution time.
    pub fn supports_display_tagging(&self) -> bool {
        self.display_tagging
    }

    /// API level observed during resolution.
    pub fn sdk(&self) -> SdkLevel {
        self.sdk
    }

    /// Injects one event.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError`] if the underlying call fails.
    pub fn invoke(&self, event: &SyntheticEvent) -> Result<bool, InvokeError> {
        self.entry_point.invoke(event)
    }
}

impl fmt::Debug for BoundEntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundEntryPoint")
            .field("signature", &self.signature())
            .field("display_tagging", &self.display_tagging)
            .field("sdk", &self.sdk)
            .finish()
    }
}

// ── Resolver ──────────────────────────────────────────────────────────────────

/// Tunables for resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverSettings {
    /// First API level on which the three-argument entry point is tried.
    pub targeted_min_sdk: SdkLevel,
    /// Mode passed to every injection.
    pub inject_mode: InjectMode,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            targeted_min_sdk: SdkLevel::UPSIDE_DOWN_CAKE,
            inject_mode: InjectMode::Async,
        }
    }
}

/// Lazily resolves and caches the injection entry point.
pub struct CapabilityResolver {
    backend: Arc<dyn InputBackend>,
    settings: ResolverSettings,
    bound: OnceLock<Arc<BoundEntryPoint>>,
    /// Held while probing so concurrent first callers wait instead of probing
    /// in parallel.
    resolving: Mutex<()>,
}

impl CapabilityResolver {
    pub fn new(backend: Arc<dyn InputBackend>, settings: ResolverSettings) -> Self {
        Self {
            backend,
            settings,
            bound: OnceLock::new(),
            resolving: Mutex::new(()),
        }
    }

    /// Returns the bound entry point, resolving it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError`] if the manager is unavailable or offers no
    /// usable signature.  Nothing is cached in that case.
    pub fn resolve(&self) -> Result<Arc<BoundEntryPoint>, ResolutionError> {
        if let Some(bound) = self.bound.get() {
            return Ok(Arc::clone(bound));
        }

        let _guard = self
            .resolving
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(bound) = self.bound.get() {
            return Ok(Arc::clone(bound));
        }

        let bound = Arc::new(self.probe()?);
        // Only the holder of `resolving` writes the cell, so it is still empty.
        let _ = self.bound.set(Arc::clone(&bound));
        Ok(bound)
    }

    /// The cached entry point, without triggering resolution.
    pub fn bound(&self) -> Option<Arc<BoundEntryPoint>> {
        self.bound.get().cloned()
    }

    fn probe(&self) -> Result<BoundEntryPoint, ResolutionError> {
        let manager = self.backend.input_manager().map_err(|e| {
            error!(error = %e, "input manager lookup failed");
            e
        })?;
        let sdk = self.backend.sdk_level();

        for &signature in InjectSignature::probe_order(sdk, self.settings.targeted_min_sdk) {
            if !manager.has_entry_point(signature) {
                warn!(?signature, %sdk, "injection entry point not offered, trying next");
                continue;
            }

            let display_tagging = manager.supports_display_tagging();
            if !display_tagging {
                warn!(%sdk, "display tagging unavailable; touches will reach the default display only");
            }
            info!(?signature, %sdk, display_tagging, "bound input injection entry point");

            return Ok(BoundEntryPoint {
                entry_point: bind(signature, manager, self.settings.inject_mode),
                display_tagging,
                sdk,
            });
        }

        error!(%sdk, "no input injection entry point available");
        Err(ResolutionError::EntryPointNotFound { sdk })
    }
}

/// Backend that hands out a fixed manager, for tests in this crate.
#[cfg(test)]
pub(crate) struct FixedBackend {
    pub sdk: SdkLevel,
    pub manager: Option<Arc<dyn InputManagerService>>,
}

#[cfg(test)]
impl InputBackend for FixedBackend {
    fn sdk_level(&self) -> SdkLevel {
        self.sdk
    }

    fn input_manager(&self) -> Result<Arc<dyn InputManagerService>, ResolutionError> {
        self.manager
            .clone()
            .ok_or_else(|| ResolutionError::ManagerUnavailable("no manager".to_string()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
