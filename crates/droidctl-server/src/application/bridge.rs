//! DeviceBridge: the process-scoped context that owns every component.
//!
//! One bridge is built at startup from its backends and settings and lives
//! until shutdown.  Each operation delegates to the component that owns it,
//! logs a failure once at this boundary and returns a typed result.
//!
//! Operations that address a display accept registry identifiers.  Before a
//! command reaches the OS, the id of a registered virtual display is swapped
//! for the OS id the display server reports for it.

use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;

use droidctl_core::{DisplayId, DisplaySpec, InjectOutcome, InjectSignature, KeyCode, MotionAction};
use thiserror::Error;
use tracing::{error, info};

use super::capture_screen::{CaptureError, CaptureSettings, ScreenCapture};
use super::command::CommandRunner;
use super::inject_input::{InjectError, InputInjector};
use super::launch_activity::{ActivityLauncher, LaunchError, LaunchMode, LaunchSettings};
use super::manage_displays::{
    ActiveDisplay, DisplayError, DisplayServer, VirtualDisplayManager, DEFAULT_ID_BASE,
};
use super::resolve_capability::{CapabilityResolver, InputBackend, ResolverSettings};
use super::shell_input::{ShellInput, ShellInputError, DEFAULT_INPUT_TOOL};

/// Error type for [`DeviceBridge::press_key_on_display`], which picks one of
/// two delivery paths.
#[derive(Debug, Error)]
pub enum KeyPressError {
    #[error(transparent)]
    Inject(#[from] InjectError),

    #[error(transparent)]
    Shell(#[from] ShellInputError),
}

/// Platform adapters the bridge is built on.
pub struct BridgeBackends {
    pub input: Arc<dyn InputBackend>,
    pub displays: Arc<dyn DisplayServer>,
    pub runner: Arc<dyn CommandRunner>,
}

/// Component settings, normally derived from the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSettings {
    pub resolver: ResolverSettings,
    pub display_id_base: i32,
    pub capture: CaptureSettings,
    pub launch: LaunchSettings,
    pub input_tool: String,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            resolver: ResolverSettings::default(),
            display_id_base: DEFAULT_ID_BASE,
            capture: CaptureSettings::default(),
            launch: LaunchSettings::default(),
            input_tool: DEFAULT_INPUT_TOOL.to_string(),
        }
    }
}

/// Device-control facade.
pub struct DeviceBridge {
    resolver: Arc<CapabilityResolver>,
    injector: InputInjector,
    displays: VirtualDisplayManager,
    capture: ScreenCapture,
    launcher: ActivityLauncher,
    shell_input: ShellInput,
}

impl DeviceBridge {
    pub fn new(backends: BridgeBackends, settings: BridgeSettings) -> Self {
        let resolver = Arc::new(CapabilityResolver::new(backends.input, settings.resolver));
        Self {
            injector: InputInjector::new(Arc::clone(&resolver)),
            resolver,
            displays: VirtualDisplayManager::new(backends.displays, settings.display_id_base),
            capture: ScreenCapture::new(Arc::clone(&backends.runner), settings.capture),
            launcher: ActivityLauncher::new(Arc::clone(&backends.runner), settings.launch),
            shell_input: ShellInput::new(backends.runner, settings.input_tool),
        }
    }

    /// Liveness check.
    pub fn ping(&self) -> bool {
        true
    }

    /// Signature bound by the resolver, if resolution has happened.
    pub fn bound_signature(&self) -> Option<InjectSignature> {
        self.resolver.bound().map(|bound| bound.signature())
    }

    // ── Input ─────────────────────────────────────────────────────────────────

    /// See [`InputInjector::inject_touch`].
    pub fn inject_touch(
        &self,
        display: DisplayId,
        action: MotionAction,
        x: f32,
        y: f32,
    ) -> Result<InjectOutcome, InjectError> {
        let target = self.displays.os_target(display);
        logged("inject_touch", self.injector.inject_touch(target, action, x, y))
    }

    /// See [`InputInjector::inject_key`].
    pub fn inject_key(&self, code: KeyCode) -> Result<bool, InjectError> {
        logged("inject_key", self.injector.inject_key(code))
    }

    /// Presses `code` on `display`.
    ///
    /// The default display goes through the injector.  Secondary displays go
    /// through the `input` tool, which can address them; the result is then
    /// `true` whenever the tool succeeded.
    pub fn press_key_on_display(
        &self,
        display: DisplayId,
        code: KeyCode,
    ) -> Result<bool, KeyPressError> {
        let target = self.displays.os_target(display);
        let result = if target.is_secondary() {
            self.shell_input
                .key_on_display(target, code)
                .map(|()| true)
                .map_err(KeyPressError::from)
        } else {
            self.injector.inject_key(code).map_err(KeyPressError::from)
        };
        logged("press_key_on_display", result)
    }

    pub fn press_home(&self, display: DisplayId) -> Result<bool, KeyPressError> {
        self.press_key_on_display(display, KeyCode::HOME)
    }

    pub fn press_back(&self, display: DisplayId) -> Result<bool, KeyPressError> {
        self.press_key_on_display(display, KeyCode::BACK)
    }

    /// See [`ShellInput::input_text`].
    pub fn input_text(&self, display: DisplayId, text: &str) -> Result<(), ShellInputError> {
        let target = self.displays.os_target(display);
        logged("input_text", self.shell_input.input_text(target, text))
    }

    // ── Capture ───────────────────────────────────────────────────────────────

    /// See [`ScreenCapture::capture_to_file`].
    pub fn capture_to_file(&self, display: DisplayId) -> Result<PathBuf, CaptureError> {
        let target = self.displays.os_target(display);
        logged("capture_to_file", self.capture.capture_to_file(target))
    }

    // ── Displays ──────────────────────────────────────────────────────────────

    /// Creates a virtual display; see [`VirtualDisplayManager::create`].
    pub fn create_virtual_display(
        &self,
        name: &str,
        width: u32,
        height: u32,
        density: u32,
    ) -> Result<DisplayId, DisplayError> {
        let spec = DisplaySpec::new(name, width, height, density);
        logged("create_virtual_display", self.displays.create(&spec))
    }

    /// See [`VirtualDisplayManager::release`].
    pub fn release_virtual_display(&self, id: DisplayId) -> Result<(), DisplayError> {
        logged("release_virtual_display", self.displays.release(id))
    }

    pub fn active_displays(&self) -> Vec<ActiveDisplay> {
        self.displays.list()
    }

    // ── Launch ────────────────────────────────────────────────────────────────

    /// See [`ActivityLauncher::start_on_display`].
    pub fn start_activity_on_display(
        &self,
        display: DisplayId,
        component: &str,
    ) -> Result<LaunchMode, LaunchError> {
        let target = self.displays.os_target(display);
        logged(
            "start_activity_on_display",
            self.launcher.start_on_display(target, component),
        )
    }

    /// Releases every display still registered.  Returns how many were
    /// released successfully.
    pub fn shutdown(&self) -> usize {
        let results = self.displays.release_all();
        let total = results.len();
        let released = results.iter().filter(|(_, r)| r.is_ok()).count();
        for (id, result) in &results {
            if let Err(e) = result {
                error!(display = %id, error = %e, "display release failed during shutdown");
            }
        }
        info!(released, total, "bridge shut down");
        released
    }
}

fn logged<T, E: Display>(operation: &'static str, result: Result<T, E>) -> Result<T, E> {
    if let Err(e) = &result {
        error!(operation, error = %e, "bridge operation failed");
    }
    result
}

// ── Tests ─────────────────────────────────────────────────────────────────────
