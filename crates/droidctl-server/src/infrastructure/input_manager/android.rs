//! Input manager backed by the Android `input` tool.
//!
//! # How the tool maps onto entry points (for beginners)
//!
//! Running `input` with no arguments prints its usage text.  That text is
//! the "service lookup": if the tool is missing or prints nothing useful,
//! the manager is unavailable.  What it lists decides which entry points
//! exist:
//!
//! | Usage text mentions          | Offers                                   |
//! |------------------------------|------------------------------------------|
//! | `motionevent`                | three-argument entry point (raw motions) |
//! | `tap` and `keyevent`         | two-argument entry point                 |
//! | `-d DISPLAY_ID`              | display tagging                          |
//!
//! The tool always delivers a key as a down/up pair, so a key-down event
//! runs `input keyevent` and the matching key-up is acknowledged without
//! another command.  The two-argument path can only tap, so a touch is sent
//! as `input tap` on the up event and down/move events are acknowledged
//! without a command.

use std::sync::{Arc, OnceLock};

use droidctl_core::{
    InjectMode, InjectSignature, KeyAction, MotionAction, SdkLevel, SyntheticEvent,
};
use tracing::{debug, trace, warn};

use crate::application::command::{CommandRunner, ShellCommand};
use crate::application::resolve_capability::{
    InputBackend, InputManagerService, InvokeError, ResolutionError,
};

const USAGE_MARKER: &str = "Usage: input";
const SDK_PROPERTY: &str = "ro.build.version.sdk";

/// Looks up the `input` tool and the device API level.
pub struct AndroidInputBackend {
    runner: Arc<dyn CommandRunner>,
    tool: String,
    sdk_override: Option<SdkLevel>,
    sdk: OnceLock<SdkLevel>,
}

impl AndroidInputBackend {
    /// `sdk_override` skips the `getprop` query.
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        tool: impl Into<String>,
        sdk_override: Option<SdkLevel>,
    ) -> Self {
        Self {
            runner,
            tool: tool.into(),
            sdk_override,
            sdk: OnceLock::new(),
        }
    }

    fn query_sdk(&self) -> SdkLevel {
        let command = ShellCommand::new("getprop").arg(SDK_PROPERTY);
        match self.runner.run(&command) {
            Ok(output) if output.success() => match output.output.trim().parse() {
                Ok(level) => SdkLevel(level),
                Err(_) => {
                    warn!(value = %output.output.trim(), "unparseable sdk level, assuming legacy device");
                    SdkLevel(0)
                }
            },
            Ok(output) => {
                warn!(code = ?output.exit_code, "getprop failed, assuming legacy device");
                SdkLevel(0)
            }
            Err(e) => {
                warn!(error = %e, "getprop could not run, assuming legacy device");
                SdkLevel(0)
            }
        }
    }
}

impl InputBackend for AndroidInputBackend {
    fn sdk_level(&self) -> SdkLevel {
        if let Some(level) = self.sdk_override {
            return level;
        }
        *self.sdk.get_or_init(|| self.query_sdk())
    }

    fn input_manager(&self) -> Result<Arc<dyn InputManagerService>, ResolutionError> {
        let output = self
            .runner
            .run(&ShellCommand::new(&self.tool))
            .map_err(|e| ResolutionError::ManagerUnavailable(e.to_string()))?;

        // The tool exits non-zero after printing usage, so only the text counts.
        if !output.output.contains(USAGE_MARKER) {
            return Err(ResolutionError::ManagerUnavailable(format!(
                "`{}` did not print its usage",
                self.tool
            )));
        }
        debug!(tool = %self.tool, "input tool found");

        Ok(Arc::new(ShellInputManager::new(
            Arc::clone(&self.runner),
            self.tool.clone(),
            &output.output,
        )))
    }
}

/// Logs an injection with the platform codes the entry point would receive.
fn trace_injection(signature: InjectSignature, event: &SyntheticEvent, mode: InjectMode) {
    trace!(
        args = signature.arity(),
        mode = mode.code(),
        kind = event.kind(),
        action = event.action_code(),
        source = event.source().code(),
        event_time = event.event_time().as_millis(),
        "injecting {signature:?} event"
    );
}

/// [`InputManagerService`] over the `input` tool.
pub struct ShellInputManager {
    runner: Arc<dyn CommandRunner>,
    tool: String,
    motion_events: bool,
    taps: bool,
    display_tagging: bool,
}

impl ShellInputManager {
    /// Builds a manager whose capabilities are read from `usage`.
    pub fn new(runner: Arc<dyn CommandRunner>, tool: String, usage: &str) -> Self {
        Self {
            runner,
            tool,
            motion_events: usage.contains("motionevent"),
            taps: usage.contains("tap") && usage.contains("keyevent"),
            display_tagging: usage.contains("-d DISPLAY_ID"),
        }
    }

    fn base(&self, event: &SyntheticEvent) -> ShellCommand {
        let command = ShellCommand::new(&self.tool);
        match event.display() {
            Some(display) if self.display_tagging => command.arg("-d").arg(display.to_string()),
            _ => command,
        }
    }

    fn key_command(&self, event: &SyntheticEvent) -> Option<ShellCommand> {
        match event {
            SyntheticEvent::Key(key) if key.action == KeyAction::Down => Some(
                self.base(event)
                    .arg("keyevent")
                    .arg(key.code.to_string()),
            ),
            _ => None,
        }
    }

    fn execute(&self, command: Option<ShellCommand>) -> Result<bool, InvokeError> {
        let Some(command) = command else {
            return Ok(true);
        };
        debug!(%command, "injecting through input tool");
        let output = self
            .runner
            .run(&command)
            .map_err(|e| InvokeError(e.to_string()))?;
        Ok(output.success())
    }
}

impl InputManagerService for ShellInputManager {
    fn has_entry_point(&self, signature: InjectSignature) -> bool {
        match signature {
            InjectSignature::WithTargetUid => self.motion_events,
            InjectSignature::Legacy => self.taps,
        }
    }

    fn supports_display_tagging(&self) -> bool {
        self.display_tagging
    }

    fn inject_input_event(
        &self,
        event: &SyntheticEvent,
        mode: InjectMode,
    ) -> Result<bool, InvokeError> {
        trace_injection(InjectSignature::Legacy, event, mode);
        let command = match event {
            SyntheticEvent::Touch(touch) if touch.action == MotionAction::Up => Some(
                self.base(event)
                    .arg("tap")
                    .arg(touch.x.to_string())
                    .arg(touch.y.to_string()),
            ),
            SyntheticEvent::Touch(_) => None,
            SyntheticEvent::Key(_) => self.key_command(event),
        };
        self.execute(command)
    }

    fn inject_input_event_to_target(
        &self,
        event: &SyntheticEvent,
        mode: InjectMode,
        target_uid: i32,
    ) -> Result<bool, InvokeError> {
        trace_injection(InjectSignature::WithTargetUid, event, mode);
        trace!(target_uid, "injection target");
        let command = match event {
            SyntheticEvent::Touch(touch) => Some(
                self.base(event)
                    .arg("motionevent")
                    .arg(touch.action.as_str())
                    .arg(touch.x.to_string())
                    .arg(touch.y.to_string()),
            ),
            SyntheticEvent::Key(_) => self.key_command(event),
        };
        self.execute(command)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
