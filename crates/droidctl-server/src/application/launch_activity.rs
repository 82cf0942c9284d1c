//! ActivityLauncher: starts an app on a given display.
//!
//! Two modes, chosen by the shape of the component string:
//!
//! - `package/.Activity` (contains `/`): the activity manager starts that
//!   exact component on the requested display, fullscreen, in a new task,
//!   force-stopping any running instance first.
//! - `package` alone: the package's launcher entry is started through the
//!   monkey tool.  That path cannot target a display, so the app opens on
//!   the default one.  The returned [`LaunchMode`] tells the caller which
//!   path ran.

use std::sync::Arc;

use droidctl_core::DisplayId;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::command::{CommandRunner, ShellCommand, ShellError};

/// `Intent.FLAG_ACTIVITY_NEW_TASK`.
pub const FLAG_ACTIVITY_NEW_TASK: u32 = 0x1000_0000;
/// `WindowConfiguration.WINDOWING_MODE_FULLSCREEN`.
pub const WINDOWING_MODE_FULLSCREEN: u32 = 1;
pub const LAUNCHER_CATEGORY: &str = "android.intent.category.LAUNCHER";

/// Tool names for the two launch paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSettings {
    pub am_tool: String,
    pub monkey_tool: String,
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            am_tool: "am".to_string(),
            monkey_tool: "monkey".to_string(),
        }
    }
}

/// Which launch path ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchMode {
    /// The component was started on the requested display.
    OnDisplay,
    /// Only a package was given; its launcher entry was started on the
    /// default display.
    LauncherFallback,
}

/// Error type for activity launch.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("invalid component: {0:?}")]
    InvalidComponent(String),

    #[error("`{tool}` exited with status {code:?}: {output}")]
    Subprocess {
        tool: String,
        code: Option<i32>,
        output: String,
    },

    #[error(transparent)]
    Shell(#[from] ShellError),
}

/// Starts activities on displays.
pub struct ActivityLauncher {
    runner: Arc<dyn CommandRunner>,
    settings: LaunchSettings,
}

impl ActivityLauncher {
    pub fn new(runner: Arc<dyn CommandRunner>, settings: LaunchSettings) -> Self {
        Self { runner, settings }
    }

    /// Starts `component` on `target`.
    ///
    /// Tool output is logged line by line at debug level.
    ///
    /// # Errors
    ///
    /// - [`LaunchError::InvalidComponent`] for an empty string or one that
    ///   contains whitespace.
    /// - [`LaunchError::Subprocess`] if the tool exits non-zero.
    /// - [`LaunchError::Shell`] if the tool cannot be run or times out.
    pub fn start_on_display(
        &self,
        target: DisplayId,
        component: &str,
    ) -> Result<LaunchMode, LaunchError> {
        let (command, mode) = self.build_command(target, component)?;
        if mode == LaunchMode::LauncherFallback && target.is_secondary() {
            warn!(
                display = %target,
                package = component,
                "bare package name cannot target a display, launching on the default display"
            );
        }

        info!(%command, "starting activity");
        let output = self.runner.run(&command).map_err(|e| {
            error!(component, error = %e, "launch tool could not run");
            e
        })?;
        for line in output.output.lines().filter(|l| !l.trim().is_empty()) {
            debug!(tool = command.program(), "{line}");
        }

        if !output.success() {
            error!(component, code = ?output.exit_code, "launch tool failed");
            return Err(LaunchError::Subprocess {
                tool: command.program().to_string(),
                code: output.exit_code,
                output: output.output,
            });
        }
        Ok(mode)
    }

    /// Builds the command for `component` without running it.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::InvalidComponent`] as for
    /// [`start_on_display`](Self::start_on_display).
    pub fn build_command(
        &self,
        target: DisplayId,
        component: &str,
    ) -> Result<(ShellCommand, LaunchMode), LaunchError> {
        if component.is_empty() || component.chars().any(char::is_whitespace) {
            return Err(LaunchError::InvalidComponent(component.to_string()));
        }

        if component.contains('/') {
            let command = ShellCommand::new(&self.settings.am_tool)
                .args(["start", "-n", component])
                .args(["--display".to_string(), target.to_string()])
                .args([
                    "--windowingMode".to_string(),
                    WINDOWING_MODE_FULLSCREEN.to_string(),
                ])
                .args(["-f".to_string(), format!("{FLAG_ACTIVITY_NEW_TASK:#x}")])
                .arg("-S");
            Ok((command, LaunchMode::OnDisplay))
        } else {
            let command = ShellCommand::new(&self.settings.monkey_tool)
                .args(["-p", component, "-c", LAUNCHER_CATEGORY, "1"]);
            Ok((command, LaunchMode::LauncherFallback))
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::command::CommandOutput;
    use std::sync::Mutex;

    struct ScriptedRunner {
        reply: CommandOutput,
        commands: Mutex<Vec<ShellCommand>>,
    }

    impl ScriptedRunner {
        fn replying(exit_code: i32, output: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: CommandOutput::new(exit_code, output),
                commands: Mutex::new(Vec::new()),
            })
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, command: &ShellCommand) -> Result<CommandOutput, ShellError> {
            self.commands.lock().unwrap().push(command.clone());
            Ok(self.reply.clone())
        }
    }

    #[test]
    fn test_full_component_starts_on_display() {
        // Arrange
        let runner = ScriptedRunner::replying(0, "Starting: Intent { cmp=com.example/.Main }\n");
        let launcher = ActivityLauncher::new(runner.clone(), LaunchSettings::default());

        // Act
        let mode = launcher
            .start_on_display(DisplayId(101), "com.example/.Main")
            .expect("launch");

        // Assert
        assert_eq!(mode, LaunchMode::OnDisplay);
        let line = runner.commands.lock().unwrap()[0].to_string();
        assert_eq!(
            line,
            "am start -n com.example/.Main --display 101 --windowingMode 1 -f 0x10000000 -S"
        );
    }

    #[test]
    fn test_bare_package_uses_launcher_fallback() {
        let runner = ScriptedRunner::replying(0, "Events injected: 1\n");
        let launcher = ActivityLauncher::new(runner.clone(), LaunchSettings::default());

        let mode = launcher
            .start_on_display(DisplayId(101), "com.example")
            .expect("launch");

        assert_eq!(mode, LaunchMode::LauncherFallback);
        let line = runner.commands.lock().unwrap()[0].to_string();
        assert_eq!(line, "monkey -p com.example -c android.intent.category.LAUNCHER 1");
        assert!(!line.contains("101"));
    }

    #[test]
    fn test_empty_or_spaced_component_is_rejected_without_running() {
        let runner = ScriptedRunner::replying(0, "");
        let launcher = ActivityLauncher::new(runner.clone(), LaunchSettings::default());

        let empty = launcher.start_on_display(DisplayId(101), "");
        let spaced = launcher.start_on_display(DisplayId(101), "com.example/.Main; reboot");

        assert!(matches!(empty, Err(LaunchError::InvalidComponent(_))));
        assert!(matches!(spaced, Err(LaunchError::InvalidComponent(_))));
        assert!(runner.commands.lock().unwrap().is_empty());
    }

    #[test]
    fn test_non_zero_exit_is_subprocess_error() {
        let runner = ScriptedRunner::replying(255, "Error: Activity class does not exist.\n");
        let launcher = ActivityLauncher::new(runner, LaunchSettings::default());

        let result = launcher.start_on_display(DisplayId(101), "com.example/.Missing");

        match result {
            Err(LaunchError::Subprocess { tool, code, output }) => {
                assert_eq!(tool, "am");
                assert_eq!(code, Some(255));
                assert!(output.contains("does not exist"));
            }
            other => panic!("expected subprocess error, got {other:?}"),
        }
    }

    #[test]
    fn test_fallback_on_secondary_display_warns_with_display() {
        let launcher =
            ActivityLauncher::new(ScriptedRunner::replying(0, ""), LaunchSettings::default());

        let (mode, log) = crate::infrastructure::capture_logs(|| {
            launcher.start_on_display(DisplayId(101), "com.example")
        });

        assert_eq!(mode.expect("launch"), LaunchMode::LauncherFallback);
        assert!(log.contains("display=101"), "log was {log}");
    }
}
