//! ShellInput: text entry and display-addressed key presses through the
//! `input` command-line tool.
//!
//! The injector in [`super::inject_input`] cannot tag key events with a
//! display, so keys aimed at a virtual display go through the tool's `-d`
//! option instead.  Text entry has no entry-point equivalent at all.

use std::sync::Arc;

use droidctl_core::{DisplayId, KeyCode};
use thiserror::Error;
use tracing::{debug, error};

use super::command::{CommandRunner, ShellCommand, ShellError};

pub const DEFAULT_INPUT_TOOL: &str = "input";

/// Error type for tool-driven input.
#[derive(Debug, Error)]
pub enum ShellInputError {
    #[error("text must not be empty")]
    EmptyText,

    #[error("`{tool}` exited with status {code:?}: {output}")]
    Subprocess {
        tool: String,
        code: Option<i32>,
        output: String,
    },

    #[error(transparent)]
    Shell(#[from] ShellError),
}

/// Encodes text for `input text`, which splits its argument on spaces.
pub fn escape_text(text: &str) -> String {
    text.replace(' ', "%s")
}

/// Sends text and keys through the `input` tool.
pub struct ShellInput {
    runner: Arc<dyn CommandRunner>,
    tool: String,
}

impl ShellInput {
    pub fn new(runner: Arc<dyn CommandRunner>, tool: impl Into<String>) -> Self {
        Self {
            runner,
            tool: tool.into(),
        }
    }

    /// Types `text` into the focused field on `display`.
    ///
    /// # Errors
    ///
    /// Returns [`ShellInputError::EmptyText`] for empty input, otherwise as
    /// for any tool invocation.
    pub fn input_text(&self, display: DisplayId, text: &str) -> Result<(), ShellInputError> {
        if text.is_empty() {
            return Err(ShellInputError::EmptyText);
        }
        let command = self.on_display(display).arg("text").arg(escape_text(text));
        self.run(command)
    }

    /// Presses `code` on `display`.
    ///
    /// # Errors
    ///
    /// Returns [`ShellInputError`] if the tool fails.
    pub fn key_on_display(&self, display: DisplayId, code: KeyCode) -> Result<(), ShellInputError> {
        let command = self
            .on_display(display)
            .arg("keyevent")
            .arg(code.to_string());
        self.run(command)
    }

    fn on_display(&self, display: DisplayId) -> ShellCommand {
        let command = ShellCommand::new(&self.tool);
        if display.is_secondary() {
            command.arg("-d").arg(display.to_string())
        } else {
            command
        }
    }

    fn run(&self, command: ShellCommand) -> Result<(), ShellInputError> {
        debug!(%command, "running input tool");
        let output = self.runner.run(&command)?;
        if output.success() {
            return Ok(());
        }
        error!(%command, code = ?output.exit_code, "input tool failed");
        Err(ShellInputError::Subprocess {
            tool: self.tool.clone(),
            code: output.exit_code,
            output: output.output,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::command::CommandOutput;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRunner {
        exit_code: i32,
        commands: Mutex<Vec<String>>,
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, command: &ShellCommand) -> Result<CommandOutput, ShellError> {
            self.commands.lock().unwrap().push(command.to_string());
            Ok(CommandOutput::new(self.exit_code, ""))
        }
    }

    #[test]
    fn test_escape_text_replaces_spaces() {
        assert_eq!(escape_text("hello big world"), "hello%sbig%sworld");
        assert_eq!(escape_text("nospace"), "nospace");
    }

    #[test]
    fn test_input_text_on_virtual_display() {
        // Arrange
        let runner = Arc::new(RecordingRunner::default());
        let input = ShellInput::new(runner.clone(), DEFAULT_INPUT_TOOL);

        // Act
        input.input_text(DisplayId(101), "hi there").expect("text");

        // Assert
        assert_eq!(
            *runner.commands.lock().unwrap(),
            vec!["input -d 101 text hi%sthere".to_string()]
        );
    }

    #[test]
    fn test_empty_text_is_rejected() {
        let runner = Arc::new(RecordingRunner::default());
        let input = ShellInput::new(runner.clone(), DEFAULT_INPUT_TOOL);

        let result = input.input_text(DisplayId::DEFAULT, "");

        assert!(matches!(result, Err(ShellInputError::EmptyText)));
        assert!(runner.commands.lock().unwrap().is_empty());
    }

    #[test]
    fn test_key_on_default_display_has_no_display_flag() {
        let runner = Arc::new(RecordingRunner::default());
        let input = ShellInput::new(runner.clone(), DEFAULT_INPUT_TOOL);

        input.key_on_display(DisplayId::DEFAULT, KeyCode::HOME).expect("key");

        assert_eq!(
            *runner.commands.lock().unwrap(),
            vec!["input keyevent 3".to_string()]
        );
    }

    #[test]
    fn test_tool_failure_is_subprocess_error() {
        let runner = Arc::new(RecordingRunner {
            exit_code: 1,
            ..RecordingRunner::default()
        });
        let input = ShellInput::new(runner, DEFAULT_INPUT_TOOL);

        let result = input.key_on_display(DisplayId(5), KeyCode::BACK);

        assert!(matches!(
            result,
            Err(ShellInputError::Subprocess { code: Some(1), .. })
        ));
    }
}
