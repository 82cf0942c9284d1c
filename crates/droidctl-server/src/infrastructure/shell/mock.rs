//! Recording command runner for tests and `--dry-run`.
//!
//! `MockShell` never starts a process.  Each command is recorded, then
//! answered from (in order of precedence):
//!
//! 1. the queue filled by [`MockShell::push_output`] / [`MockShell::push_timeout`],
//! 2. the responder closure set with [`MockShell::with_responder`],
//! 3. an empty output with [`MockShell::exit_code`].
//!
//! # Usage in tests
//!
//! ```ignore
//! let shell = Arc::new(MockShell::new());
//! shell.push_output(1, "Error: bad display");
//! let capture = ScreenCapture::new(shell.clone(), CaptureSettings::default());
//!
//! assert!(capture.capture_to_file(DisplayId(9)).is_err());
//! assert!(shell.recorded_lines()[0].starts_with("screencap -d 9"));
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tracing::info;

use crate::application::command::{CommandOutput, CommandRunner, ShellCommand, ShellError};
use crate::infrastructure::lock;

type Responder = Box<dyn Fn(&ShellCommand) -> CommandOutput + Send + Sync>;

enum Scripted {
    Output(CommandOutput),
    TimedOut,
}

/// Command runner that records instead of executing.
pub struct MockShell {
    /// Exit status used when nothing else answers a command.
    pub exit_code: i32,
    /// Log every command at info level (used by `--dry-run`).
    pub echo: bool,
    commands: Mutex<Vec<ShellCommand>>,
    queue: Mutex<VecDeque<Scripted>>,
    responder: Option<Responder>,
}

impl Default for MockShell {
    fn default() -> Self {
        Self::new()
    }
}

impl MockShell {
    /// A shell on which every command succeeds with empty output.
    pub fn new() -> Self {
        Self {
            exit_code: 0,
            echo: false,
            commands: Mutex::new(Vec::new()),
            queue: Mutex::new(VecDeque::new()),
            responder: None,
        }
    }

    /// A shell on which every command exits with `exit_code`.
    pub fn failing(exit_code: i32) -> Self {
        Self {
            exit_code,
            ..Self::new()
        }
    }

    /// A shell that logs each command instead of running it.
    pub fn echoing() -> Self {
        Self {
            echo: true,
            ..Self::new()
        }
    }

    /// Answers unscripted commands with `responder`.
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&ShellCommand) -> CommandOutput + Send + Sync + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Queues the answer for the next command.
    pub fn push_output(&self, exit_code: i32, output: &str) {
        lock(&self.queue).push_back(Scripted::Output(CommandOutput::new(exit_code, output)));
    }

    /// Queues a timeout for the next command.
    pub fn push_timeout(&self) {
        lock(&self.queue).push_back(Scripted::TimedOut);
    }

    /// Every command run so far.
    pub fn recorded(&self) -> Vec<ShellCommand> {
        lock(&self.commands).clone()
    }

    /// Every command run so far, as space-joined lines.
    pub fn recorded_lines(&self) -> Vec<String> {
        lock(&self.commands).iter().map(ToString::to_string).collect()
    }
}

impl CommandRunner for MockShell {
    fn run(&self, command: &ShellCommand) -> Result<CommandOutput, ShellError> {
        if self.echo {
            info!(%command, "dry-run");
        }
        lock(&self.commands).push(command.clone());

        let scripted = lock(&self.queue).pop_front();
        match scripted {
            Some(Scripted::Output(output)) => Ok(output),
            Some(Scripted::TimedOut) => Err(ShellError::TimedOut {
                program: command.program().to_string(),
                timeout: Duration::ZERO,
            }),
            None => Ok(match &self.responder {
                Some(responder) => responder(command),
                None => CommandOutput::new(self.exit_code, ""),
            }),
        }
    }
}
