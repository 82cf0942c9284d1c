//! Subprocess port used by every component that shells out.
//!
//! The application layer only sees [`CommandRunner`].  The infrastructure
//! layer provides the real implementation (`SystemShell`, which enforces a
//! timeout) and a recording mock for tests.
//!
//! Commands are passed as a program plus an argument vector, never as a
//! shell string, so component names and file paths are never re-parsed by a
//! shell.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Error type for subprocess execution.
///
/// A non-zero exit status is *not* a `ShellError`; it is reported through
/// [`CommandOutput::exit_code`] and each component decides what it means.
#[derive(Debug, Error)]
pub enum ShellError {
    /// The program could not be started (missing binary, permissions).
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program was still running when the timeout expired.  It has been
    /// killed.
    #[error("`{program}` did not exit within {timeout:?} and was killed")]
    TimedOut { program: String, timeout: Duration },

    /// Waiting on the child or driving the subprocess runtime failed.
    #[error("subprocess runtime error: {0}")]
    Runtime(#[source] std::io::Error),
}

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    program: String,
    args: Vec<String>,
}

impl ShellCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for ShellCommand {
    /// Space-joined command line, for logs and assertions.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// What a finished subprocess produced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit status, or `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Standard output followed by standard error, lossily decoded.
    pub output: String,
}

impl CommandOutput {
    pub fn new(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            output: output.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs a command to completion and returns its exit status and output.
///
/// Implementations block the calling thread.
pub trait CommandRunner: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ShellError`] if the program cannot be started, times out, or
    /// cannot be waited on.
    fn run(&self, command: &ShellCommand) -> Result<CommandOutput, ShellError>;
}
