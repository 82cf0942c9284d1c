//! Real subprocess runner with a timeout.
//!
//! # Why a runtime inside a blocking runner? (for beginners)
//!
//! The bridge API is synchronous, but a stuck `screencap` or `am` must not
//! hang the caller forever.  `SystemShell` owns a small current-thread tokio
//! runtime and drives each child through `tokio::process` under
//! `tokio::time::timeout`.  When the timeout fires the wait future is dropped,
//! which drops the child, and `kill_on_drop(true)` kills it.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::runtime::{Builder, Runtime};
use tracing::{trace, warn};

use crate::application::command::{CommandOutput, CommandRunner, ShellCommand, ShellError};

/// Default limit on a single subprocess.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs commands on the host.
pub struct SystemShell {
    runtime: Runtime,
    timeout: Duration,
}

impl SystemShell {
    /// # Errors
    ///
    /// Returns [`ShellError::Runtime`] if the subprocess runtime cannot be
    /// built.
    pub fn new(timeout: Duration) -> Result<Self, ShellError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ShellError::Runtime)?;
        Ok(Self { runtime, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run_child(&self, command: &ShellCommand) -> Result<CommandOutput, ShellError> {
        let child = Command::new(command.program())
            .args(command.arguments())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ShellError::Spawn {
                program: command.program().to_string(),
                source,
            })?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&output.stderr));
                trace!(%command, code = ?output.status.code(), "subprocess finished");
                Ok(CommandOutput {
                    exit_code: output.status.code(),
                    output: text,
                })
            }
            Ok(Err(e)) => Err(ShellError::Runtime(e)),
            Err(_elapsed) => {
                warn!(%command, timeout = ?self.timeout, "subprocess timed out, killed");
                Err(ShellError::TimedOut {
                    program: command.program().to_string(),
                    timeout: self.timeout,
                })
            }
        }
    }
}

impl CommandRunner for SystemShell {
    fn run(&self, command: &ShellCommand) -> Result<CommandOutput, ShellError> {
        self.runtime.block_on(self.run_child(command))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
