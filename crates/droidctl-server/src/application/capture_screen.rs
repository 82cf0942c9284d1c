//! ScreenCapture: writes a PNG of one display using the system screenshot
//! tool.
//!
//! Output paths are `<dir>/<prefix><unix-millis>.png`.  The timestamp is
//! bumped past the last one issued by this process, so two captures in the
//! same millisecond still get distinct paths.  The file belongs to the caller
//! once returned; this module never reads or deletes a successful capture.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use droidctl_core::DisplayId;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::command::{CommandRunner, ShellCommand, ShellError};

pub const DEFAULT_CAPTURE_DIR: &str = "/data/local/tmp";
pub const DEFAULT_CAPTURE_PREFIX: &str = "droidctl_screenshot_";
pub const DEFAULT_CAPTURE_TOOL: &str = "screencap";

/// Where captures go and which tool produces them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSettings {
    pub dir: PathBuf,
    pub prefix: String,
    pub tool: String,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_CAPTURE_DIR),
            prefix: DEFAULT_CAPTURE_PREFIX.to_string(),
            tool: DEFAULT_CAPTURE_TOOL.to_string(),
        }
    }
}

/// Error type for screen capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The tool ran and exited unsuccessfully.
    #[error("`{tool}` exited with status {code:?}: {output}")]
    Subprocess {
        tool: String,
        code: Option<i32>,
        output: String,
    },

    #[error(transparent)]
    Shell(#[from] ShellError),
}

/// Captures displays to PNG files.
pub struct ScreenCapture {
    runner: Arc<dyn CommandRunner>,
    settings: CaptureSettings,
    last_stamp: AtomicU64,
}

impl ScreenCapture {
    pub fn new(runner: Arc<dyn CommandRunner>, settings: CaptureSettings) -> Self {
        Self {
            runner,
            settings,
            last_stamp: AtomicU64::new(0),
        }
    }

    /// Captures `target` and returns the path of the written PNG.
    ///
    /// The display argument is only passed to the tool for secondary
    /// displays; the default display is captured without one.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::Subprocess`] if the tool exits non-zero.
    /// - [`CaptureError::Shell`] if the tool cannot be run or times out.
    ///
    /// No file is left at the target path on failure.
    pub fn capture_to_file(&self, target: DisplayId) -> Result<PathBuf, CaptureError> {
        let path = self.next_path();
        let command = self.build_command(target, &path);
        debug!(%command, "capturing display");

        let output = match self.runner.run(&command) {
            Ok(output) => output,
            Err(e) => {
                error!(display = %target, error = %e, "screenshot tool could not run");
                discard_partial(&path);
                return Err(e.into());
            }
        };

        if !output.success() {
            error!(
                display = %target,
                code = ?output.exit_code,
                output = %output.output.trim(),
                "screenshot tool failed"
            );
            discard_partial(&path);
            return Err(CaptureError::Subprocess {
                tool: self.settings.tool.clone(),
                code: output.exit_code,
                output: output.output,
            });
        }

        info!(display = %target, path = %path.display(), "screenshot saved");
        Ok(path)
    }

    fn build_command(&self, target: DisplayId, path: &Path) -> ShellCommand {
        let mut command = ShellCommand::new(&self.settings.tool);
        if target.is_secondary() {
            command = command.arg("-d").arg(target.to_string());
        }
        command.arg("-p").arg(path.to_string_lossy())
    }

    fn next_path(&self) -> PathBuf {
        let stamp = self.next_stamp(unix_millis());
        self.settings
            .dir
            .join(format!("{}{}.png", self.settings.prefix, stamp))
    }

    /// Returns `now`, or one past the previous stamp if that is later.
    fn next_stamp(&self, now: u64) -> u64 {
        let previous = self
            .last_stamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| {
                Some(now.max(prev.saturating_add(1)))
            })
            .unwrap_or_else(|prev| prev);
        now.max(previous.saturating_add(1))
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn discard_partial(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed partial capture"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove partial capture"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::command::CommandOutput;
    use std::sync::Mutex;

    /// Writes a file at the `-p` path (like a real tool that fails midway)
    /// and exits with a fixed status.
    struct WritingRunner {
        exit_code: i32,
        commands: Mutex<Vec<ShellCommand>>,
    }

    impl WritingRunner {
        fn new(exit_code: i32) -> Self {
            Self {
                exit_code,
                commands: Mutex::new(Vec::new()),
            }
        }
    }

    impl CommandRunner for WritingRunner {
        fn run(&self, command: &ShellCommand) -> Result<CommandOutput, ShellError> {
            self.commands.lock().unwrap().push(command.clone());
            let args = command.arguments();
            if let Some(pos) = args.iter().position(|a| a == "-p") {
                std::fs::write(&args[pos + 1], b"\x89PNG").expect("write fake png");
            }
            let output = if self.exit_code == 0 { "" } else { "Error: display not found" };
            Ok(CommandOutput::new(self.exit_code, output))
        }
    }

    fn capture_in(dir: &Path, runner: Arc<WritingRunner>) -> ScreenCapture {
        let settings = CaptureSettings {
            dir: dir.to_path_buf(),
            ..CaptureSettings::default()
        };
        ScreenCapture::new(runner, settings)
    }

    #[test]
    fn test_capture_default_display_omits_display_argument() {
        // Arrange
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = Arc::new(WritingRunner::new(0));
        let capture = capture_in(dir.path(), runner.clone());

        // Act
        let path = capture.capture_to_file(DisplayId::DEFAULT).expect("capture");

        // Assert
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(DEFAULT_CAPTURE_PREFIX));
        assert!(name.ends_with(".png"));
        let commands = runner.commands.lock().unwrap();
        assert_eq!(commands[0].program(), "screencap");
        assert!(!commands[0].arguments().contains(&"-d".to_string()));
    }

    #[test]
    fn test_capture_secondary_display_passes_display_argument() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = Arc::new(WritingRunner::new(0));
        let capture = capture_in(dir.path(), runner.clone());

        capture.capture_to_file(DisplayId(101)).expect("capture");

        let line = runner.commands.lock().unwrap()[0].to_string();
        assert!(line.starts_with("screencap -d 101 -p "), "got {line}");
    }

    #[test]
    fn test_failed_capture_reports_exit_code_and_leaves_no_file() {
        // Arrange
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = Arc::new(WritingRunner::new(1));
        let capture = capture_in(dir.path(), runner);

        // Act
        let result = capture.capture_to_file(DisplayId(999));

        // Assert
        match result {
            Err(CaptureError::Subprocess { code, output, .. }) => {
                assert_eq!(code, Some(1));
                assert!(output.contains("display not found"));
            }
            other => panic!("expected subprocess error, got {other:?}"),
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_rapid_captures_get_distinct_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = Arc::new(WritingRunner::new(0));
        let capture = capture_in(dir.path(), runner);

        let first = capture.capture_to_file(DisplayId::DEFAULT).expect("capture");
        let second = capture.capture_to_file(DisplayId::DEFAULT).expect("capture");

        assert_ne!(first, second);
    }

    #[test]
    fn test_next_stamp_is_strictly_increasing_for_equal_clock() {
        let capture = ScreenCapture::new(
            Arc::new(WritingRunner::new(0)),
            CaptureSettings::default(),
        );

        let a = capture.next_stamp(1_000);
        let b = capture.next_stamp(1_000);
        let c = capture.next_stamp(999);

        assert_eq!(a, 1_000);
        assert_eq!(b, 1_001);
        assert_eq!(c, 1_002);
    }

    #[test]
    fn test_capture_logs_the_target_display() {
        // Arrange
        let dir = tempfile::tempdir().expect("tempdir");
        let capture = capture_in(dir.path(), Arc::new(WritingRunner::new(0)));

        // Act
        let (result, log) =
            crate::infrastructure::capture_logs(|| capture.capture_to_file(DisplayId(101)));

        // Assert
        assert!(result.is_ok());
        assert!(log.contains("screenshot saved display=101"), "log was {log}");
    }
}
