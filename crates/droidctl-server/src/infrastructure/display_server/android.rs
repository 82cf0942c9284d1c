//! Display server backed by Android overlay displays.
//!
//! # Overlay displays (for beginners)
//!
//! The global setting `overlay_display_devices` holds a `;`-separated list
//! of entries such as `1080x1920/240` or `1080x1920/240,secure`.  The system
//! creates one virtual display per entry and tears it down when the entry
//! disappears.  Creating a display is therefore "append an entry" and
//! destroying one is "remove that entry".  The entry string itself serves as
//! the [`DisplayToken`].
//!
//! Every change is a read-modify-write of one setting, so all changes made
//! through one `OverlayDisplayServer` are serialized by a mutex.
//!
//! # Display ids
//!
//! The system numbers overlay devices by their 1-based position in the
//! setting and gives each the unique id `overlay:<n>`.  It rebuilds every
//! overlay display whenever the setting changes, so the OS display id of an
//! entry can change after any create or destroy.  The OS id is therefore
//! looked up on demand from `dumpsys display`, matching the `uniqueId` in each
//! logical display's `DisplayInfo` line.  Two entries with the same
//! geometry share a token and resolve to the later one.

use std::sync::{Arc, Mutex};

use droidctl_core::{DisplayId, DisplaySpec, DisplayToken};
use tracing::{debug, info};

use crate::application::command::{CommandRunner, ShellCommand};
use crate::application::manage_displays::{DisplayServer, DisplayServerError};
use crate::infrastructure::lock;

pub const OVERLAY_SETTING: &str = "overlay_display_devices";

/// Formats the overlay entry for `spec`.
pub fn overlay_entry(spec: &DisplaySpec, secure: bool) -> String {
    let mut entry = format!("{}x{}/{}", spec.width, spec.height, spec.density);
    if secure {
        entry.push_str(",secure");
    }
    entry
}

/// Finds the display id of overlay device `number` in `dumpsys display`
/// output.
pub fn parse_overlay_display_id(dump: &str, number: usize) -> Option<DisplayId> {
    let unique_id = format!("uniqueId \"overlay:{number}\"");
    dump.lines()
        .filter(|line| line.contains(&unique_id))
        .find_map(|line| {
            let start = line.find("displayId ")? + "displayId ".len();
            let digits: String = line[start..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            digits.parse().ok().map(DisplayId)
        })
}

/// Creates displays by editing `overlay_display_devices`.
pub struct OverlayDisplayServer {
    runner: Arc<dyn CommandRunner>,
    edit: Mutex<()>,
}

impl OverlayDisplayServer {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            edit: Mutex::new(()),
        }
    }

    fn settings(&self, verb: &str) -> ShellCommand {
        ShellCommand::new("settings")
            .arg(verb)
            .arg("global")
            .arg(OVERLAY_SETTING)
    }

    fn read_entries(&self) -> Result<Vec<String>, DisplayServerError> {
        let output = self.runner.run(&self.settings("get"))?;
        if !output.success() {
            return Err(DisplayServerError::Rejected(output.output.trim().to_string()));
        }
        let value = output.output.trim();
        if value.is_empty() || value == "null" {
            return Ok(Vec::new());
        }
        Ok(value
            .split(';')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn write_entries(&self, entries: &[String]) -> Result<(), DisplayServerError> {
        let command = if entries.is_empty() {
            self.settings("delete")
        } else {
            self.settings("put").arg(entries.join(";"))
        };
        debug!(%command, "updating overlay displays");
        let output = self.runner.run(&command)?;
        if !output.success() {
            return Err(DisplayServerError::Rejected(output.output.trim().to_string()));
        }
        Ok(())
    }
}

impl DisplayServer for OverlayDisplayServer {
    fn create_display(
        &self,
        spec: &DisplaySpec,
        secure: bool,
    ) -> Result<DisplayToken, DisplayServerError> {
        let entry = overlay_entry(spec, secure);
        let _edit = lock(&self.edit);

        let mut entries = self.read_entries()?;
        entries.push(entry.clone());
        self.write_entries(&entries)?;

        info!(entry = %entry, name = %spec.name, "overlay display added");
        Ok(DisplayToken::new(entry))
    }

    fn destroy_display(&self, token: &DisplayToken) -> Result<(), DisplayServerError> {
        let _edit = lock(&self.edit);

        let mut entries = self.read_entries()?;
        // Remove the newest matching entry so older displays keep their slots.
        let Some(position) = entries.iter().rposition(|e| e == token.as_str()) else {
            return Err(DisplayServerError::UnknownToken(token.as_str().to_string()));
        };
        entries.remove(position);
        self.write_entries(&entries)?;

        info!(entry = %token.as_str(), "overlay display removed");
        Ok(())
    }

    fn os_display_id(&self, token: &DisplayToken) -> Result<Option<DisplayId>, DisplayServerError> {
        let position = {
            let _edit = lock(&self.edit);
            self.read_entries()?
                .iter()
                .rposition(|e| e == token.as_str())
        };
        let Some(position) = position else {
            return Err(DisplayServerError::UnknownToken(token.as_str().to_string()));
        };

        let output = self.runner.run(&ShellCommand::new("dumpsys").arg("display"))?;
        if !output.success() {
            return Err(DisplayServerError::Rejected(output.output.trim().to_string()));
        }
        let found = parse_overlay_display_id(&output.output, position + 1);
        if found.is_none() {
            debug!(entry = %token.as_str(), "overlay display not in dumpsys output yet");
        }
        Ok(found)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::command::CommandOutput;
    use crate::infrastructure::shell::mock::MockShell;

    /// A shell that keeps `overlay_display_devices` in memory.
    fn settings_shell() -> Arc<MockShell> {
        let value = Arc::new(Mutex::new(String::from("null")));
        Arc::new(MockShell::new().with_responder(move |command| {
            let args = command.arguments();
            let mut value = value.lock().unwrap();
            match args.first().map(String::as_str) {
                Some("get") => CommandOutput::new(0, format!("{value}\n")),
                Some("put") => {
                    *value = args[3].clone();
                    CommandOutput::new(0, "")
                }
                Some("delete") => {
                    *value = "null".to_string();
                    CommandOutput::new(0, "Deleted 1 rows\n")
                }
                _ => CommandOutput::new(1, "unknown verb"),
            }
        }))
    }

    fn spec() -> DisplaySpec {
        DisplaySpec::new("vd", 1080, 1920, 240)
    }

    #[test]
    fn test_overlay_entry_format() {
        assert_eq!(overlay_entry(&spec(), false), "1080x1920/240");
        assert_eq!(overlay_entry(&spec(), true), "1080x1920/240,secure");
    }

    #[test]
    fn test_create_appends_entry() {
        // Arrange
        let shell = settings_shell();
        let server = OverlayDisplayServer::new(shell.clone());

        // Act
        let first = server.create_display(&spec(), false).expect("create");
        let second = server
            .create_display(&DisplaySpec::new("small", 720, 1280, 320), false)
            .expect("create");

        // Assert
        assert_eq!(first.as_str(), "1080x1920/240");
        assert_eq!(second.as_str(), "720x1280/320");
        let lines = shell.recorded_lines();
        assert_eq!(
            lines.last().map(String::as_str),
            Some("settings put global overlay_display_devices 1080x1920/240;720x1280/320")
        );
    }

    #[test]
    fn test_destroy_last_entry_deletes_setting() {
        let shell = settings_shell();
        let server = OverlayDisplayServer::new(shell.clone());
        let token = server.create_display(&spec(), false).expect("create");

        server.destroy_display(&token).expect("destroy");

        assert_eq!(
            shell.recorded_lines().last().map(String::as_str),
            Some("settings delete global overlay_display_devices")
        );
    }

    #[test]
    fn test_destroy_removes_only_one_of_two_identical_entries() {
        let shell = settings_shell();
        let server = OverlayDisplayServer::new(shell.clone());
        let token = server.create_display(&spec(), false).expect("create");
        server.create_display(&spec(), false).expect("create");

        server.destroy_display(&token).expect("destroy");

        assert_eq!(
            shell.recorded_lines().last().map(String::as_str),
            Some("settings put global overlay_display_devices 1080x1920/240")
        );
    }

    #[test]
    fn test_destroy_unknown_token_fails() {
        let shell = settings_shell();
        let server = OverlayDisplayServer::new(shell);

        let result = server.destroy_display(&DisplayToken::new("1x1/1"));

        assert!(matches!(result, Err(DisplayServerError::UnknownToken(_))));
    }

    #[test]
    fn test_settings_failure_is_rejected() {
        let server = OverlayDisplayServer::new(Arc::new(MockShell::failing(255)));

        let result = server.create_display(&spec(), false);

        assert!(matches!(result, Err(DisplayServerError::Rejected(_))));
    }

    const DUMPSYS: &str = "Logical Displays: size=3\n\
  Display 0:\n\
    mDisplayId=0\n\
    mBaseDisplayInfo=DisplayInfo{\"Built-in Screen\", displayId 0, displayGroupId 0, real 1080 x 2400, uniqueId \"local:4619827259835644672\", app 1080 x 2400}\n\
  Display 2:\n\
    mDisplayId=2\n\
    mBaseDisplayInfo=DisplayInfo{\"Overlay #1\", displayId 2, displayGroupId 2, real 1080 x 1920, uniqueId \"overlay:1\", app 1080 x 1920}\n\
  Display 3:\n\
    mDisplayId=3\n\
    mBaseDisplayInfo=DisplayInfo{\"Overlay #2\", displayId 3, displayGroupId 3, real 720 x 1280, uniqueId \"overlay:2\", app 720 x 1280}\n";

    #[test]
    fn test_parse_overlay_display_id_matches_unique_id() {
        assert_eq!(parse_overlay_display_id(DUMPSYS, 1), Some(DisplayId(2)));
        assert_eq!(parse_overlay_display_id(DUMPSYS, 2), Some(DisplayId(3)));
        assert_eq!(parse_overlay_display_id(DUMPSYS, 3), None);
        assert_eq!(parse_overlay_display_id("", 1), None);
    }

    #[test]
    fn test_os_display_id_follows_entry_position() {
        // Arrange
        let overlays = Arc::new(Mutex::new(String::from("1080x1920/240;720x1280/320")));
        let shell = Arc::new(MockShell::new().with_responder(move |command| {
            match command.program() {
                "dumpsys" => CommandOutput::new(0, DUMPSYS),
                _ => CommandOutput::new(0, format!("{}\n", overlays.lock().unwrap())),
            }
        }));
        let server = OverlayDisplayServer::new(shell.clone());

        // Act
        let second = server.os_display_id(&DisplayToken::new("720x1280/320"));
        let unknown = server.os_display_id(&DisplayToken::new("1x1/1"));

        // Assert
        assert_eq!(second.expect("lookup"), Some(DisplayId(3)));
        assert!(matches!(unknown, Err(DisplayServerError::UnknownToken(_))));
        assert!(shell.recorded_lines().contains(&"dumpsys display".to_string()));
    }
}
