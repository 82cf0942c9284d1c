//! TOML configuration for droidctl.
//!
//! The file is optional.  When it is missing every setting takes its
//! default, and any section or field left out of an existing file does too.
//! A complete file looks like:
//!
//! ```toml
//! [input]
//! sdk_override = 34              # skip `getprop ro.build.version.sdk`
//! targeted_min_sdk = 34
//! inject_mode = "async"          # "async" | "wait_for_result" | "wait_for_finish"
//! tool = "input"
//!
//! [displays]
//! id_base = 100
//!
//! [capture]
//! dir = "/data/local/tmp"
//! prefix = "droidctl_screenshot_"
//! tool = "screencap"
//!
//! [launch]
//! am_tool = "am"
//! monkey_tool = "monkey"
//!
//! [shell]
//! timeout_secs = 30
//!
//! [logging]
//! level = "info"                 # overridden by RUST_LOG
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use droidctl_core::{InjectMode, SdkLevel};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::bridge::BridgeSettings;
use crate::application::capture_screen::{
    CaptureSettings, DEFAULT_CAPTURE_DIR, DEFAULT_CAPTURE_PREFIX, DEFAULT_CAPTURE_TOOL,
};
use crate::application::launch_activity::LaunchSettings;
use crate::application::manage_displays::{DEFAULT_ID_BASE, MIN_ID_BASE};
use crate::application::resolve_capability::ResolverSettings;
use crate::application::shell_input::DEFAULT_INPUT_TOOL;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error other than "not found".
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is outside its allowed range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub input: InputConfig,
    pub displays: DisplaysConfig,
    pub capture: CaptureConfig,
    pub launch: LaunchConfig,
    pub shell: ShellConfig,
    pub logging: LoggingConfig,
}

/// Input injection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputConfig {
    /// Fixed API level; `None` queries the device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk_override: Option<u32>,
    /// First API level on which the three-argument entry point is probed.
    #[serde(default = "default_targeted_min_sdk")]
    pub targeted_min_sdk: u32,
    #[serde(default)]
    pub inject_mode: InjectMode,
    /// The `input` command-line tool.
    #[serde(default = "default_input_tool")]
    pub tool: String,
}

/// Virtual display settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplaysConfig {
    /// First identifier handed out.
    #[serde(default = "default_id_base")]
    pub id_base: i32,
}

/// Screenshot settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptureConfig {
    #[serde(default = "default_capture_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_capture_prefix")]
    pub prefix: String,
    #[serde(default = "default_capture_tool")]
    pub tool: String,
}

/// Activity launch tools.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LaunchConfig {
    #[serde(default = "default_am_tool")]
    pub am_tool: String,
    #[serde(default = "default_monkey_tool")]
    pub monkey_tool: String,
}

/// Subprocess settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShellConfig {
    /// Upper bound on any one subprocess, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_targeted_min_sdk() -> u32 {
    SdkLevel::UPSIDE_DOWN_CAKE.0
}
fn default_input_tool() -> String {
    DEFAULT_INPUT_TOOL.to_string()
}
fn default_id_base() -> i32 {
    DEFAULT_ID_BASE
}
fn default_capture_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CAPTURE_DIR)
}
fn default_capture_prefix() -> String {
    DEFAULT_CAPTURE_PREFIX.to_string()
}
fn default_capture_tool() -> String {
    DEFAULT_CAPTURE_TOOL.to_string()
}
fn default_am_tool() -> String {
    "am".to_string()
}
fn default_monkey_tool() -> String {
    "monkey".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            sdk_override: None,
            targeted_min_sdk: default_targeted_min_sdk(),
            inject_mode: InjectMode::default(),
            tool: default_input_tool(),
        }
    }
}

impl Default for DisplaysConfig {
    fn default() -> Self {
        Self {
            id_base: default_id_base(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            dir: default_capture_dir(),
            prefix: default_capture_prefix(),
            tool: default_capture_tool(),
        }
    }
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            am_tool: default_am_tool(),
            monkey_tool: default_monkey_tool(),
        }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// Component settings for [`crate::application::bridge::DeviceBridge`].
    pub fn bridge_settings(&self) -> BridgeSettings {
        BridgeSettings {
            resolver: ResolverSettings {
                targeted_min_sdk: SdkLevel(self.input.targeted_min_sdk),
                inject_mode: self.input.inject_mode,
            },
            display_id_base: self.displays.id_base,
            capture: CaptureSettings {
                dir: self.capture.dir.clone(),
                prefix: self.capture.prefix.clone(),
                tool: self.capture.tool.clone(),
            },
            launch: LaunchSettings {
                am_tool: self.launch.am_tool.clone(),
                monkey_tool: self.launch.monkey_tool.clone(),
            },
            input_tool: self.input.tool.clone(),
        }
    }

    pub fn sdk_override(&self) -> Option<SdkLevel> {
        self.input.sdk_override.map(SdkLevel)
    }

    pub fn shell_timeout(&self) -> Duration {
        Duration::from_secs(self.shell.timeout_secs)
    }

    /// Checks the values serde cannot constrain.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.displays.id_base < MIN_ID_BASE {
            return Err(ConfigError::Invalid {
                field: "displays.id_base",
                reason: format!(
                    "{} would collide with the default display; must be at least {MIN_ID_BASE}",
                    self.displays.id_base
                ),
            });
        }
        if self.shell.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "shell.timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Loads the config at `path`, returning defaults if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] if the TOML is malformed, and
/// [`ConfigError::Invalid`] if a value is out of range.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let config: ServerConfig = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ServerConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Loads from `path` if given, otherwise returns defaults.
///
/// # Errors
///
/// As for [`load_config`].
pub fn load_optional(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => Ok(ServerConfig::default()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
