//! droidctl: command-line front end for the device bridge.
//!
//! Each subcommand runs one bridge operation and prints one JSON object on
//! stdout.  Logs go to stderr.
//!
//! # Usage
//!
//! ```text
//! droidctl [--config <FILE>] [--dry-run] <COMMAND>
//!
//! Commands:
//!   touch           Inject a touch event
//!   key             Press a key on the focused display
//!   key-on-display  Press a key on a specific display
//!   home / back     Press HOME / BACK on a display
//!   text            Type text
//!   capture         Save a screenshot
//!   display         create | release | list virtual displays (session only)
//!   launch          Start an app on a display
//!   ping            Liveness check
//!   session         Read commands from stdin, one per line
//! ```
//!
//! # Sessions
//!
//! Virtual displays belong to the process that created them and are released
//! when it exits, so `display` commands only make sense inside
//! `droidctl session`.  A session reads one command per line (same syntax as
//! the subcommands, without the program name), answers each with one JSON
//! line, and releases any remaining displays at end of input.  Words are
//! split the way a shell splits them, so `--name "my display"` and
//! `text 'a  b'` keep their spaces.
//!
//! # Environment variables
//!
//! | Variable          | Description                                   |
//! |-------------------|-----------------------------------------------|
//! | `DROIDCTL_CONFIG` | Config file path (same as `--config`)         |
//! | `RUST_LOG`        | Log filter; overrides `[logging] level`       |

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use droidctl_core::{DisplayId, InjectSignature, KeyCode, MotionAction, SdkLevel};
use droidctl_server::application::bridge::{BridgeBackends, DeviceBridge};
use droidctl_server::application::command::CommandRunner;
use droidctl_server::infrastructure::display_server::mock::MockDisplayServer;
use droidctl_server::infrastructure::display_server::OverlayDisplayServer;
use droidctl_server::infrastructure::input_manager::mock::{MockInputBackend, MockInputManager};
use droidctl_server::infrastructure::input_manager::AndroidInputBackend;
use droidctl_server::infrastructure::shell::mock::MockShell;
use droidctl_server::infrastructure::shell::SystemShell;
use droidctl_server::infrastructure::storage::config::{load_optional, ServerConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Privileged device control for Android automation.
#[derive(Debug, Parser)]
#[command(
    name = "droidctl",
    about = "Input injection, screen capture and virtual displays for Android",
    version
)]
struct Cli {
    /// TOML config file.  Missing files fall back to defaults.
    #[arg(long, global = true, env = "DROIDCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Use in-memory backends and log commands instead of running them.
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

/// One line of a session.
#[derive(Debug, Parser)]
#[command(name = "droidctl", no_binary_name = true)]
struct SessionLine {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Inject a touch event.
    Touch {
        /// DOWN, UP, MOVE or CANCEL (or the numeric action code).
        action: MotionAction,
        x: f32,
        y: f32,
        #[arg(short, long, default_value_t = 0)]
        display: i32,
    },

    /// Press a key (down then up) on the focused display.
    Key {
        /// Key code number or name (`back`, `KEYCODE_HOME`, `66`).
        key: KeyCode,
    },

    /// Press a key on a specific display.
    KeyOnDisplay {
        key: KeyCode,
        #[arg(short, long)]
        display: i32,
    },

    /// Press HOME.
    Home {
        #[arg(short, long, default_value_t = 0)]
        display: i32,
    },

    /// Press BACK.
    Back {
        #[arg(short, long, default_value_t = 0)]
        display: i32,
    },

    /// Type text into the focused field.
    Text {
        #[arg(short, long, default_value_t = 0)]
        display: i32,
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },

    /// Save a PNG screenshot and print its path.
    Capture {
        #[arg(short, long, default_value_t = 0)]
        display: i32,
    },

    /// Manage virtual displays.
    Display {
        #[command(subcommand)]
        action: DisplayCommand,
    },

    /// Start an app (`package/.Activity` or a bare package) on a display.
    Launch {
        component: String,
        #[arg(short, long)]
        display: i32,
    },

    /// Liveness check.
    Ping,

    /// Read commands from stdin until end of input.
    Session,
}

#[derive(Debug, Subcommand)]
enum DisplayCommand {
    /// Create a virtual display and print its id.
    Create {
        width: u32,
        height: u32,
        density: u32,
        /// Display name; a random one is generated when omitted.
        #[arg(long)]
        name: Option<String>,
    },

    /// Destroy a virtual display.
    Release { id: i32 },

    /// List live virtual displays.
    List,
}

// ── Bridge construction ───────────────────────────────────────────────────────

fn build_bridge(config: &ServerConfig, dry_run: bool) -> anyhow::Result<DeviceBridge> {
    let backends = if dry_run {
        let manager = Arc::new(MockInputManager::new(&[
            InjectSignature::WithTargetUid,
            InjectSignature::Legacy,
        ]));
        let sdk = config.sdk_override().unwrap_or(SdkLevel::UPSIDE_DOWN_CAKE);
        BridgeBackends {
            input: Arc::new(MockInputBackend::new(sdk, manager)),
            displays: Arc::new(MockDisplayServer::new()),
            runner: Arc::new(MockShell::echoing()),
        }
    } else {
        let shell = SystemShell::new(config.shell_timeout())
            .context("failed to start subprocess runtime")?;
        let runner: Arc<dyn CommandRunner> = Arc::new(shell);
        BridgeBackends {
            input: Arc::new(AndroidInputBackend::new(
                Arc::clone(&runner),
                config.input.tool.clone(),
                config.sdk_override(),
            )),
            displays: Arc::new(OverlayDisplayServer::new(Arc::clone(&runner))),
            runner,
        }
    };
    Ok(DeviceBridge::new(backends, config.bridge_settings()))
}

// ── Command execution ─────────────────────────────────────────────────────────

fn failure(command: &str, error: impl std::fmt::Display) -> Value {
    json!({ "ok": false, "command": command, "error": error.to_string() })
}

/// Runs one command and returns its JSON reply.  `in_session` gates the
/// commands that only make sense in a long-lived process.
fn execute(bridge: &DeviceBridge, command: Command, in_session: bool) -> Value {
    match command {
        Command::Touch {
            action,
            x,
            y,
            display,
        } => match bridge.inject_touch(DisplayId(display), action, x, y) {
            Ok(outcome) => json!({
                "ok": outcome.delivered,
                "command": "touch",
                "delivered": outcome.delivered,
                "display_targeted": outcome.flags.display_targeted,
            }),
            Err(e) => failure("touch", e),
        },
        Command::Key { key } => match bridge.inject_key(key) {
            Ok(delivered) => json!({ "ok": delivered, "command": "key", "delivered": delivered }),
            Err(e) => failure("key", e),
        },
        Command::KeyOnDisplay { key, display } => {
            key_reply("key-on-display", bridge.press_key_on_display(DisplayId(display), key))
        }
        Command::Home { display } => key_reply("home", bridge.press_home(DisplayId(display))),
        Command::Back { display } => key_reply("back", bridge.press_back(DisplayId(display))),
        Command::Text { display, text } => {
            match bridge.input_text(DisplayId(display), &text.join(" ")) {
                Ok(()) => json!({ "ok": true, "command": "text" }),
                Err(e) => failure("text", e),
            }
        }
        Command::Capture { display } => match bridge.capture_to_file(DisplayId(display)) {
            Ok(path) => json!({ "ok": true, "command": "capture", "path": path }),
            Err(e) => failure("capture", e),
        },
        Command::Display { .. } if !in_session => failure(
            "display",
            "virtual displays are released when the process exits; use `droidctl session`",
        ),
        Command::Display { action } => execute_display(bridge, action),
        Command::Launch { component, display } => {
            match bridge.start_activity_on_display(DisplayId(display), &component) {
                Ok(mode) => json!({ "ok": true, "command": "launch", "mode": mode }),
                Err(e) => failure("launch", e),
            }
        }
        Command::Ping => json!({ "ok": bridge.ping(), "command": "ping" }),
        Command::Session => failure("session", "sessions cannot be nested"),
    }
}

fn key_reply<E: std::fmt::Display>(command: &str, result: Result<bool, E>) -> Value {
    match result {
        Ok(delivered) => json!({ "ok": delivered, "command": command, "delivered": delivered }),
        Err(e) => failure(command, e),
    }
}

fn execute_display(bridge: &DeviceBridge, action: DisplayCommand) -> Value {
    match action {
        DisplayCommand::Create {
            width,
            height,
            density,
            name,
        } => {
            let name = name.unwrap_or_else(|| format!("droidctl-{}", Uuid::new_v4()));
            match bridge.create_virtual_display(&name, width, height, density) {
                Ok(id) => json!({ "ok": true, "command": "display create", "id": id, "name": name }),
                Err(e) => failure("display create", e),
            }
        }
        DisplayCommand::Release { id } => match bridge.release_virtual_display(DisplayId(id)) {
            Ok(()) => json!({ "ok": true, "command": "display release", "id": id }),
            Err(e) => failure("display release", e),
        },
        DisplayCommand::List => {
            let displays: Vec<Value> = bridge
                .active_displays()
                .into_iter()
                .map(|d| {
                    json!({
                        "id": d.id,
                        "name": d.spec.name,
                        "width": d.spec.width,
                        "height": d.spec.height,
                        "density": d.spec.density,
                    })
                })
                .collect();
            json!({ "ok": true, "command": "display list", "displays": displays })
        }
    }
}

fn is_ok(reply: &Value) -> bool {
    reply.get("ok").and_then(Value::as_bool).unwrap_or(false)
}

fn emit(out: &mut impl Write, reply: &Value) -> io::Result<()> {
    writeln!(out, "{reply}")?;
    out.flush()
}

#[derive(Debug, PartialEq, Eq, Error)]
enum SplitError {
    #[error("unterminated {0} quote")]
    UnterminatedQuote(&'static str),

    #[error("line ends with a backslash")]
    TrailingBackslash,
}

/// Splits a session line into words like a POSIX shell does for plain
/// arguments.  Whitespace separates words.  Single quotes are literal.
/// Inside double quotes only `\"` and `\\` are escapes.  Outside quotes a
/// backslash takes the next character literally.
fn split_line(line: &str) -> Result<Vec<String>, SplitError> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => word.push(ch),
                        None => return Err(SplitError::UnterminatedQuote("single")),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(ch @ ('"' | '\\')) => word.push(ch),
                            Some(ch) => {
                                word.push('\\');
                                word.push(ch);
                            }
                            None => return Err(SplitError::UnterminatedQuote("double")),
                        },
                        Some(ch) => word.push(ch),
                        None => return Err(SplitError::UnterminatedQuote("double")),
                    }
                }
            }
            '\\' => {
                in_word = true;
                word.push(chars.next().ok_or(SplitError::TrailingBackslash)?);
            }
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                word.push(c);
            }
        }
    }
    if in_word {
        words.push(word);
    }
    Ok(words)
}

/// Answers one command per input line until end of input or `exit`, then
/// releases any displays the session left behind.
fn run_session(bridge: &DeviceBridge, input: impl BufRead, out: &mut impl Write) -> io::Result<()> {
    info!("session started");
    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        let reply = match split_line(line) {
            Ok(words) => match SessionLine::try_parse_from(words) {
                Ok(parsed) => execute(bridge, parsed.command, true),
                Err(e) => failure(line, e.to_string().trim_end()),
            },
            Err(e) => failure(line, e),
        };
        emit(out, &reply)?;
    }

    let released = bridge.shutdown();
    info!(released, "session ended");
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn init_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = load_optional(cli.config.as_deref()).context("failed to load configuration")?;
    init_logging(&config.logging.level);
    if cli.dry_run {
        warn!("dry run: no device commands will be executed");
    }

    let bridge = build_bridge(&config, cli.dry_run)?;
    let mut stdout = io::stdout().lock();

    match cli.command {
        Command::Session => {
            run_session(&bridge, io::stdin().lock(), &mut stdout)
                .context("session I/O failed")?;
            Ok(ExitCode::SUCCESS)
        }
        command => {
            let reply = execute(&bridge, command, false);
            emit(&mut stdout, &reply).context("failed to write reply")?;
            Ok(if is_ok(&reply) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("droidctl: {e:#}");
            ExitCode::FAILURE
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
