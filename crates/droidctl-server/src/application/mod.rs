//! Application layer for droidctl.
//!
//! # What lives here?
//!
//! - **`command`** – The subprocess port.  Every component that shells out
//!   holds an `Arc<dyn CommandRunner>`; the real runner and a recording mock
//!   live in the infrastructure layer.
//!
//! - **`resolve_capability`** – Finds the input manager's injection entry
//!   point once per process, probing the signatures in version-gated order.
//!
//! - **`inject_input`** – Builds touch and key events and injects them
//!   through the resolved entry point.
//!
//! - **`manage_displays`** – Creates, tracks and destroys virtual displays.
//!
//! - **`capture_screen`** – Writes PNG screenshots of a display.
//!
//! - **`launch_activity`** – Starts an app on a display.
//!
//! - **`shell_input`** – Text entry and display-addressed keys through the
//!   `input` tool.
//!
//! - **`bridge`** – `DeviceBridge`, the facade that owns one of each of the
//!   above for the lifetime of the process.

pub mod bridge;
pub mod capture_screen;
pub mod command;
pub mod inject_input;
pub mod launch_activity;
pub mod manage_displays;
pub mod resolve_capability;
pub mod shell_input;
