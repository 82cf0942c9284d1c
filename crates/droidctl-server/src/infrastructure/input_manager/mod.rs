//! Input manager backends.
//!
//! - **`android`** – Drives the device's `input` tool.
//! - **`mock`** – Records probes and events; used by tests and `--dry-run`.

pub mod android;
pub mod mock;

pub use android::AndroidInputBackend;
