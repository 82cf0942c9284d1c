//! Subprocess runners.
//!
//! `system` runs real processes under a timeout; `mock` records commands for
//! tests and `--dry-run`.

pub mod mock;
pub mod system;

pub use system::SystemShell;
