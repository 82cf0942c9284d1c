//! Display server backends.
//!
//! - **`android`** – Overlay displays via the `overlay_display_devices`
//!   global setting.
//! - **`mock`** – In-memory surfaces for tests and `--dry-run`.

pub mod android;
pub mod mock;

pub use android::OverlayDisplayServer;
