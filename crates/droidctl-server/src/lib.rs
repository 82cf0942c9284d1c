//! droidctl-server library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does droidctl do? (for beginners)
//!
//! droidctl runs on an Android device with shell-level privileges and lets
//! an automation agent drive the device without a human:
//!
//! 1. Inject touch and key events, optionally aimed at a specific display.
//! 2. Capture any display to a PNG file.
//! 3. Create off-screen virtual displays and destroy them again.
//! 4. Launch an app onto one of those displays.
//!
//! Everything OS-specific sits behind a trait (`InputBackend`,
//! `DisplayServer`, `CommandRunner`), so the same application code runs
//! against the real device or against in-memory mocks.

/// Application layer: the device-control components and their ports.
pub mod application;

/// Infrastructure layer: Android backends, subprocess runners, config.
pub mod infrastructure;
