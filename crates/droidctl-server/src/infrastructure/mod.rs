//! Infrastructure layer for droidctl.
//!
//! Contains the adapters the application layer's traits are implemented by:
//! subprocess execution, the input manager, the display server, and config
//! file loading.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `droidctl_core`, but MUST NOT be imported by the `application` layer
//! outside of tests.
//!
//! # Sub-modules
//!
//! - **`shell`** – `SystemShell` runs real processes under a timeout;
//!   `MockShell` records them instead.
//!
//! - **`input_manager`** – `AndroidInputBackend` resolves injection through
//!   the device's `input` tool.  A recording mock is provided for tests.
//!
//! - **`display_server`** – `OverlayDisplayServer` creates virtual displays as
//!   overlay displays.  An in-memory mock is provided for tests.
//!
//! - **`storage`** – TOML configuration loading.

pub mod display_server;
pub mod input_manager;
pub mod shell;
pub mod storage;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks `mutex`, recovering the guard if a panicking thread poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs `f` under a subscriber that records every event, returning the
/// formatted log next to `f`'s result.
#[cfg(test)]
pub(crate) fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    use std::io;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Buffer {
        fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
            lock(&self.0).extend_from_slice(bytes);
            Ok(bytes.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let buffer = Buffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    let log = String::from_utf8_lossy(&lock(&buffer.0)).into_owned();
    (result, log)
}
