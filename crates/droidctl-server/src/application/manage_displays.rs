//! VirtualDisplayManager: owns every virtual display this process created.
//!
//! # Lifecycle (for beginners)
//!
//! ```text
//!   create(spec) ──► DisplayServer::create_display ──► token
//!                                                        │
//!                    allocate id (counter) ◄─────────────┘
//!                    registry[id] = (spec, token)
//!
//!   release(id)  ──► registry.remove(id) ──► DisplayServer::destroy_display(token)
//! ```
//!
//! The registry maps the externally visible [`DisplayId`] to the backend
//! [`DisplayToken`].  Identifiers come from a monotonic counter and are never
//! reused, so a stale identifier fails with [`DisplayError::NotFound`] instead
//! of hitting somebody else's display.
//!
//! The registry identifier is not necessarily the id the OS gave the surface.
//! [`VirtualDisplayManager::os_target`] asks the display server for the
//! current OS id whenever a command is about to address a virtual display.
//!
//! Removal from the registry happens under the lock, and the display server is
//! called *after* the lock is dropped.  Two concurrent `release` calls for one
//! identifier therefore produce exactly one destroy call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use droidctl_core::{DisplayId, DisplaySpec, DisplaySpecError, DisplayToken};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::command::ShellError;

/// First identifier handed out when nothing else is configured.
pub const DEFAULT_ID_BASE: i32 = 100;

/// Lowest usable base.  Zero is the default display and negative ids are
/// never valid displays.
pub const MIN_ID_BASE: i32 = 1;

/// Error type for display server backends.
#[derive(Debug, Error)]
pub enum DisplayServerError {
    #[error(transparent)]
    Shell(#[from] ShellError),

    /// The backend ran but refused the request.
    #[error("display server rejected the request: {0}")]
    Rejected(String),

    /// The token does not name a surface the backend knows about.
    #[error("unknown display token: {0}")]
    UnknownToken(String),
}

/// Creates and destroys virtual display surfaces.
pub trait DisplayServer: Send + Sync {
    /// Creates one surface.  `secure` requests a display that may show
    /// secure-flagged windows.
    ///
    /// # Errors
    ///
    /// Returns [`DisplayServerError`] if the surface could not be created.
    fn create_display(
        &self,
        spec: &DisplaySpec,
        secure: bool,
    ) -> Result<DisplayToken, DisplayServerError>;

    /// Destroys a surface created by [`create_display`](Self::create_display).
    ///
    /// # Errors
    ///
    /// Returns [`DisplayServerError`] if the surface could not be destroyed.
    fn destroy_display(&self, token: &DisplayToken) -> Result<(), DisplayServerError>;

    /// Looks up the id the OS currently uses for the surface behind `token`.
    /// `Ok(None)` means the backend cannot tell.
    ///
    /// # Errors
    ///
    /// Returns [`DisplayServerError`] if the lookup itself failed.
    fn os_display_id(&self, token: &DisplayToken) -> Result<Option<DisplayId>, DisplayServerError> {
        let _ = token;
        Ok(None)
    }
}

/// Error type for display management.
#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("invalid display spec: {0}")]
    InvalidSpec(#[from] DisplaySpecError),

    #[error("virtual display {0} not found")]
    NotFound(DisplayId),

    #[error("failed to create virtual display: {0}")]
    Create(#[source] DisplayServerError),

    #[error("failed to destroy virtual display {id}: {source}")]
    Destroy {
        id: DisplayId,
        #[source]
        source: DisplayServerError,
    },

    #[error("virtual display identifiers exhausted")]
    IdsExhausted,
}

/// One live virtual display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveDisplay {
    pub id: DisplayId,
    pub spec: DisplaySpec,
    token: DisplayToken,
}

impl ActiveDisplay {
    pub fn token(&self) -> &DisplayToken {
        &self.token
    }
}

/// Registry of virtual displays created by this process.
pub struct VirtualDisplayManager {
    server: Arc<dyn DisplayServer>,
    next_id: AtomicI32,
    registry: Mutex<HashMap<DisplayId, ActiveDisplay>>,
}

impl VirtualDisplayManager {
    /// Creates an empty manager whose first identifier will be `id_base`.
    ///
    /// A base below [`MIN_ID_BASE`] would hand out the default display's id
    /// or an invalid one, so it is raised to [`MIN_ID_BASE`].
    pub fn new(server: Arc<dyn DisplayServer>, id_base: i32) -> Self {
        let id_base = if id_base < MIN_ID_BASE {
            warn!(id_base, "display id base too low, using {MIN_ID_BASE}");
            MIN_ID_BASE
        } else {
            id_base
        };
        Self {
            server,
            next_id: AtomicI32::new(id_base),
            registry: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a non-secure virtual display and registers it.
    ///
    /// An identifier is only consumed once the display server has succeeded.
    ///
    /// # Errors
    ///
    /// - [`DisplayError::InvalidSpec`] for an empty name or zero dimension.
    /// - [`DisplayError::Create`] if the display server fails.
    /// - [`DisplayError::IdsExhausted`] if the counter has run out.  The new
    ///   surface is destroyed again in that case.
    pub fn create(&self, spec: &DisplaySpec) -> Result<DisplayId, DisplayError> {
        spec.validate()?;

        let token = self.server.create_display(spec, false).map_err(|e| {
            error!(name = %spec.name, error = %e, "virtual display creation failed");
            DisplayError::Create(e)
        })?;

        let Some(id) = self.allocate_id() else {
            error!(name = %spec.name, "virtual display identifiers exhausted");
            if let Err(e) = self.server.destroy_display(&token) {
                error!(error = %e, "failed to destroy unregistered display");
            }
            return Err(DisplayError::IdsExhausted);
        };

        self.registry().insert(
            id,
            ActiveDisplay {
                id,
                spec: spec.clone(),
                token,
            },
        );
        info!(
            display = %id,
            name = %spec.name,
            width = spec.width,
            height = spec.height,
            density = spec.density,
            "virtual display created"
        );
        Ok(id)
    }

    /// Destroys the display registered under `id` and forgets it.
    ///
    /// # Errors
    ///
    /// - [`DisplayError::NotFound`] if `id` is not registered (including a
    ///   second release of the same id).  The display server is not called.
    /// - [`DisplayError::Destroy`] if the display server fails.  The id is
    ///   already unregistered at that point.
    pub fn release(&self, id: DisplayId) -> Result<(), DisplayError> {
        let removed = self.registry().remove(&id);
        let Some(active) = removed else {
            warn!(display = %id, "release of unknown virtual display");
            return Err(DisplayError::NotFound(id));
        };

        self.server.destroy_display(&active.token).map_err(|source| {
            error!(display = %id, error = %source, "virtual display destruction failed");
            DisplayError::Destroy { id, source }
        })?;

        info!(display = %id, name = %active.spec.name, "virtual display released");
        Ok(())
    }

    /// Releases every registered display.  Returns one result per display,
    /// in identifier order.
    pub fn release_all(&self) -> Vec<(DisplayId, Result<(), DisplayError>)> {
        self.active_ids()
            .into_iter()
            .map(|id| (id, self.release(id)))
            .collect()
    }

    /// Registered identifiers in ascending order.
    pub fn active_ids(&self) -> Vec<DisplayId> {
        let mut ids: Vec<DisplayId> = self.registry().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Snapshot of the registered displays in identifier order.
    pub fn list(&self) -> Vec<ActiveDisplay> {
        let mut displays: Vec<ActiveDisplay> = self.registry().values().cloned().collect();
        displays.sort_unstable_by_key(|d| d.id);
        displays
    }

    /// The id OS tools should be given to address `id`.
    ///
    /// A registered virtual display is looked up through the display server.
    /// Any other id, including the default display, is returned unchanged, as
    /// is a registered one whose OS id the server cannot report.
    pub fn os_target(&self, id: DisplayId) -> DisplayId {
        let Some(token) = self.registry().get(&id).map(|d| d.token.clone()) else {
            return id;
        };
        match self.server.os_display_id(&token) {
            Ok(Some(os_id)) => {
                debug!(display = %id, os_display = %os_id, "virtual display routed");
                os_id
            }
            Ok(None) => id,
            Err(e) => {
                warn!(display = %id, error = %e, "OS display id lookup failed, using registry id");
                id
            }
        }
    }

    pub fn get(&self, id: DisplayId) -> Option<ActiveDisplay> {
        self.registry().get(&id).cloned()
    }

    pub fn is_active(&self, id: DisplayId) -> bool {
        self.registry().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.registry().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry().is_empty()
    }

    fn allocate_id(&self) -> Option<DisplayId> {
        self.next_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_add(1))
            .ok()
            .map(DisplayId)
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<DisplayId, ActiveDisplay>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for VirtualDisplayManager {
    fn drop(&mut self) {
        if self.is_empty() {
            return;
        }
        warn!(count = self.len(), "releasing virtual displays left at shutdown");
        for (id, result) in self.release_all() {
            if let Err(e) = result {
                error!(display = %id, error = %e, "failed to release display at shutdown");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    /// Records every call; creation and destruction can be made to fail.
    #[derive(Default)]
    struct RecordingServer {
        created: Mutex<Vec<(DisplaySpec, bool)>>,
        destroyed: Mutex<Vec<DisplayToken>>,
        fail_create: bool,
        fail_destroy: bool,
        /// Reported as the OS id of every surface.
        os_id: Option<i32>,
        fail_lookup: bool,
    }

    impl DisplayServer for RecordingServer {
        fn create_display(
            &self,
            spec: &DisplaySpec,
            secure: bool,
        ) -> Result<DisplayToken, DisplayServerError> {
            if self.fail_create {
                return Err(DisplayServerError::Rejected("no surfaces".to_string()));
            }
            let mut created = self.created.lock().unwrap();
            created.push((spec.clone(), secure));
            Ok(DisplayToken::new(format!("surface-{}", created.len())))
        }

        fn destroy_display(&self, token: &DisplayToken) -> Result<(), DisplayServerError> {
            self.destroyed.lock().unwrap().push(token.clone());
            if self.fail_destroy {
                return Err(DisplayServerError::Rejected("busy".to_string()));
            }
            Ok(())
        }

        fn os_display_id(
            &self,
            _token: &DisplayToken,
        ) -> Result<Option<DisplayId>, DisplayServerError> {
            if self.fail_lookup {
                return Err(DisplayServerError::Rejected("dumpsys failed".to_string()));
            }
            Ok(self.os_id.map(DisplayId))
        }
    }

    fn spec() -> DisplaySpec {
        DisplaySpec::new("vd", 1080, 1920, 240)
    }

    #[test]
    fn test_create_assigns_ids_from_base_and_registers() {
        // Arrange
        let server = Arc::new(RecordingServer::default());
        let manager = VirtualDisplayManager::new(server.clone(), DEFAULT_ID_BASE);

        // Act
        let first = manager.create(&spec()).expect("create");
        let second = manager.create(&spec()).expect("create");

        // Assert
        assert_eq!(first, DisplayId(100));
        assert_eq!(second, DisplayId(101));
        assert_eq!(manager.active_ids(), vec![first, second]);
        let created = server.created.lock().unwrap();
        assert_eq!(created.len(), 2);
        assert!(!created[0].1, "displays are created non-secure");
    }

    #[test]
    fn test_release_destroys_surface_and_unregisters() {
        let server = Arc::new(RecordingServer::default());
        let manager = VirtualDisplayManager::new(server.clone(), DEFAULT_ID_BASE);
        let id = manager.create(&spec()).expect("create");
        let token = manager.get(id).expect("registered").token().clone();

        manager.release(id).expect("release");

        assert!(!manager.is_active(id));
        assert_eq!(*server.destroyed.lock().unwrap(), vec![token]);
    }

    #[test]
    fn test_second_release_is_not_found_without_destroy_call() {
        // Arrange
        let server = Arc::new(RecordingServer::default());
        let manager = VirtualDisplayManager::new(server.clone(), DEFAULT_ID_BASE);
        let id = manager.create(&spec()).expect("create");
        manager.release(id).expect("first release");

        // Act
        let result = manager.release(id);

        // Assert
        assert!(matches!(result, Err(DisplayError::NotFound(found)) if found == id));
        assert_eq!(server.destroyed.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_release_of_never_created_id_is_not_found() {
        let server = Arc::new(RecordingServer::default());
        let manager = VirtualDisplayManager::new(server.clone(), DEFAULT_ID_BASE);

        let result = manager.release(DisplayId(999));

        assert!(matches!(result, Err(DisplayError::NotFound(DisplayId(999)))));
        assert!(server.destroyed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failed_create_consumes_no_id() {
        let failing = Arc::new(RecordingServer {
            fail_create: true,
            ..RecordingServer::default()
        });
        let manager = VirtualDisplayManager::new(failing, DEFAULT_ID_BASE);

        let result = manager.create(&spec());

        assert!(matches!(result, Err(DisplayError::Create(_))));
        assert!(manager.is_empty());
        assert_eq!(manager.allocate_id(), Some(DisplayId(DEFAULT_ID_BASE)));
    }

    #[test]
    fn test_invalid_spec_is_rejected_before_server_call() {
        let server = Arc::new(RecordingServer::default());
        let manager = VirtualDisplayManager::new(server.clone(), DEFAULT_ID_BASE);

        let result = manager.create(&DisplaySpec::new("vd", 0, 1920, 240));

        assert!(matches!(result, Err(DisplayError::InvalidSpec(_))));
        assert!(server.created.lock().unwrap().is_empty());
    }

    #[test]
    fn test_ids_are_not_reused_after_release() {
        let server = Arc::new(RecordingServer::default());
        let manager = VirtualDisplayManager::new(server, DEFAULT_ID_BASE);
        let first = manager.create(&spec()).expect("create");
        manager.release(first).expect("release");

        let second = manager.create(&spec()).expect("create");

        assert_ne!(first, second);
    }

    #[test]
    fn test_exhausted_counter_destroys_new_surface() {
        // Arrange
        let server = Arc::new(RecordingServer::default());
        let manager = VirtualDisplayManager::new(server.clone(), i32::MAX);

        // Act
        let result = manager.create(&spec());

        // Assert
        assert!(matches!(result, Err(DisplayError::IdsExhausted)));
        assert!(manager.is_empty());
        assert_eq!(server.destroyed.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_destroy_failure_still_unregisters() {
        let server = Arc::new(RecordingServer {
            fail_destroy: true,
            ..RecordingServer::default()
        });
        let manager = VirtualDisplayManager::new(server, DEFAULT_ID_BASE);
        let id = manager.create(&spec()).expect("create");

        let result = manager.release(id);

        assert!(matches!(result, Err(DisplayError::Destroy { .. })));
        assert!(!manager.is_active(id));
    }

    #[test]
    fn test_concurrent_release_destroys_exactly_once() {
        // Arrange
        let server = Arc::new(RecordingServer::default());
        let manager = Arc::new(VirtualDisplayManager::new(server.clone(), DEFAULT_ID_BASE));
        let id = manager.create(&spec()).expect("create");
        let barrier = Arc::new(Barrier::new(8));

        // Act
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    manager.release(id).is_ok()
                })
            })
            .collect();
        let successes = handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .filter(|ok| *ok)
            .count();

        // Assert
        assert_eq!(successes, 1);
        assert_eq!(server.destroyed.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_creates_get_distinct_ids() {
        let server = Arc::new(RecordingServer::default());
        let manager = Arc::new(VirtualDisplayManager::new(server, DEFAULT_ID_BASE));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                thread::spawn(move || manager.create(&spec()).expect("create"))
            })
            .collect();
        let mut ids: Vec<DisplayId> = handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .collect();
        ids.sort_unstable();
        ids.dedup();

        assert_eq!(ids.len(), 8);
        assert_eq!(manager.len(), 8);
    }

    #[test]
    fn test_drop_releases_remaining_displays() {
        let server = Arc::new(RecordingServer::default());
        {
            let manager = VirtualDisplayManager::new(server.clone(), DEFAULT_ID_BASE);
            manager.create(&spec()).expect("create");
            manager.create(&spec()).expect("create");
        }

        assert_eq!(server.destroyed.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_id_base_below_one_is_raised_past_default_display() {
        for base in [0, -1, i32::MIN] {
            // Arrange
            let server = Arc::new(RecordingServer::default());
            let manager = VirtualDisplayManager::new(server, base);

            // Act
            let id = manager.create(&spec()).expect("create");

            // Assert
            assert_eq!(id, DisplayId(MIN_ID_BASE), "base {base}");
            assert!(id.is_secondary());
            assert_ne!(id, DisplayId::DEFAULT);
        }
    }

    #[test]
    fn test_os_target_uses_server_reported_id() {
        // Arrange
        let server = Arc::new(RecordingServer {
            os_id: Some(7),
            ..RecordingServer::default()
        });
        let manager = VirtualDisplayManager::new(server, DEFAULT_ID_BASE);
        let id = manager.create(&spec()).expect("create");

        // Act / Assert
        assert_eq!(manager.os_target(id), DisplayId(7));
        assert_eq!(manager.os_target(DisplayId::DEFAULT), DisplayId::DEFAULT);
        assert_eq!(manager.os_target(DisplayId(555)), DisplayId(555));
    }

    #[test]
    fn test_os_target_falls_back_to_registry_id() {
        let silent = VirtualDisplayManager::new(Arc::new(RecordingServer::default()), 100);
        let failing = VirtualDisplayManager::new(
            Arc::new(RecordingServer {
                fail_lookup: true,
                ..RecordingServer::default()
            }),
            100,
        );
        let a = silent.create(&spec()).expect("create");
        let b = failing.create(&spec()).expect("create");

        assert_eq!(silent.os_target(a), a);
        assert_eq!(failing.os_target(b), b);
    }

    #[test]
    fn test_os_target_after_release_passes_id_through() {
        let server = Arc::new(RecordingServer {
            os_id: Some(7),
            ..RecordingServer::default()
        });
        let manager = VirtualDisplayManager::new(server, DEFAULT_ID_BASE);
        let id = manager.create(&spec()).expect("create");
        manager.release(id).expect("release");

        assert_eq!(manager.os_target(id), id);
    }
}
