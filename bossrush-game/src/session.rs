//! Thread-safe handle for hosts that share one coordinator.
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::run::RunCoordinator;

/// Cloneable handle that serializes every call on the inner coordinator.
#[derive(Debug, Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<RunCoordinator>>,
}

impl SharedSession {
    #[must_use]
    pub fn new(coordinator: RunCoordinator) -> Self {
        Self {
            inner: Arc::new(Mutex::new(coordinator)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RunCoordinator> {
        self.inner.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            log::warn!("session lock was poisoned; recovering");
            poisoned.into_inner()
        })
    }

    /// Run `f` with exclusive access to the coordinator.
    pub fn with<T>(&self, f: impl FnOnce(&mut RunCoordinator) -> T) -> T {
        f(&mut self.lock())
    }

    /// Read-only access; still takes the lock.
    pub fn inspect<T>(&self, f: impl FnOnce(&RunCoordinator) -> T) -> T {
        f(&self.lock())
    }
}
