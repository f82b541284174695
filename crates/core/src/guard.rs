//! Mutual exclusion for engine operations.
//!
//! Operations from different threads are serialized on a re-entrant lock.
//! A second operation started on the thread that already runs one (for
//! example from inside a collaborator callback) is rejected instead of
//! deadlocking.

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::Cell;

use crate::error::{EngineError, Result};

#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    /// Set while a mutating operation is in progress
    busy: ReentrantMutex<Cell<bool>>,
}

/// Proof that the current thread owns the engine for one operation.
/// Clears the busy flag when dropped, on success and failure alike.
#[must_use = "the engine is released as soon as this is dropped"]
pub struct Entered<'a> {
    guard: ReentrantMutexGuard<'a, Cell<bool>>,
}

/// Shared access for read queries. Blocks other threads' operations but
/// does not claim the busy flag.
#[must_use]
pub struct Held<'a> {
    _guard: ReentrantMutexGuard<'a, Cell<bool>>,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the engine for a mutating operation.
    ///
    /// Waits for operations on other threads. Fails with
    /// [`EngineError::ReentrancyBlocked`] when this thread is already inside one.
    pub fn enter(&self) -> Result<Entered<'_>> {
        let guard = self.busy.lock();
        if guard.replace(true) {
            return Err(EngineError::ReentrancyBlocked);
        }
        Ok(Entered { guard })
    }

    /// Serialize a read with respect to operations on other threads.
    pub fn hold(&self) -> Held<'_> {
        Held {
            _guard: self.busy.lock(),
        }
    }

    /// Whether an operation is in progress on the current thread.
    pub fn is_entered(&self) -> bool {
        self.busy.try_lock().map(|guard| guard.get()).unwrap_or(false)
    }
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        self.guard.set(false);
    }
}
