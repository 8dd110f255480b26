//! Per-scope mutual exclusion.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::Scope;

/// One mutex per scope.
///
/// Runs and manual assignments for the same scope are serialized; other
/// scopes proceed independently. Share one instance (via `Arc`) between
/// every component that writes placements. A scope's entry is dropped once
/// no caller holds or waits for it.
#[derive(Debug, Default)]
pub struct ScopeLocks {
    locks: Mutex<HashMap<Scope, Arc<Mutex<()>>>>,
}

impl ScopeLocks {
    /// Creates an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock of `scope`.
    pub fn with_lock<T>(&self, scope: &Scope, f: impl FnOnce() -> T) -> T {
        let lock = Arc::clone(self.locks.lock().entry(scope.clone()).or_default());
        let out = {
            let _guard = lock.lock();
            f()
        };
        self.release(scope, &lock);
        out
    }

    fn release(&self, scope: &Scope, lock: &Arc<Mutex<()>>) {
        let mut locks = self.locks.lock();
        // Clones are only taken under the table lock, so the count is stable here.
        if Arc::strong_count(lock) == 2 {
            locks.remove(scope);
        }
    }

    /// Whether `scope` is locked right now.
    pub fn is_locked(&self, scope: &Scope) -> bool {
        self.locks
            .lock()
            .get(scope)
            .is_some_and(|l| l.is_locked())
    }
}
