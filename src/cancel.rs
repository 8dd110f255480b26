//! Cooperative cancellation and deadlines.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Shared flag a caller flips to stop a running schedule.
///
/// Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Checked between attempts, while the validity matrix is built, and
/// between generations.
#[derive(Debug, Clone)]
pub struct RunGuard {
    cancel: CancelFlag,
    deadline: Option<Instant>,
}

impl RunGuard {
    /// A guard that expires `limit` from now, if given.
    pub fn new(cancel: CancelFlag, limit: Option<Duration>) -> Self {
        Self {
            cancel,
            deadline: limit.map(|l| Instant::now() + l),
        }
    }

    /// A guard that never trips.
    pub fn unbounded() -> Self {
        Self::new(CancelFlag::new(), None)
    }

    /// Fails with [`Error::Cancelled`] or [`Error::DeadlineExceeded`].
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(Error::DeadlineExceeded);
        }
        Ok(())
    }
}
