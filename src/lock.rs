//! Mutual exclusion between sorting and reset passes
//!
//! The periodic trigger can fire while a previous pass is still in flight
//! (clock drift, manual invocation), so the lock flag is the authoritative
//! guard rather than the trigger mechanism. Release is tied to guard drop so
//! every exit path, including `?` propagation and panics, clears the flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Process-wide run lock shared by the sort and reset coordinators
#[derive(Debug, Clone, Default)]
pub struct RunLock {
    held: Arc<AtomicBool>,
}

impl RunLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to acquire the lock without waiting
    ///
    /// Returns `None` if another pass is active. The returned guard releases
    /// the lock when dropped.
    pub fn try_acquire(&self) -> Option<RunGuard> {
        let acquired = self
            .held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if acquired {
            trace!("Run lock acquired");
            Some(RunGuard {
                held: Arc::clone(&self.held),
            })
        } else {
            None
        }
    }

    /// Whether a pass currently holds the lock
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// Scoped ownership of the run lock
#[derive(Debug)]
pub struct RunGuard {
    held: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.held.store(false, Ordering::Release);
        trace!("Run lock released");
    }
}
