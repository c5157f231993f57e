use std::time::Duration;

use crate::types::errors::Result;

pub mod file;

/// Held for as long as the WAL directory is locked; dropping it unlocks.
pub trait LockGuard: Send {
    /// Time spent waiting before the lock was granted.
    fn waited(&self) -> Duration;
}

/// Cross-process exclusion for check-and-create on the WAL directory.
pub trait LockManager: Send + Sync {
    /// Lock the WAL directory, giving up after `timeout_ms`.
    ///
    /// # Errors
    /// When the lock file cannot be opened or another process holds it past the deadline.
    fn lock_wal(&self, timeout_ms: u64) -> Result<Box<dyn LockGuard>>;
}
