use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use fs2::FileExt;

use super::{LockGuard, LockManager};
use crate::constants::LOCK_POLL_MS;
use crate::types::errors::{Error, ErrorKind, Result};

/// Advisory `flock` on `<wal>/.wal.lock`, retried every `LOCK_POLL_MS`.
#[derive(Debug)]
pub struct FileLockManager {
    path: PathBuf,
}

impl FileLockManager {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn open(&self) -> Result<File> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| Error::new(ErrorKind::Io, format!("wal lock {}: {e}", self.path.display())))
    }
}

struct WalLock {
    file: File,
    waited: Duration,
}

impl LockGuard for WalLock {
    fn waited(&self) -> Duration {
        self.waited
    }
}

impl Drop for WalLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            log::debug!("wal lock release: {e}");
        }
    }
}

impl LockManager for FileLockManager {
    fn lock_wal(&self, timeout_ms: u64) -> Result<Box<dyn LockGuard>> {
        let file = self.open()?;
        let started = Instant::now();
        let deadline = started + Duration::from_millis(timeout_ms);
        while file.try_lock_exclusive().is_err() {
            if Instant::now() >= deadline {
                return Err(Error::new(
                    ErrorKind::Io,
                    format!("wal lock {} still held after {timeout_ms}ms", self.path.display()),
                ));
            }
            std::thread::sleep(Duration::from_millis(LOCK_POLL_MS));
        }
        Ok(Box::new(WalLock {
            file,
            waited: started.elapsed(),
        }))
    }
}
