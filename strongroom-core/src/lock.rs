//! Advisory whole-store lock. The engine assumes a single writer; this keeps
//! two `backup` invocations against the same store from racing each other.

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use nix::fcntl::{flock, FlockArg};

use crate::error::{Result, StrongroomError};

/// Holds the lock for as long as it is alive; the store unlocks on drop.
pub struct StoreLock {
    _file: File,
}

impl StoreLock {
    /// Acquire an exclusive, non-blocking lock on `<store>/.lock`, creating
    /// the store directory and the lock file if needed.
    pub fn acquire(store: &Path) -> Result<Self> {
        std::fs::create_dir_all(store)?;
        let path: PathBuf = store.join(".lock");

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&path)?;

        flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock)
            .map_err(|_| StrongroomError::StoreLocked(store.display().to_string()))?;

        Ok(Self { _file: file })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = flock(self._file.as_raw_fd(), FlockArg::Unlock);
    }
}
