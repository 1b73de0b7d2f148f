//! Advisory file lock that serializes writers across processes.
//!
//! Every shell session runs its own short-lived `fdb` process, so the only
//! shared state is the database file. Writers take `flock(LOCK_EX)` on a
//! sibling `.lock` file. The lock file itself is never removed: deleting it
//! while another process holds a descriptor would let two writers lock two
//! different inodes.

use crate::store::StoreError;
use eyre::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// Interval between non-blocking lock attempts.
const RETRY_INTERVAL_MS: u64 = 30;

/// Give up waiting for the lock after this long.
const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;

/// Held exclusive lock. Released when dropped.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Lock path used for a given database file.
    pub fn path_for(db_path: &Path) -> PathBuf {
        let mut name = db_path.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Acquire the lock for `db_path`, waiting at most the default timeout.
    pub fn acquire(db_path: &Path) -> Result<Self> {
        Self::acquire_with_timeout(db_path, Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS))
    }

    /// Acquire the lock for `db_path`, waiting at most `timeout`.
    pub fn acquire_with_timeout(db_path: &Path, timeout: Duration) -> Result<Self> {
        let path = Self::path_for(db_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).wrap_err_with(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::PermissionDenied => eyre::eyre!(StoreError::PermissionDenied(path.clone())),
                _ => eyre::Report::new(e).wrap_err(format!("Failed to open lock file {}", path.display())),
            })?;

        let deadline = Instant::now() + timeout;
        loop {
            // SAFETY: the descriptor is owned by `file`, which outlives this call.
            let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
            if rc == 0 {
                log::debug!("Acquired lock {}", path.display());
                return Ok(Self { file, path });
            }

            let err = io::Error::last_os_error();
            match err.kind() {
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => {}
                _ => return Err(err).context("Failed to lock database"),
            }

            if Instant::now() >= deadline {
                log::warn!("Timed out waiting for lock {}", path.display());
                return Err(eyre::eyre!(StoreError::LockTimeout(path)));
            }
            thread::sleep(Duration::from_millis(RETRY_INTERVAL_MS));
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Closing the descriptor releases the lock too; unlocking explicitly
        // makes the release point obvious.
        unsafe {
            libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
        }
        log::debug!("Released lock {}", self.path.display());
    }
}
