//! Advisory lock file that keeps a snapshot to a single open store.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::StorageError;

/// Exclusive advisory lock (`flock(2)` on Unix) guarding a snapshot file.
///
/// The lock lives in a sibling `<snapshot>.lock` file so the snapshot itself
/// can be replaced by rename while the lock is held. It is released when this
/// struct is dropped.
#[derive(Debug)]
pub struct SnapshotLock {
    _file: File,
    path: PathBuf,
}

impl SnapshotLock {
    /// Path of the lock file guarding `snapshot_path`.
    pub fn lock_path(snapshot_path: &Path) -> PathBuf {
        super::suffixed_path(snapshot_path, ".lock")
    }

    /// Take the lock for `snapshot_path` without blocking.
    ///
    /// Returns `StorageError::FileLocked` if another handle holds it.
    pub fn acquire(snapshot_path: &Path) -> Result<Self, StorageError> {
        let path = Self::lock_path(snapshot_path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        file.try_lock_exclusive()
            .map_err(|_| StorageError::FileLocked)?;

        Ok(Self { _file: file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
