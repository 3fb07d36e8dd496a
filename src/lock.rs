//! Advisory run lock.
//! A sidecar file `.blob_backup.lock` in the log directory is held exclusively for the
//! whole run, so two scheduled invocations never probe-and-create names concurrently.
//!
//! Notes:
//! - Non-blocking: a second run fails fast with `RunLocked` instead of queueing.
//! - The lock is released when the guard is dropped (or the process dies).
//! - The file itself is left in place; deleting it would race with a waiting opener.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::trace;

use crate::errors::BackupError;

pub const LOCK_FILE_NAME: &str = ".blob_backup.lock";

/// RAII guard held while the run lock is active.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Take the exclusive run lock in `dir` without waiting.
pub fn acquire_run_lock(dir: &Path) -> Result<RunLock, BackupError> {
    let path = dir.join(LOCK_FILE_NAME);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)
        .map_err(BackupError::io(format!("opening run lock '{}'", path.display())))?;

    match file.try_lock_exclusive() {
        Ok(()) => {
            trace!(path = %path.display(), "run lock acquired");
            Ok(RunLock { file, path })
        }
        Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
            Err(BackupError::RunLocked { path })
        }
        Err(e) => Err(BackupError::Io {
            context: format!("locking '{}'", path.display()),
            source: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_lock_in_same_dir_is_refused_until_release() {
        let td = tempfile::tempdir().unwrap();
        let first = acquire_run_lock(td.path()).unwrap();
        assert!(first.path().ends_with(LOCK_FILE_NAME));

        let err = acquire_run_lock(td.path()).unwrap_err();
        assert!(matches!(err, BackupError::RunLocked { .. }), "got {err:?}");

        drop(first);
        acquire_run_lock(td.path()).expect("lock is free again after drop");
    }
}
