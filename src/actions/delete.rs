//! File deletion and pre-mutation verification.
//!
//! # Overview
//!
//! - [`FileSnapshot`] records the size and modification time a file had
//!   when it was scanned, and refuses to proceed if either changed.
//! - [`permanent_delete`] removes a file.
//! - [`delete_to_trash`] moves a file to the system trash via the trash crate.
//!
//! # Example
//!
//! ```no_run
//! use dupsweep::actions::delete::{permanent_delete, FileSnapshot};
//! use std::path::Path;
//!
//! let path = Path::new("/path/to/duplicate.txt");
//! let snapshot = FileSnapshot::capture(path).unwrap();
//! snapshot.verify().unwrap();
//! permanent_delete(path).unwrap();
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::ActionError;
use crate::scanner::epoch_seconds;

/// Allowed drift between recorded and current modification times, in seconds.
///
/// Reports store times as float seconds, which loses sub-microsecond precision.
const MTIME_TOLERANCE: f64 = 1e-6;

/// File metadata snapshot used to detect changes since the scan.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSnapshot {
    /// Path to the file.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
}

impl FileSnapshot {
    /// Snapshot from values recorded at scan time.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, modified: SystemTime) -> Self {
        Self {
            path,
            size,
            modified,
        }
    }

    /// Snapshot of a file's current state.
    ///
    /// # Errors
    ///
    /// Returns error if the file doesn't exist or can't be accessed.
    pub fn capture(path: &Path) -> Result<Self, ActionError> {
        let metadata = fs::symlink_metadata(path).map_err(|e| ActionError::from_io(path, e))?;
        if !metadata.is_file() {
            return Err(ActionError::NotFound(path.to_path_buf()));
        }
        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        })
    }

    /// Verify that the file still matches this snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Modified`] if size or modification time
    /// changed, [`ActionError::NotFound`] if the file is gone.
    pub fn verify(&self) -> Result<(), ActionError> {
        let current = Self::capture(&self.path)?;

        if current.size != self.size {
            log::warn!(
                "File modified since scan: {} (size changed from {} to {})",
                self.path.display(),
                self.size,
                current.size
            );
            return Err(ActionError::Modified(self.path.clone()));
        }

        let drift = (epoch_seconds(current.modified) - epoch_seconds(self.modified)).abs();
        if drift > MTIME_TOLERANCE {
            log::warn!(
                "File modified since scan: {} (mtime changed)",
                self.path.display()
            );
            return Err(ActionError::Modified(self.path.clone()));
        }

        Ok(())
    }
}

/// Move a file to the system trash. Returns the freed size.
///
/// # Errors
///
/// - `NotFound` if the file doesn't exist
/// - `PermissionDenied` if it cannot be inspected
/// - `TrashFailed` if the trash operation fails
pub fn delete_to_trash(path: &Path) -> Result<u64, ActionError> {
    let size = fs::metadata(path)
        .map_err(|e| ActionError::from_io(path, e))?
        .len();

    trash::delete(path).map_err(|e| {
        log::error!("Trash operation failed for {}: {}", path.display(), e);
        ActionError::TrashFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    log::info!("Moved to trash: {} ({} bytes)", path.display(), size);
    Ok(size)
}

/// Permanently delete a file. Returns the freed size.
///
/// **WARNING**: This operation cannot be undone.
///
/// # Errors
///
/// - `NotFound` if the file doesn't exist
/// - `PermissionDenied` if deletion is not allowed
/// - `Io` for any other failure
pub fn permanent_delete(path: &Path) -> Result<u64, ActionError> {
    let size = fs::metadata(path)
        .map_err(|e| ActionError::from_io(path, e))?
        .len();

    fs::remove_file(path).map_err(|e| {
        log::error!("Permanent delete failed for {}: {}", path.display(), e);
        ActionError::from_io(path, e)
    })?;

    log::info!("Deleted: {} ({} bytes)", path.display(), size);
    Ok(size)
}
