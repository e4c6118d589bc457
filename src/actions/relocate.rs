//! Moving and renaming processed files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::naming::unique_rename_target;
use super::ActionError;

/// Move `source` to `target`.
///
/// A rename is tried first; across filesystems the file is copied and the
/// source removed. If the source cannot be removed the copy is discarded.
///
/// # Errors
///
/// Returns [`ActionError`] naming whichever path failed.
pub fn move_file(source: &Path, target: &Path) -> Result<(), ActionError> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            log::debug!(
                "{} is on another device, copying instead",
                target.display()
            );
            copy_then_remove(source, target)
        }
        Err(e) => Err(ActionError::from_io(source, e)),
    }
}

fn copy_then_remove(source: &Path, target: &Path) -> Result<(), ActionError> {
    fs::copy(source, target).map_err(|e| ActionError::Io {
        path: target.to_path_buf(),
        source: e,
    })?;

    if let Err(e) = fs::remove_file(source) {
        if let Err(cleanup) = fs::remove_file(target) {
            log::warn!(
                "Could not remove partial copy {}: {}",
                target.display(),
                cleanup
            );
        }
        return Err(ActionError::from_io(source, e));
    }
    Ok(())
}

/// Rename a file in place to `<path>.dupsweep` (or the next free variant).
///
/// # Errors
///
/// Returns [`ActionError`] if no free name exists or the rename fails.
pub fn rename_in_place(path: &Path) -> Result<PathBuf, ActionError> {
    let target = unique_rename_target(path)?;
    fs::rename(path, &target).map_err(|e| ActionError::from_io(path, e))?;
    Ok(target)
}
