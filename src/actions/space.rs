//! Free-space checks for move destinations.
//!
//! Volume figures come from a [`SpaceProbe`]. The system probe asks
//! `sysinfo` for the mounted disks and picks the one whose mount point is
//! the longest prefix of the destination.

use std::path::{Path, PathBuf};

use bytesize::ByteSize;
use sysinfo::Disks;

use super::ActionError;

/// Capacity and free space of one volume, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeSpace {
    /// Volume capacity
    pub total: u64,
    /// Space available to this process
    pub available: u64,
}

impl VolumeSpace {
    /// Create a new figure.
    #[must_use]
    pub fn new(total: u64, available: u64) -> Self {
        Self { total, available }
    }

    /// Bytes not available.
    #[must_use]
    pub fn used(&self) -> u64 {
        self.total.saturating_sub(self.available)
    }
}

/// Source of volume figures for a path.
pub trait SpaceProbe: Send + Sync {
    /// Figures for the volume holding `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::SpaceUnknown`] if no volume can be matched.
    fn space_for(&self, path: &Path) -> Result<VolumeSpace, ActionError>;
}

/// [`SpaceProbe`] backed by `sysinfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSpaceProbe;

impl SpaceProbe for SystemSpaceProbe {
    fn space_for(&self, path: &Path) -> Result<VolumeSpace, ActionError> {
        let target = existing_ancestor(path).ok_or_else(|| ActionError::SpaceUnknown {
            path: path.to_path_buf(),
            reason: "no existing ancestor".to_string(),
        })?;

        let disks = Disks::new_with_refreshed_list();
        disks
            .list()
            .iter()
            .filter(|d| target.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().as_os_str().len())
            .map(|d| VolumeSpace::new(d.total_space(), d.available_space()))
            .ok_or_else(|| ActionError::SpaceUnknown {
                path: path.to_path_buf(),
                reason: "no mounted volume contains it".to_string(),
            })
    }
}

/// Canonical form of the nearest ancestor of `path` that exists.
fn existing_ancestor(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .filter(|p| !p.as_os_str().is_empty())
        .find_map(|p| p.canonicalize().ok())
}

/// Refuse a write of `needed` bytes if it does not fit, or if free space
/// is already below `min_free_ratio` of the volume.
///
/// # Errors
///
/// Returns [`ActionError::InsufficientSpace`] or [`ActionError::LowFreeSpace`].
pub fn check_space(
    space: VolumeSpace,
    needed: u64,
    min_free_ratio: f64,
    destination: &Path,
) -> Result<(), ActionError> {
    if space.available < needed {
        return Err(ActionError::InsufficientSpace {
            path: destination.to_path_buf(),
            needed,
            available: space.available,
        });
    }

    let floor = space.total as f64 * min_free_ratio;
    if (space.available as f64) < floor {
        return Err(ActionError::LowFreeSpace {
            path: destination.to_path_buf(),
            available: space.available,
            total: space.total,
        });
    }

    log::trace!(
        "{} free on {} ({} needed)",
        ByteSize(space.available),
        destination.display(),
        ByteSize(needed)
    );
    Ok(())
}
