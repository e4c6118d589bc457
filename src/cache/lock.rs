//! Cross-process advisory lock guarding the cache store.
//!
//! The lock lives in a sibling file named `<store>.lock`. Holding a
//! [`CacheLock`] means no other process using the same store path can run
//! its read-modify-write cycle; the lock is released when the guard drops.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};

use super::CacheError;

/// Scoped exclusive lock on a cache store.
#[derive(Debug)]
pub struct CacheLock {
    file: File,
    path: PathBuf,
}

impl CacheLock {
    /// Path of the lock file for a store.
    #[must_use]
    pub fn lock_path_for(store: &Path) -> PathBuf {
        let mut name = OsString::from(store.as_os_str());
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Acquire the lock, waiting for any other holder to release it.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Lock`] if the lock file cannot be created or locked.
    pub fn acquire(store: &Path) -> Result<Self, CacheError> {
        let path = Self::lock_path_for(store);
        let file = open_lock_file(&path)?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                log::info!(
                    "Cache {} is in use by another run, waiting for the lock",
                    store.display()
                );
                file.lock().map_err(|source| CacheError::Lock {
                    path: path.clone(),
                    source,
                })?;
            }
            Err(TryLockError::Error(source)) => {
                return Err(CacheError::Lock { path, source });
            }
        }

        log::debug!("Acquired cache lock {}", path.display());
        Ok(Self { file, path })
    }

    /// Acquire the lock only if nobody else holds it.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Lock`] on I/O failure. Contention is `Ok(None)`.
    pub fn try_acquire(store: &Path) -> Result<Option<Self>, CacheError> {
        let path = Self::lock_path_for(store);
        let file = open_lock_file(&path)?;

        match file.try_lock() {
            Ok(()) => Ok(Some(Self { file, path })),
            Err(TryLockError::WouldBlock) => Ok(None),
            Err(TryLockError::Error(source)) => Err(CacheError::Lock { path, source }),
        }
    }

    /// Path of the held lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            log::warn!("Failed to release cache lock {}: {}", self.path.display(), e);
        } else {
            log::debug!("Released cache lock {}", self.path.display());
        }
    }
}

fn open_lock_file(path: &Path) -> Result<File, CacheError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| CacheError::Lock {
            path: path.to_path_buf(),
            source,
        })?;
    }
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|source| CacheError::Lock {
            path: path.to_path_buf(),
            source,
        })
}
