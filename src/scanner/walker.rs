//! Directory walker implementation using jwalk.
//!
//! # Overview
//!
//! [`Walker`] enumerates regular files below a set of root directories.
//! Roots are canonicalised and de-duplicated (a root nested inside another
//! root is dropped), children are sorted by name so the sequence is
//! deterministic, and exclusion keywords prune whole subtrees before they
//! are read.
//!
//! # Features
//!
//! - Parallel directory reading via jwalk's rayon pool
//! - Symbolic links and special files skipped silently
//! - Unreadable subdirectories reported as [`ScanError`] items, not fatal
//! - Optional size and hidden-file filters
//! - Graceful shutdown via atomic flag
//!
//! # Example
//!
//! ```no_run
//! use dupsweep::scanner::{Walker, WalkerConfig};
//! use std::path::PathBuf;
//!
//! let roots = vec![PathBuf::from("/mnt/a"), PathBuf::from("/mnt/b")];
//! let walker = Walker::new(&roots, WalkerConfig::default()).unwrap();
//! let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
//! println!("Found {} files", files.len());
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use jwalk::WalkDir;

use super::{FileEntry, ScanError, WalkerConfig};

/// Directory walker over one or more roots.
#[derive(Debug)]
pub struct Walker {
    /// Canonical, non-overlapping roots in the order they were given
    roots: Vec<PathBuf>,
    /// Requested roots that could not be used
    rejected: Vec<(PathBuf, String)>,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a walker for the given roots.
    ///
    /// Missing roots and non-directories are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NoRoots`] if no root could be resolved.
    pub fn new(roots: &[PathBuf], config: WalkerConfig) -> Result<Self, ScanError> {
        let (roots, rejected) = resolve_roots(roots);
        if roots.is_empty() {
            return Err(ScanError::NoRoots(rejected.len()));
        }
        Ok(Self {
            roots,
            rejected,
            config,
            shutdown_flag: None,
        })
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// The roots that will be walked.
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Roots that were dropped, with the reason.
    #[must_use]
    pub fn rejected_roots(&self) -> &[(PathBuf, String)] {
        &self.rejected
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    fn passes_size_filter(&self, size: u64) -> bool {
        if let Some(min) = self.config.min_size {
            if size < min {
                return false;
            }
        }
        if let Some(max) = self.config.max_size {
            if size > max {
                return false;
            }
        }
        true
    }

    /// Walk every root, yielding candidate files.
    ///
    /// Each call starts a fresh traversal, so the sequence is restartable.
    /// Errors are yielded as [`ScanError`] values rather than stopping
    /// iteration.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileEntry, ScanError>> + '_ {
        self.roots
            .iter()
            .take_while(move |_| !self.is_shutdown_requested())
            .flat_map(move |root| self.walk_root(root))
    }

    fn walk_root<'a>(
        &'a self,
        root: &'a Path,
    ) -> impl Iterator<Item = Result<FileEntry, ScanError>> + 'a {
        let config = self.config.clone();

        let walk_dir = WalkDir::new(root)
            .follow_links(false)
            .skip_hidden(self.config.skip_hidden)
            .process_read_dir(move |_depth, _path, _read_dir_state, children| {
                // Dropping an excluded directory here keeps jwalk from reading it
                children.retain(|child| match child {
                    Ok(entry) => !config.is_excluded(&entry.path()),
                    Err(_) => true,
                });
                children.sort_by(|a, b| match (a, b) {
                    (Ok(a), Ok(b)) => a.file_name().cmp(b.file_name()),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => std::cmp::Ordering::Equal,
                });
            });

        walk_dir
            .into_iter()
            .take_while(move |_| {
                let stop = self.is_shutdown_requested();
                if stop {
                    log::debug!("Walker: Shutdown requested, stopping iteration");
                }
                !stop
            })
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => {
                    let file_type = entry.file_type();
                    if file_type.is_dir() {
                        return None;
                    }

                    let path = entry.path();
                    if file_type.is_symlink() {
                        log::trace!("Skipping symlink: {}", path.display());
                        return None;
                    }

                    let metadata = match std::fs::symlink_metadata(&path) {
                        Ok(m) => m,
                        Err(e) => return Some(Err(self.io_error(&path, e))),
                    };

                    if !metadata.is_file() {
                        log::trace!("Skipping special file: {}", path.display());
                        return None;
                    }

                    let size = metadata.len();
                    if !self.passes_size_filter(size) {
                        log::trace!(
                            "Skipping file due to size filter ({}): {}",
                            size,
                            path.display()
                        );
                        return None;
                    }

                    let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                    Some(Ok(FileEntry::new(path, size, modified)))
                }
                Err(e) => {
                    let path = e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
                    log::warn!("Skipping unreadable entry {}: {}", path.display(), e);
                    let source = e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
                    Some(Err(self.io_error(&path, source)))
                }
            })
    }

    fn io_error(&self, path: &Path, error: std::io::Error) -> ScanError {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::PermissionDenied => {
                log::warn!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path.to_path_buf())
            }
            ErrorKind::NotFound => {
                log::debug!("File not found (may have been deleted): {}", path.display());
                ScanError::NotFound(path.to_path_buf())
            }
            _ => {
                log::warn!("I/O error for {}: {}", path.display(), error);
                ScanError::Io {
                    path: path.to_path_buf(),
                    source: error,
                }
            }
        }
    }
}

/// Canonicalise roots, dropping duplicates and roots nested in other roots.
fn resolve_roots(requested: &[PathBuf]) -> (Vec<PathBuf>, Vec<(PathBuf, String)>) {
    let mut resolved: Vec<PathBuf> = Vec::new();
    let mut rejected = Vec::new();

    for root in requested {
        let canonical = match root.canonicalize() {
            Ok(p) => p,
            Err(e) => {
                log::warn!("Skipping root {}: {}", root.display(), e);
                rejected.push((root.clone(), e.to_string()));
                continue;
            }
        };
        if !canonical.is_dir() {
            log::warn!("Skipping root {}: not a directory", root.display());
            rejected.push((root.clone(), "not a directory".to_string()));
            continue;
        }
        if resolved.iter().any(|r| canonical.starts_with(r)) {
            log::debug!("Root {} already covered", canonical.display());
            continue;
        }
        // A new root may also cover roots accepted earlier
        resolved.retain(|r| !r.starts_with(&canonical));
        resolved.push(canonical);
    }

    (resolved, rejected)
}
