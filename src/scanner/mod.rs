//! Scanner module for candidate discovery and content fingerprinting.
//!
//! This module provides functionality for:
//! - Directory walking across several roots using jwalk
//! - Substring-based exclusion applied before any hashing
//! - Streaming content fingerprints (SHA-256 or BLAKE3)
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and candidate discovery
//! - [`hasher`]: Chunked file hashing
//!
//! # Example
//!
//! ```no_run
//! use dupsweep::scanner::{Walker, WalkerConfig};
//! use std::path::PathBuf;
//!
//! let config = WalkerConfig {
//!     exclude_keywords: vec![".git".to_string()],
//!     ..Default::default()
//! };
//!
//! let walker = Walker::new(&[PathBuf::from("/srv/photos")], config).unwrap();
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod walker;

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub use hasher::{HashAlgorithm, Hasher, CHUNK_SIZE};
pub use walker::Walker;

/// A regular file discovered by the walker.
///
/// Size and modification time are the values observed during enumeration;
/// the identity cache validates its entries against them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
}

impl FileEntry {
    /// Create a new FileEntry.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, modified: SystemTime) -> Self {
        Self {
            path,
            size,
            modified,
        }
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Any path containing one of these substrings is skipped.
    /// Excluded directories are not descended into.
    pub exclude_keywords: Vec<String>,

    /// Directories skipped along with everything beneath them.
    /// Matched by whole path components, not by substring.
    pub exclude_dirs: Vec<PathBuf>,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Minimum file size to include (in bytes).
    pub min_size: Option<u64>,

    /// Maximum file size to include (in bytes).
    pub max_size: Option<u64>,
}

impl WalkerConfig {
    /// Create a configuration that only applies exclusion keywords.
    ///
    /// Empty keywords are dropped, since they would match every path.
    #[must_use]
    pub fn with_excludes(exclude_keywords: Vec<String>) -> Self {
        Self {
            exclude_keywords: exclude_keywords
                .into_iter()
                .filter(|k| !k.is_empty())
                .collect(),
            ..Self::default()
        }
    }

    /// Check whether a path matches any exclusion keyword or lies under
    /// an excluded directory.
    #[must_use]
    pub fn is_excluded(&self, path: &std::path::Path) -> bool {
        self.exclude_dirs.iter().any(|dir| path.starts_with(dir))
            || is_excluded(path, &self.exclude_keywords)
    }
}

pub(crate) fn is_excluded(path: &std::path::Path, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return false;
    }
    let text = path.to_string_lossy();
    keywords
        .iter()
        .any(|k| !k.is_empty() && text.contains(k.as_str()))
}

/// Seconds since the Unix epoch as a float, the encoding used by the
/// cache store and the duplicate report.
#[must_use]
pub fn epoch_seconds(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    }
}

/// Inverse of [`epoch_seconds`]. Non-finite input maps to the epoch.
#[must_use]
pub fn from_epoch_seconds(secs: f64) -> SystemTime {
    match Duration::try_from_secs_f64(secs.abs()) {
        Ok(d) if secs >= 0.0 => UNIX_EPOCH + d,
        Ok(d) => UNIX_EPOCH - d,
        Err(_) => UNIX_EPOCH,
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// None of the requested roots could be resolved.
    #[error("No scannable directory among {0} requested root(s)")]
    NoRoots(usize),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    pub(crate) fn from_io(path: &std::path::Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}
