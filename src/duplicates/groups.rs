//! File records and duplicate groups.
//!
//! # Overview
//!
//! A [`FileRecord`] is a scanned file plus its fingerprint and (once ranked)
//! its retention priority. A [`DuplicateGroup`] collects every record that
//! shares one fingerprint.
//!
//! # Example
//!
//! ```
//! use dupsweep::duplicates::{DuplicateGroup, FileRecord};
//! use std::path::PathBuf;
//! use std::time::SystemTime;
//!
//! let now = SystemTime::now();
//! let group = DuplicateGroup::new(
//!     "ab12".to_string(),
//!     vec![
//!         FileRecord::new(PathBuf::from("/a/x.txt"), 100, now, "ab12".to_string()),
//!         FileRecord::new(PathBuf::from("/b/x.txt"), 100, now, "ab12".to_string()),
//!     ],
//! );
//!
//! assert!(group.is_size_consistent());
//! assert_eq!(group.wasted_space(), 100);
//! ```

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::scanner::FileEntry;

/// A fingerprinted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Absolute path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Extension including the leading dot, or empty
    pub extension: String,
    /// Last modification time
    pub modified: SystemTime,
    /// Content fingerprint
    pub fingerprint: String,
    /// Retention priority: 0 is protected, 1 is the preferred keeper
    pub priority: Option<u32>,
}

impl FileRecord {
    /// Create an unranked record.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, modified: SystemTime, fingerprint: String) -> Self {
        let extension = extension_of(&path);
        Self {
            path,
            size,
            extension,
            modified,
            fingerprint,
            priority: None,
        }
    }

    /// Build a record from a scanned entry and its fingerprint.
    #[must_use]
    pub fn from_entry(entry: FileEntry, fingerprint: String) -> Self {
        Self::new(entry.path, entry.size, entry.modified, fingerprint)
    }

    /// Number of path-separator characters in the path.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.path
            .to_string_lossy()
            .chars()
            .filter(|c| std::path::is_separator(*c))
            .count()
    }

    /// Whether the record is in the protected tier.
    ///
    /// Unranked records count as protected.
    #[must_use]
    pub fn is_protected(&self) -> bool {
        matches!(self.priority, None | Some(0))
    }
}

/// `.ext` for a path, matching how the report's `type` field is written.
#[must_use]
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}

/// All records sharing one fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// Shared content fingerprint
    pub fingerprint: String,
    /// Members in enumeration order
    pub files: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// Create a group.
    #[must_use]
    pub fn new(fingerprint: String, files: Vec<FileRecord>) -> Self {
        Self { fingerprint, files }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Whether every member reports the same size.
    ///
    /// A group that fails this is a fingerprint collision or a hashing
    /// defect, not a real duplicate set.
    #[must_use]
    pub fn is_size_consistent(&self) -> bool {
        match self.files.first() {
            Some(first) => self.files.iter().all(|f| f.size == first.size),
            None => true,
        }
    }

    /// Whether every member already carries a priority.
    #[must_use]
    pub fn is_fully_ranked(&self) -> bool {
        self.files.iter().all(|f| f.priority.is_some())
    }

    /// Size of the shared content (the first member's size).
    #[must_use]
    pub fn size(&self) -> u64 {
        self.files.first().map_or(0, |f| f.size)
    }

    /// Bytes held by all copies but one.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        if self.files.len() > 1 {
            self.size() * (self.files.len() as u64 - 1)
        } else {
            0
        }
    }

    /// Paths of all members.
    #[must_use]
    pub fn paths(&self) -> Vec<&Path> {
        self.files.iter().map(|f| f.path.as_path()).collect()
    }
}
