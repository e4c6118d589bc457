//! Duplicate report persistence.
//!
//! A report is the ranked index written as JSON:
//!
//! ```json
//! {
//!   "ba7816bf...": [
//!     {"path": "/a/x.txt", "size": 100, "type": ".txt",
//!      "modified_time": 1700000000.25, "priority": 1}
//!   ]
//! }
//! ```
//!
//! It can be loaded on a later run instead of scanning, and re-prioritised
//! offline with [`DuplicateReport::adjust_priority`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{DuplicateGroup, DuplicateIndex, FileRecord};
use crate::persist::write_json_atomic;
use crate::scanner::{epoch_seconds, from_epoch_seconds};

/// Errors reading or writing a report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// The file could not be read or written.
    #[error("I/O error on report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid report.
    #[error("report {path} is malformed: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One file in a report group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Absolute path
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Extension including the dot
    #[serde(rename = "type", default)]
    pub file_type: String,
    /// Seconds since the Unix epoch
    pub modified_time: f64,
    /// Retention priority, if ranked
    #[serde(default)]
    pub priority: Option<u32>,
}

impl ReportEntry {
    fn from_record(record: &FileRecord) -> Self {
        Self {
            path: record.path.clone(),
            size: record.size,
            file_type: record.extension.clone(),
            modified_time: epoch_seconds(record.modified),
            priority: record.priority,
        }
    }

    fn into_record(self, fingerprint: &str) -> FileRecord {
        let mut record = FileRecord::new(
            self.path,
            self.size,
            from_epoch_seconds(self.modified_time),
            fingerprint.to_string(),
        );
        if !self.file_type.is_empty() {
            record.extension = self.file_type;
        }
        record.priority = self.priority;
        record
    }
}

/// Fingerprint → entries, as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DuplicateReport {
    groups: BTreeMap<String, Vec<ReportEntry>>,
}

impl DuplicateReport {
    /// Snapshot an index.
    #[must_use]
    pub fn from_index(index: &DuplicateIndex) -> Self {
        let groups = index
            .groups()
            .map(|g| {
                (
                    g.fingerprint.clone(),
                    g.files.iter().map(ReportEntry::from_record).collect(),
                )
            })
            .collect();
        Self { groups }
    }

    /// Rebuild an index. Groups with fewer than two entries are dropped.
    #[must_use]
    pub fn into_index(self) -> DuplicateIndex {
        DuplicateIndex::from_groups(self.groups.into_iter().map(|(fingerprint, entries)| {
            let files = entries
                .into_iter()
                .map(|e| e.into_record(&fingerprint))
                .collect();
            DuplicateGroup::new(fingerprint, files)
        }))
    }

    /// Read a report file.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let content = fs::read_to_string(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let report: Self = serde_json::from_str(&content).map_err(|source| ReportError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!(
            "Loaded report {} with {} groups",
            path.display(),
            report.len()
        );
        Ok(report)
    }

    /// Write the report atomically.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ReportError> {
        write_json_atomic(path, self, true).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Wrote report with {} groups to {}", self.len(), path.display());
        Ok(())
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether the report has no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Entries of one group.
    #[must_use]
    pub fn group(&self, fingerprint: &str) -> Option<&[ReportEntry]> {
        self.groups.get(fingerprint).map(Vec::as_slice)
    }

    /// Iterate over `(fingerprint, entries)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ReportEntry])> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Whether every entry carries a priority.
    #[must_use]
    pub fn has_complete_priorities(&self) -> bool {
        self.groups
            .values()
            .flatten()
            .all(|e| e.priority.is_some())
    }

    /// Lower the priority of every ranked entry whose path contains
    /// `pattern` (case-insensitive) by `adjustment`, clamping at 0, then
    /// re-sort each group by priority. A negative adjustment raises it.
    ///
    /// Returns how many entries matched.
    pub fn adjust_priority(&mut self, pattern: &str, adjustment: i64) -> usize {
        let needle = pattern.to_lowercase();
        let mut matched = 0;

        for entry in self.groups.values_mut().flatten() {
            let Some(priority) = entry.priority else {
                continue;
            };
            if !entry.path.to_string_lossy().to_lowercase().contains(&needle) {
                continue;
            }
            let adjusted = i64::from(priority)
                .saturating_sub(adjustment)
                .clamp(0, i64::from(u32::MAX));
            entry.priority = Some(adjusted as u32);
            matched += 1;
        }

        self.sort_by_priority();
        log::info!(
            "Adjusted {} entries matching '{}' by {}",
            matched,
            pattern,
            adjustment
        );
        matched
    }

    /// Stable-sort each group by ascending priority, unranked entries last.
    pub fn sort_by_priority(&mut self) {
        for entries in self.groups.values_mut() {
            entries.sort_by_key(|e| e.priority.map_or((1, 0), |p| (0, p)));
        }
    }
}
