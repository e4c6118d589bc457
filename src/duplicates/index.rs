//! Fingerprint index construction.
//!
//! # Overview
//!
//! [`IndexBuilder`] consumes the walker's candidate sequence, fingerprints
//! every file through the [`IdentityCache`], and groups the resulting
//! records by fingerprint. Groups with a single member are pruned once all
//! candidates are processed.
//!
//! Candidates are fed to the cache in chunks of its flush interval, so a
//! crash loses at most one chunk of hashing work.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cache::IdentityCache;
use crate::progress::{phase, ProgressCallback};
use crate::scanner::{FileEntry, ScanError};

use super::{DuplicateGroup, FileRecord};

/// Fingerprint → group table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateIndex {
    groups: BTreeMap<String, DuplicateGroup>,
}

impl DuplicateIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from ready-made groups, pruning singletons.
    #[must_use]
    pub fn from_groups(groups: impl IntoIterator<Item = DuplicateGroup>) -> Self {
        let mut index = Self::new();
        for group in groups {
            for record in group.files {
                index.insert(record);
            }
        }
        index.prune_singletons();
        index
    }

    /// Add a record under its fingerprint.
    pub fn insert(&mut self, record: FileRecord) {
        self.groups
            .entry(record.fingerprint.clone())
            .or_insert_with(|| DuplicateGroup::new(record.fingerprint.clone(), Vec::new()))
            .files
            .push(record);
    }

    /// Remove every group with fewer than two members. Returns how many were removed.
    pub fn prune_singletons(&mut self) -> usize {
        let before = self.groups.len();
        self.groups.retain(|_, g| g.len() >= 2);
        before - self.groups.len()
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no duplicates were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Look up a group by fingerprint.
    #[must_use]
    pub fn get(&self, fingerprint: &str) -> Option<&DuplicateGroup> {
        self.groups.get(fingerprint)
    }

    /// Groups in fingerprint order.
    pub fn groups(&self) -> impl Iterator<Item = &DuplicateGroup> {
        self.groups.values()
    }

    /// Mutable groups in fingerprint order.
    pub fn groups_mut(&mut self) -> impl Iterator<Item = &mut DuplicateGroup> {
        self.groups.values_mut()
    }

    /// Consume the index into its groups.
    #[must_use]
    pub fn into_groups(self) -> Vec<DuplicateGroup> {
        self.groups.into_values().collect()
    }

    /// Total files across all groups.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.groups.values().map(DuplicateGroup::len).sum()
    }

    /// Bytes held by redundant copies.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.groups.values().map(DuplicateGroup::wasted_space).sum()
    }
}

/// Counters from one index build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Candidate files yielded by the walker
    pub candidates: usize,
    /// Errors yielded by the walker
    pub scan_errors: usize,
    /// Fingerprints reused from the cache
    pub cache_hits: usize,
    /// Files hashed in this run
    pub hashed: usize,
    /// Files that vanished or could not be read before hashing
    pub hash_failures: usize,
    /// Duplicate groups after pruning
    pub groups: usize,
    /// Files across all duplicate groups
    pub duplicate_files: usize,
    /// Bytes held by redundant copies
    pub wasted_bytes: u64,
    /// Whether the build stopped early on a shutdown request
    pub interrupted: bool,
}

impl IndexStats {
    /// Whether any file was skipped because of an error.
    #[must_use]
    pub fn had_errors(&self) -> bool {
        self.scan_errors > 0 || self.hash_failures > 0
    }
}

/// Builds a [`DuplicateIndex`] using an open [`IdentityCache`].
pub struct IndexBuilder<'a> {
    cache: &'a mut IdentityCache,
    progress: Option<Arc<dyn ProgressCallback>>,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl<'a> IndexBuilder<'a> {
    /// Create a builder writing through `cache`.
    #[must_use]
    pub fn new(cache: &'a mut IdentityCache) -> Self {
        Self {
            cache,
            progress: None,
            shutdown_flag: None,
        }
    }

    /// Report progress to a callback.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Stop between chunks when the flag is set.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Consume the candidate sequence and build the index.
    pub fn build<I>(self, candidates: I) -> (DuplicateIndex, IndexStats)
    where
        I: IntoIterator<Item = Result<FileEntry, ScanError>>,
    {
        let mut stats = IndexStats::default();
        let files = self.collect_candidates(candidates, &mut stats);

        let before = self.cache.stats();
        let mut index = DuplicateIndex::new();
        let chunk_size = self.cache.flush_every();

        if let Some(p) = &self.progress {
            p.on_phase_start(phase::HASHING, files.len());
        }

        let mut processed = 0;
        for chunk in files.chunks(chunk_size) {
            if self.is_shutdown_requested() {
                log::info!("Index build interrupted after {} files", processed);
                stats.interrupted = true;
                break;
            }

            let results = self.cache.fingerprint_batch(chunk);
            for (file, result) in chunk.iter().zip(results) {
                processed += 1;
                if let Some(p) = &self.progress {
                    p.on_progress(processed, &file.path.to_string_lossy());
                }
                if let Ok(fingerprint) = result {
                    index.insert(FileRecord::from_entry(file.clone(), fingerprint));
                }
            }
        }

        if let Some(p) = &self.progress {
            p.on_phase_end(phase::HASHING);
        }

        let after = self.cache.stats();
        stats.cache_hits = after.hits - before.hits;
        stats.hashed = after.misses - before.misses;
        stats.hash_failures = after.failures - before.failures;

        let pruned = index.prune_singletons();
        stats.groups = index.len();
        stats.duplicate_files = index.file_count();
        stats.wasted_bytes = index.wasted_space();

        log::debug!(
            "Indexed {} candidates: {} groups, {} unique files pruned",
            stats.candidates,
            stats.groups,
            pruned
        );

        (index, stats)
    }

    fn collect_candidates<I>(&self, candidates: I, stats: &mut IndexStats) -> Vec<FileEntry>
    where
        I: IntoIterator<Item = Result<FileEntry, ScanError>>,
    {
        if let Some(p) = &self.progress {
            p.on_phase_start(phase::WALKING, 0);
        }

        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut files = Vec::new();
        for candidate in candidates {
            match candidate {
                Ok(file) => {
                    if seen.insert(file.path.clone()) {
                        files.push(file);
                        if let Some(p) = &self.progress {
                            p.on_progress(files.len(), "");
                        }
                    } else {
                        log::debug!("Ignoring repeated path {}", file.path.display());
                    }
                }
                Err(e) => {
                    stats.scan_errors += 1;
                    log::debug!("Scan error: {}", e);
                }
            }
        }
        stats.candidates = files.len();

        if let Some(p) = &self.progress {
            p.on_phase_end(phase::WALKING);
        }
        files
    }
}
