//! JSON-backed identity cache.
//!
//! The store maps absolute path strings to [`CacheEntry`] values. It is
//! loaded once under the cross-process lock, updated in memory, and
//! rewritten atomically every `flush_every` processed files and once more
//! when the run finishes.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rayon::prelude::*;

use super::{CacheEntry, CacheError, CacheLock};
use crate::persist::write_json_atomic;
use crate::scanner::{FileEntry, HashAlgorithm, HashError, Hasher};

/// Default number of processed files between store rewrites.
pub const DEFAULT_FLUSH_EVERY: usize = 100;

/// Options for opening an [`IdentityCache`].
#[derive(Debug, Clone, Copy)]
pub struct CacheOptions {
    /// Rewrite the store after this many processed files.
    pub flush_every: usize,
    /// Fingerprint algorithm; entries from another algorithm are stale.
    pub algorithm: HashAlgorithm,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            flush_every: DEFAULT_FLUSH_EVERY,
            algorithm: HashAlgorithm::default(),
        }
    }
}

/// Counters collected while the cache is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Fingerprints reused from the store
    pub hits: usize,
    /// Files that had to be hashed
    pub misses: usize,
    /// Files that could not be hashed
    pub failures: usize,
    /// Store rewrites performed
    pub flushes: usize,
}

/// Persistent path → fingerprint table guarded by a [`CacheLock`].
#[derive(Debug)]
pub struct IdentityCache {
    path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
    hasher: Hasher,
    flush_every: usize,
    processed_since_flush: usize,
    dirty: bool,
    stats: CacheStats,
    // Declared last so it is released after everything else is dropped
    _lock: CacheLock,
}

impl IdentityCache {
    /// Lock and load the store at `path`.
    ///
    /// A missing store starts empty. A store that cannot be read or parsed
    /// is discarded with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Lock`] if the lock cannot be taken.
    pub fn open(path: &Path, options: CacheOptions) -> Result<Self, CacheError> {
        let lock = CacheLock::acquire(path)?;
        let entries = read_store(path);
        log::debug!(
            "Loaded {} cache entries from {}",
            entries.len(),
            path.display()
        );

        Ok(Self {
            path: path.to_path_buf(),
            entries,
            hasher: Hasher::new(options.algorithm),
            flush_every: options.flush_every.max(1),
            processed_since_flush: 0,
            dirty: false,
            stats: CacheStats::default(),
            _lock: lock,
        })
    }

    /// Location of the store on disk.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries in memory.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read-only view of the table.
    #[must_use]
    pub fn entries(&self) -> &BTreeMap<String, CacheEntry> {
        &self.entries
    }

    /// Look up the stored entry for a path.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&CacheEntry> {
        self.entries.get(&cache_key(path))
    }

    /// Counters for this session.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Batch size used by callers that feed files in chunks.
    #[must_use]
    pub fn flush_every(&self) -> usize {
        self.flush_every
    }

    /// Algorithm used for new fingerprints.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.hasher.algorithm()
    }

    /// Return the stored fingerprint if it is still valid for the given state.
    #[must_use]
    pub fn lookup(&self, path: &Path, size: u64, modified: SystemTime) -> Option<&str> {
        self.get(path)
            .filter(|e| e.is_valid_for(size, modified, self.hasher.algorithm()))
            .map(|e| e.fingerprint.as_str())
    }

    /// Fingerprint a file by path, using its current size and modification time.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be inspected or read; the
    /// cache is left unchanged for that path.
    pub fn fingerprint_of(&mut self, path: &Path) -> Result<String, HashError> {
        let absolute = std::path::absolute(path).map_err(|e| HashError::from_io(path, e))?;
        let metadata = fs::metadata(&absolute).map_err(|e| HashError::from_io(path, e))?;
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let entry = FileEntry::new(absolute, metadata.len(), modified);

        self.fingerprint_batch(std::slice::from_ref(&entry))
            .pop()
            .unwrap_or_else(|| Err(HashError::NotFound(path.to_path_buf())))
    }

    /// Fingerprint a batch of scanned files.
    ///
    /// Valid entries are reused; the remaining files are hashed in parallel,
    /// then recorded on this thread. Results are returned in input order.
    pub fn fingerprint_batch(&mut self, files: &[FileEntry]) -> Vec<Result<String, HashError>> {
        let algorithm = self.hasher.algorithm();
        let mut results: Vec<Option<Result<String, HashError>>> = files
            .iter()
            .map(|f| {
                self.lookup(&f.path, f.size, f.modified)
                    .map(|fp| Ok(fp.to_string()))
            })
            .collect();

        let misses: Vec<usize> = results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.is_none().then_some(i))
            .collect();
        self.stats.hits += files.len() - misses.len();

        let hasher = &self.hasher;
        let hashed: Vec<(usize, Result<String, HashError>)> = misses
            .par_iter()
            .map(|&i| (i, hasher.hash_file(&files[i].path)))
            .collect();

        for (i, result) in hashed {
            let file = &files[i];
            match &result {
                Ok(fingerprint) => {
                    self.stats.misses += 1;
                    self.entries.insert(
                        cache_key(&file.path),
                        CacheEntry::new(fingerprint.clone(), file.size, file.modified, algorithm),
                    );
                    self.dirty = true;
                }
                Err(e) => {
                    self.stats.failures += 1;
                    log::warn!("Excluding {} from this run: {}", file.path.display(), e);
                }
            }
            results[i] = Some(result);
        }

        self.processed_since_flush += files.len();
        if self.processed_since_flush >= self.flush_every {
            self.flush_or_warn();
        }

        results
            .into_iter()
            .zip(files)
            .map(|(r, f)| r.unwrap_or_else(|| Err(HashError::NotFound(f.path.clone()))))
            .collect()
    }

    /// Drop entries whose file no longer exists. Returns how many were removed.
    pub fn prune_missing(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| Path::new(key).exists());
        let removed = before - self.entries.len();
        if removed > 0 {
            log::debug!("Pruned {} stale cache entries", removed);
            self.dirty = true;
        }
        removed
    }

    /// Rewrite the store if anything changed since the last write.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if the store cannot be written.
    pub fn flush(&mut self) -> Result<(), CacheError> {
        self.processed_since_flush = 0;
        if !self.dirty {
            return Ok(());
        }
        write_json_atomic(&self.path, &self.entries, false).map_err(|source| CacheError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.dirty = false;
        self.stats.flushes += 1;
        log::debug!(
            "Flushed {} cache entries to {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(())
    }

    fn flush_or_warn(&mut self) {
        if let Err(e) = self.flush() {
            log::warn!("Cache flush failed, continuing: {}", e);
        }
    }

    /// Write the final state and release the lock.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if the final write fails. The lock is
    /// released either way.
    pub fn finish(mut self) -> Result<CacheStats, CacheError> {
        self.flush()?;
        Ok(self.stats)
    }
}

/// Key under which a path is stored.
#[must_use]
pub fn cache_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn read_store(path: &Path) -> BTreeMap<String, CacheEntry> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            log::warn!(
                "Cannot read cache {}, starting empty: {}",
                path.display(),
                e
            );
            return BTreeMap::new();
        }
    };

    match serde_json::from_str(&content) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!(
                "Cache {} is corrupt and will be rebuilt: {}",
                path.display(),
                e
            );
            BTreeMap::new()
        }
    }
}
