//! Identity caching module for dupsweep.
//!
//! This module provides persistent storage for content fingerprints so that
//! unchanged files are not re-hashed on the next run.
//!
//! # Architecture
//!
//! * [`store`]: The [`IdentityCache`] table, JSON persistence and batching.
//! * [`entry`]: The [`CacheEntry`] record and its validity rule.
//! * [`lock`]: The [`CacheLock`] guard around a store's read-modify-write cycle.
//!
//! # Cache Invalidation
//!
//! Entries are keyed by absolute path and validated using:
//! * File size
//! * Modification time
//! * Hash algorithm
//!
//! If any of these differ, the entry is stale and the file is re-hashed.

pub mod entry;
pub mod lock;
pub mod store;

use std::path::PathBuf;

pub use entry::CacheEntry;
pub use lock::CacheLock;
pub use store::{cache_key, CacheOptions, CacheStats, IdentityCache, DEFAULT_FLUSH_EVERY};

/// Errors raised by the identity cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The advisory lock could not be taken.
    #[error("cannot lock cache {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store could not be written.
    #[error("cannot write cache {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

