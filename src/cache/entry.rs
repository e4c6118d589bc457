//! Cache entry definitions.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::scanner::{epoch_seconds, HashAlgorithm};

/// Represents a single file entry in the identity cache.
///
/// Serialized as `{"file_id", "modified_time", "size", "algorithm"}`.
/// Stores written before `algorithm` existed are read as SHA-256.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Content fingerprint (hex)
    #[serde(rename = "file_id")]
    pub fingerprint: String,
    /// Modification time the fingerprint was computed from, epoch seconds
    pub modified_time: f64,
    /// File size the fingerprint was computed from
    pub size: u64,
    /// Algorithm that produced the fingerprint
    #[serde(default)]
    pub algorithm: HashAlgorithm,
}

impl CacheEntry {
    /// Create an entry for a freshly hashed file.
    #[must_use]
    pub fn new(
        fingerprint: String,
        size: u64,
        modified: SystemTime,
        algorithm: HashAlgorithm,
    ) -> Self {
        Self {
            fingerprint,
            modified_time: epoch_seconds(modified),
            size,
            algorithm,
        }
    }

    /// Whether this entry may be reused for a file with the given state.
    ///
    /// Size and modification time must match exactly.
    #[must_use]
    pub fn is_valid_for(&self, size: u64, modified: SystemTime, algorithm: HashAlgorithm) -> bool {
        self.size == size
            && self.modified_time.to_bits() == epoch_seconds(modified).to_bits()
            && self.algorithm == algorithm
    }
}
