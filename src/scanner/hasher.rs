//! Streaming content hasher.
//!
//! # Overview
//! Files are read in fixed-size chunks so memory use does not depend on
//! file size. Fingerprints are lower-case hex strings; SHA-256 is the
//! default and BLAKE3 can be selected.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::HashError;

/// Size of each read when streaming a file through the hasher.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Content hash algorithm used for fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256, 64 hex characters.
    #[default]
    Sha256,
    /// BLAKE3, 64 hex characters.
    Blake3,
}

impl HashAlgorithm {
    /// Canonical lower-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown algorithm name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown hash algorithm '{0}' (expected sha256 or blake3)")]
pub struct UnknownAlgorithm(pub String);

impl FromStr for HashAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Chunked file hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    algorithm: HashAlgorithm,
    chunk_size: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new(HashAlgorithm::default())
    }
}

impl Hasher {
    /// Create a hasher for the given algorithm.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            chunk_size: CHUNK_SIZE,
        }
    }

    /// Override the read chunk size (mainly for tests and benchmarks).
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// The algorithm this hasher produces.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Compute the fingerprint of a file's contents.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read. A read
    /// either completes or fails outright; there is no partial result.
    pub fn hash_file(&self, path: &Path) -> Result<String, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let fingerprint = self
            .hash_reader(file)
            .map_err(|e| HashError::from_io(path, e))?;
        log::trace!("Hashed {} -> {}", path.display(), fingerprint);
        Ok(fingerprint)
    }

    /// Compute the fingerprint of everything readable from `reader`.
    ///
    /// # Errors
    ///
    /// Propagates read errors other than `Interrupted`.
    pub fn hash_reader<R: Read>(&self, reader: R) -> io::Result<String> {
        let mut buf = vec![0u8; self.chunk_size];
        match self.algorithm {
            HashAlgorithm::Sha256 => {
                let mut digest = Sha256::new();
                stream(reader, &mut buf, |chunk| digest.update(chunk))?;
                Ok(format!("{:x}", digest.finalize()))
            }
            HashAlgorithm::Blake3 => {
                let mut digest = blake3::Hasher::new();
                stream(reader, &mut buf, |chunk| {
                    digest.update(chunk);
                })?;
                Ok(digest.finalize().to_hex().to_string())
            }
        }
    }
}

fn stream<R: Read>(mut reader: R, buf: &mut [u8], mut sink: impl FnMut(&[u8])) -> io::Result<()> {
    loop {
        match reader.read(buf) {
            Ok(0) => return Ok(()),
            Ok(n) => sink(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
