//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Fingerprint grouping of scanned files ([`index`])
//! - File records and duplicate groups ([`groups`])
//! - Retention ranking inside each group ([`priority`])
//! - The JSON duplicate report ([`report`])
//!
//! # Example
//!
//! ```no_run
//! use dupsweep::cache::{CacheOptions, IdentityCache};
//! use dupsweep::duplicates::{assign_priorities, IndexBuilder, PriorityPolicy};
//! use dupsweep::scanner::{Walker, WalkerConfig};
//! use std::path::{Path, PathBuf};
//!
//! let walker = Walker::new(&[PathBuf::from(".")], WalkerConfig::default()).unwrap();
//! let mut cache = IdentityCache::open(Path::new("ids.json"), CacheOptions::default()).unwrap();
//! let (mut index, _stats) = IndexBuilder::new(&mut cache).build(walker.walk());
//! assign_priorities(&mut index, &PriorityPolicy::default());
//!
//! for group in index.groups() {
//!     println!("{}: {} copies", group.fingerprint, group.len());
//! }
//! ```

pub mod groups;
pub mod index;
pub mod priority;
pub mod report;

pub use groups::{extension_of, DuplicateGroup, FileRecord};
pub use index::{DuplicateIndex, IndexBuilder, IndexStats};
pub use priority::{
    assign_priorities, parse_sort_keys, reconcile_priorities, Criterion, GroupRanking,
    PriorityError, PriorityPolicy, RankingStats, SortKey, SortOrder,
};
pub use report::{DuplicateReport, ReportEntry, ReportError};
