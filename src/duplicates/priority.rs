//! Retention ranking within duplicate groups.
//!
//! # Overview
//!
//! Every member of a group receives an integer priority. `0` marks a
//! protected file that is never deleted or moved; `1, 2, ...` rank the
//! remaining members from most to least preferred keeper.
//!
//! Ranking happens in three steps:
//!
//! 1. A group whose members disagree on size is a fingerprint collision.
//!    Every member is protected and ranking stops.
//! 2. Members whose path contains a protection keyword are protected.
//! 3. The rest are sorted by the policy's keys and numbered from 1.
//!
//! Sort keys are descending unless marked `:asc`, so by default the most
//! recently modified file and then the deepest path win. Remaining ties
//! keep enumeration order.
//!
//! # Example
//!
//! ```
//! use dupsweep::duplicates::{SortKey, PriorityPolicy};
//!
//! let keys: Vec<SortKey> = ["modified_time", "path:asc"]
//!     .iter()
//!     .map(|k| k.parse().unwrap())
//!     .collect();
//! let policy = PriorityPolicy::default().with_keys(keys);
//! assert_eq!(policy.keys().len(), 2);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{DuplicateGroup, DuplicateIndex, FileRecord};
use crate::scanner::is_excluded;

/// Errors from parsing priority criteria.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PriorityError {
    /// The criterion name is not recognised.
    #[error("unknown priority criterion '{0}' (expected modified_time, path or size)")]
    UnknownCriterion(String),

    /// The direction suffix is not `asc` or `desc`.
    #[error("unknown sort direction '{0}' (expected asc or desc)")]
    UnknownDirection(String),

    /// No criteria were given.
    #[error("priority order must name at least one criterion")]
    Empty,
}

/// Attribute a group is ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Last modification time
    ModifiedTime,
    /// Directory depth (number of path separators)
    Path,
    /// File size
    Size,
}

impl Criterion {
    /// Canonical name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ModifiedTime => "modified_time",
            Self::Path => "path",
            Self::Size => "size",
        }
    }

    fn compare(self, a: &FileRecord, b: &FileRecord) -> Ordering {
        match self {
            Self::ModifiedTime => a.modified.cmp(&b.modified),
            Self::Path => a.depth().cmp(&b.depth()),
            Self::Size => a.size.cmp(&b.size),
        }
    }
}

impl FromStr for Criterion {
    type Err = PriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "modified_time" | "mtime" | "modified" => Ok(Self::ModifiedTime),
            "path" | "depth" => Ok(Self::Path),
            "size" => Ok(Self::Size),
            other => Err(PriorityError::UnknownCriterion(other.to_string())),
        }
    }
}

/// Direction of a sort key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Larger values rank first
    #[default]
    Descending,
    /// Smaller values rank first
    Ascending,
}

/// One criterion with its direction, written `name[:asc|:desc]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortKey {
    /// Attribute compared
    pub criterion: Criterion,
    /// Direction
    pub order: SortOrder,
}

impl SortKey {
    /// Descending key for a criterion.
    #[must_use]
    pub fn descending(criterion: Criterion) -> Self {
        Self {
            criterion,
            order: SortOrder::Descending,
        }
    }

    /// Ascending key for a criterion.
    #[must_use]
    pub fn ascending(criterion: Criterion) -> Self {
        Self {
            criterion,
            order: SortOrder::Ascending,
        }
    }

    /// Compare two records; `Less` means `a` is preferred.
    #[must_use]
    pub fn compare(&self, a: &FileRecord, b: &FileRecord) -> Ordering {
        let natural = self.criterion.compare(a, b);
        match self.order {
            SortOrder::Ascending => natural,
            SortOrder::Descending => natural.reverse(),
        }
    }
}

impl FromStr for SortKey {
    type Err = PriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, direction) = match s.split_once(':') {
            Some((name, direction)) => (name, Some(direction)),
            None => (s, None),
        };
        let criterion = name.parse()?;
        let order = match direction.map(|d| d.trim().to_lowercase()) {
            None => SortOrder::Descending,
            Some(d) if d == "desc" => SortOrder::Descending,
            Some(d) if d == "asc" => SortOrder::Ascending,
            Some(d) => return Err(PriorityError::UnknownDirection(d)),
        };
        Ok(Self { criterion, order })
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.order {
            SortOrder::Descending => write!(f, "{}", self.criterion.as_str()),
            SortOrder::Ascending => write!(f, "{}:asc", self.criterion.as_str()),
        }
    }
}

/// Parse a list of `name[:dir]` strings.
///
/// # Errors
///
/// Returns [`PriorityError`] for an unknown name or direction, or an empty list.
pub fn parse_sort_keys<S: AsRef<str>>(names: &[S]) -> Result<Vec<SortKey>, PriorityError> {
    if names.is_empty() {
        return Err(PriorityError::Empty);
    }
    names.iter().map(|n| n.as_ref().parse()).collect()
}

/// How a group was ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupRanking {
    /// Ranked normally.
    Ranked {
        /// Members set to priority 0 by keyword
        protected: usize,
        /// Members given a positive priority
        ranked: usize,
    },
    /// Sizes disagree; every member was protected.
    Anomaly,
}

/// Aggregate of one ranking pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankingStats {
    /// Groups ranked normally
    pub ranked_groups: usize,
    /// Groups whose existing priorities were kept
    pub preserved_groups: usize,
    /// Collision anomalies
    pub anomalies: usize,
    /// Members protected by keyword
    pub protected_files: usize,
}

impl RankingStats {
    fn record(&mut self, ranking: GroupRanking) {
        match ranking {
            GroupRanking::Ranked { protected, .. } => {
                self.ranked_groups += 1;
                self.protected_files += protected;
            }
            GroupRanking::Anomaly => self.anomalies += 1,
        }
    }
}

/// Ordered sort keys plus protection keywords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityPolicy {
    keys: Vec<SortKey>,
    protect_keywords: Vec<String>,
}

impl Default for PriorityPolicy {
    fn default() -> Self {
        Self {
            keys: vec![
                SortKey::descending(Criterion::ModifiedTime),
                SortKey::descending(Criterion::Path),
            ],
            protect_keywords: Vec::new(),
        }
    }
}

impl PriorityPolicy {
    /// Size, then path, then modification time.
    #[must_use]
    pub fn legacy() -> Self {
        Self::default().with_keys(vec![
            SortKey::descending(Criterion::Size),
            SortKey::descending(Criterion::Path),
            SortKey::descending(Criterion::ModifiedTime),
        ])
    }

    /// Replace the sort keys. An empty list keeps enumeration order.
    #[must_use]
    pub fn with_keys(mut self, keys: Vec<SortKey>) -> Self {
        self.keys = keys;
        self
    }

    /// Set the protection keywords. Empty keywords are ignored.
    #[must_use]
    pub fn with_protect_keywords(mut self, keywords: Vec<String>) -> Self {
        self.protect_keywords = keywords.into_iter().filter(|k| !k.is_empty()).collect();
        self
    }

    /// Sort keys in order.
    #[must_use]
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Protection keywords.
    #[must_use]
    pub fn protect_keywords(&self) -> &[String] {
        &self.protect_keywords
    }

    /// Compare two records across all keys; `Less` means `a` is preferred.
    #[must_use]
    pub fn compare(&self, a: &FileRecord, b: &FileRecord) -> Ordering {
        self.keys
            .iter()
            .map(|k| k.compare(a, b))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    fn is_protected_path(&self, record: &FileRecord) -> bool {
        is_excluded(&record.path, &self.protect_keywords)
    }

    /// Protect every member of a group whose sizes disagree.
    ///
    /// Returns `true` if the group was an anomaly.
    fn guard_collision(group: &mut DuplicateGroup) -> bool {
        if group.is_size_consistent() {
            return false;
        }
        log::error!(
            "Fingerprint {} matches files of different sizes; protecting all {} members",
            group.fingerprint,
            group.len()
        );
        for record in &mut group.files {
            log::error!("  {} ({} bytes)", record.path.display(), record.size);
            record.priority = Some(0);
        }
        true
    }

    /// Rank one group in place. Member order is left unchanged.
    pub fn rank_group(&self, group: &mut DuplicateGroup) -> GroupRanking {
        if Self::guard_collision(group) {
            return GroupRanking::Anomaly;
        }

        let mut candidates = Vec::with_capacity(group.len());
        let mut protected = 0;
        for (i, record) in group.files.iter_mut().enumerate() {
            if self.is_protected_path(record) {
                record.priority = Some(0);
                protected += 1;
            } else {
                candidates.push(i);
            }
        }

        let files = &group.files;
        candidates.sort_by(|&a, &b| self.compare(&files[a], &files[b]));

        for (rank, &i) in candidates.iter().enumerate() {
            group.files[i].priority = Some(rank as u32 + 1);
        }

        log::trace!(
            "Ranked group {}: {} protected, {} ranked",
            group.fingerprint,
            protected,
            candidates.len()
        );

        GroupRanking::Ranked {
            protected,
            ranked: candidates.len(),
        }
    }

    /// Apply the collision guard and keyword protection to a group that
    /// already carries priorities, without re-ranking it.
    pub fn enforce(&self, group: &mut DuplicateGroup) -> GroupRanking {
        if Self::guard_collision(group) {
            return GroupRanking::Anomaly;
        }

        let mut protected = 0;
        let mut ranked = 0;
        for record in &mut group.files {
            if record.priority != Some(0) && self.is_protected_path(record) {
                record.priority = Some(0);
                protected += 1;
            }
            if !record.is_protected() {
                ranked += 1;
            }
        }
        GroupRanking::Ranked { protected, ranked }
    }
}

/// Rank every group in the index.
pub fn assign_priorities(index: &mut DuplicateIndex, policy: &PriorityPolicy) -> RankingStats {
    let mut stats = RankingStats::default();
    for group in index.groups_mut() {
        stats.record(policy.rank_group(group));
    }
    log::debug!(
        "Ranked {} groups ({} anomalies, {} protected files)",
        stats.ranked_groups,
        stats.anomalies,
        stats.protected_files
    );
    stats
}

/// Keep existing priorities where a group is fully ranked, rank the rest.
///
/// Used for indexes loaded from a report.
pub fn reconcile_priorities(index: &mut DuplicateIndex, policy: &PriorityPolicy) -> RankingStats {
    let mut stats = RankingStats::default();
    for group in index.groups_mut() {
        if group.is_fully_ranked() {
            let ranking = policy.enforce(group);
            if let GroupRanking::Ranked { protected, .. } = ranking {
                stats.preserved_groups += 1;
                stats.protected_files += protected;
            } else {
                stats.anomalies += 1;
            }
        } else {
            stats.record(policy.rank_group(group));
        }
    }
    stats
}
