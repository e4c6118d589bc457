//! Retention actions module.
//!
//! This module provides functionality for:
//! - Splitting each duplicate group into retained and processed files ([`plan`])
//! - Deleting processed files, permanently or via the trash crate ([`delete`])
//! - Moving processed files into a destination or renaming them in place ([`relocate`])
//! - Collision-free destination names ([`naming`])
//! - Destination free-space checks ([`space`])
//! - Running a plan with per-file fault isolation ([`execute`])
//!
//! # Safety
//!
//! Retained files are never touched. Every processed file is re-checked
//! against its scanned size and modification time before it is mutated,
//! and one file's failure never stops the others.
//!
//! # Example
//!
//! ```no_run
//! use dupsweep::actions::{plan_retention, Action, Executor, RetentionConfig};
//! use dupsweep::duplicates::DuplicateIndex;
//!
//! let index = DuplicateIndex::new();
//! let config = RetentionConfig::new(Action::Delete).with_dry_run(true);
//! let plan = plan_retention(&index, &config);
//! let report = Executor::new(config).execute(&plan);
//! println!("{}", report.summary());
//! ```

pub mod delete;
pub mod execute;
pub mod naming;
pub mod plan;
pub mod relocate;
pub mod space;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use bytesize::ByteSize;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use delete::{delete_to_trash, permanent_delete, FileSnapshot};
pub use execute::{ActionObserver, ActionOutcome, Executor, Outcome, RetentionReport};
pub use naming::{destination_name, rename_in_place_target, unique_destination};
pub use plan::{plan_retention, split_group, GroupPlan, Operation, PlannedAction, RetentionPlan};
pub use relocate::{move_file, rename_in_place};
pub use space::{check_space, SpaceProbe, SystemSpaceProbe, VolumeSpace};

/// Default minimum share of the destination volume that must stay free.
pub const DEFAULT_MIN_FREE_RATIO: f64 = 0.05;

/// What happens to files that are not retained.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    /// Remove the file
    Delete,
    /// Relocate the file into a destination, or rename it in place
    Move,
    /// Any other name; each file is left alone with a warning
    Unsupported(String),
}

impl Action {
    /// Parse an action name. Unknown names become [`Action::Unsupported`].
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "delete" => Self::Delete,
            "move" => Self::Move,
            _ => Self::Unsupported(name.to_string()),
        }
    }

    /// Name of the action.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Delete => "delete",
            Self::Move => "move",
            Self::Unsupported(name) => name,
        }
    }
}

impl From<String> for Action {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.as_str().to_string()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How [`Action::Delete`] removes a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeleteMode {
    /// `remove_file`
    #[default]
    Permanent,
    /// Move to the system trash
    Trash,
}

/// Settings for planning and executing retention.
#[derive(Debug, Clone, PartialEq)]
pub struct RetentionConfig {
    /// Action applied to processed files
    pub action: Action,
    /// Move destination; `None` renames in place
    pub destination: Option<PathBuf>,
    /// Log intended actions without touching the filesystem
    pub dry_run: bool,
    /// Permanent or trash deletion
    pub delete_mode: DeleteMode,
    /// Retain the best unprotected member even when a protected copy exists
    pub keep_best: bool,
    /// Fraction of the destination volume that must remain free
    pub min_free_ratio: f64,
    /// Re-check size and modification time before mutating a file
    pub verify_unchanged: bool,
}

impl RetentionConfig {
    /// Defaults for an action.
    #[must_use]
    pub fn new(action: Action) -> Self {
        Self {
            action,
            destination: None,
            dry_run: false,
            delete_mode: DeleteMode::default(),
            keep_best: true,
            min_free_ratio: DEFAULT_MIN_FREE_RATIO,
            verify_unchanged: true,
        }
    }

    /// Set the move destination.
    #[must_use]
    pub fn with_destination(mut self, destination: Option<PathBuf>) -> Self {
        self.destination = destination;
        self
    }

    /// Enable or disable dry-run.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Choose permanent or trash deletion.
    #[must_use]
    pub fn with_delete_mode(mut self, mode: DeleteMode) -> Self {
        self.delete_mode = mode;
        self
    }

    /// Enable or disable retaining the best unprotected member next to protected ones.
    #[must_use]
    pub fn with_keep_best(mut self, keep_best: bool) -> Self {
        self.keep_best = keep_best;
        self
    }

    /// Set the free-space floor as a fraction of volume capacity.
    #[must_use]
    pub fn with_min_free_ratio(mut self, ratio: f64) -> Self {
        self.min_free_ratio = ratio;
        self
    }
}

/// Error type for retention actions.
#[derive(Debug, Error)]
pub enum ActionError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when touching the file.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// File was modified since scan.
    #[error("file modified since scan: {0}")]
    Modified(PathBuf),

    /// Destination has less free space than the file needs.
    #[error("not enough space in {}: need {}, {} available", .path.display(), ByteSize(*.needed), ByteSize(*.available))]
    InsufficientSpace {
        path: PathBuf,
        needed: u64,
        available: u64,
    },

    /// Destination volume is below the free-space floor.
    #[error("{} is nearly full: {} free of {}", .path.display(), ByteSize(*.available), ByteSize(*.total))]
    LowFreeSpace {
        path: PathBuf,
        available: u64,
        total: u64,
    },

    /// Free space of the destination could not be determined.
    #[error("cannot determine free space for {path}: {reason}")]
    SpaceUnknown { path: PathBuf, reason: String },

    /// Every candidate name in the destination is taken.
    #[error("no free file name left in {0}")]
    NoFreeName(PathBuf),

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed { path: PathBuf, message: String },

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ActionError {
    /// Classify an I/O error against the path it concerns.
    #[must_use]
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Whether the file was left alone on purpose rather than failing.
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Modified(_))
    }
}
