//! Retention planning.
//!
//! Planning is pure: it reads a ranked [`DuplicateIndex`] and decides, per
//! group, which files are retained and what happens to the rest. Nothing
//! touches the filesystem until the plan is handed to an
//! [`Executor`](super::Executor).
//!
//! A group retains every protected member (priority 0 or unranked) plus
//! the unprotected member with the lowest positive priority. With
//! `keep_best` off, that best member is only retained when the group has no
//! protected member.

use std::path::PathBuf;
use std::time::SystemTime;

use super::naming::{destination_name, rename_in_place_target};
use super::{Action, RetentionConfig};
use crate::duplicates::{DuplicateIndex, FileRecord};

/// What will happen to one processed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Remove the file
    Delete,
    /// Move to this path (a free variant is chosen if it is taken)
    MoveTo(PathBuf),
    /// Rename in place to this path (a free variant is chosen if it is taken)
    RenameTo(PathBuf),
    /// Unknown action name; the file is left alone
    Unsupported(String),
}

impl Operation {
    /// Short verb for logs.
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::MoveTo(_) => "move",
            Self::RenameTo(_) => "rename",
            Self::Unsupported(_) => "ignore",
        }
    }
}

/// One processed file and its operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAction {
    /// File to act on
    pub path: PathBuf,
    /// Size recorded at scan time
    pub size: u64,
    /// Modification time recorded at scan time
    pub modified: SystemTime,
    /// Content fingerprint
    pub fingerprint: String,
    /// Assigned priority
    pub priority: Option<u32>,
    /// What to do
    pub operation: Operation,
}

/// Decision for one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPlan {
    /// Shared fingerprint
    pub fingerprint: String,
    /// Files left untouched
    pub retained: Vec<PathBuf>,
    /// Files acted on, in group order
    pub actions: Vec<PlannedAction>,
}

/// Decisions for a whole index, in fingerprint order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPlan {
    /// Per-group plans
    pub groups: Vec<GroupPlan>,
}

impl RetentionPlan {
    /// Number of retained files.
    #[must_use]
    pub fn retained_count(&self) -> usize {
        self.groups.iter().map(|g| g.retained.len()).sum()
    }

    /// Number of planned actions.
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.groups.iter().map(|g| g.actions.len()).sum()
    }

    /// Bytes held by files with a planned action.
    #[must_use]
    pub fn action_bytes(&self) -> u64 {
        self.actions().map(|a| a.size).sum()
    }

    /// All planned actions across groups.
    pub fn actions(&self) -> impl Iterator<Item = &PlannedAction> {
        self.groups.iter().flat_map(|g| g.actions.iter())
    }

    /// Whether there is nothing to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.action_count() == 0
    }
}

/// Split a group's members into `(retained, processed)`, both in group order.
#[must_use]
pub fn split_group(files: &[FileRecord], keep_best: bool) -> (Vec<&FileRecord>, Vec<&FileRecord>) {
    let has_protected = files.iter().any(FileRecord::is_protected);
    let best = files
        .iter()
        .enumerate()
        .filter(|(_, f)| !f.is_protected())
        .min_by_key(|(_, f)| f.priority)
        .map(|(i, _)| i)
        .filter(|_| keep_best || !has_protected);

    let mut retained = Vec::new();
    let mut processed = Vec::new();
    for (i, file) in files.iter().enumerate() {
        if file.is_protected() || Some(i) == best {
            retained.push(file);
        } else {
            processed.push(file);
        }
    }
    (retained, processed)
}

fn operation_for(file: &FileRecord, config: &RetentionConfig) -> Operation {
    match &config.action {
        Action::Delete => Operation::Delete,
        Action::Move => match &config.destination {
            Some(dir) => Operation::MoveTo(dir.join(destination_name(&file.fingerprint, &file.path))),
            None => Operation::RenameTo(rename_in_place_target(&file.path)),
        },
        Action::Unsupported(name) => Operation::Unsupported(name.clone()),
    }
}

/// Build the retention plan for a ranked index.
#[must_use]
pub fn plan_retention(index: &DuplicateIndex, config: &RetentionConfig) -> RetentionPlan {
    let groups = index
        .groups()
        .map(|group| {
            let (retained, processed) = split_group(&group.files, config.keep_best);
            GroupPlan {
                fingerprint: group.fingerprint.clone(),
                retained: retained.iter().map(|f| f.path.clone()).collect(),
                actions: processed
                    .into_iter()
                    .map(|f| PlannedAction {
                        path: f.path.clone(),
                        size: f.size,
                        modified: f.modified,
                        fingerprint: f.fingerprint.clone(),
                        priority: f.priority,
                        operation: operation_for(f, config),
                    })
                    .collect(),
            }
        })
        .collect();

    let plan = RetentionPlan { groups };
    log::debug!(
        "Planned {} actions, {} files retained",
        plan.action_count(),
        plan.retained_count()
    );
    plan
}
