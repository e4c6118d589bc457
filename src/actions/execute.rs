//! Retention plan execution.
//!
//! # Overview
//!
//! The [`Executor`] walks a [`RetentionPlan`] file by file. Every file is
//! handled on its own: a failure is logged, recorded in the
//! [`RetentionReport`] and the next file proceeds.
//!
//! For each file the executor:
//!
//! 1. Ignores unsupported actions with a warning.
//! 2. In dry-run mode, logs the intended operation and stops there.
//! 3. Re-checks the file's size and modification time against the scan.
//! 4. Deletes, moves (after a free-space check) or renames it.
//!
//! Outcomes are returned as values and also streamed to an optional
//! [`ActionObserver`].

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytesize::ByteSize;

use super::delete::{delete_to_trash, permanent_delete, FileSnapshot};
use super::naming::{is_renamed, unique_destination};
use super::plan::{Operation, PlannedAction, RetentionPlan};
use super::relocate::{move_file, rename_in_place};
use super::space::{check_space, SpaceProbe, SystemSpaceProbe};
use super::{ActionError, DeleteMode, RetentionConfig};

/// Result for one processed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Performed; moves and renames carry the final path
    Done(Operation),
    /// Dry-run: would have been performed
    Planned(Operation),
    /// Deliberately left alone
    Skipped(String),
    /// Attempted and failed
    Failed(String),
}

/// Outcome paired with the file it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    /// File acted on
    pub path: PathBuf,
    /// Recorded size
    pub size: u64,
    /// What happened
    pub outcome: Outcome,
}

/// Receives per-file outcomes as they happen.
pub trait ActionObserver: Send + Sync {
    /// Called before the first file.
    fn on_start(&self, _total: usize) {}

    /// Called after each file.
    fn on_outcome(&self, outcome: &ActionOutcome);

    /// Called when the plan is finished.
    fn on_complete(&self, _report: &RetentionReport) {}
}

/// Every outcome of one execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionReport {
    /// Per-file outcomes in plan order
    pub outcomes: Vec<ActionOutcome>,
    /// Files retained by the plan
    pub retained: usize,
    /// Whether this was a dry run
    pub dry_run: bool,
}

impl RetentionReport {
    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.outcome)).count()
    }

    /// Files acted on.
    #[must_use]
    pub fn done_count(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Done(_)))
    }

    /// Files that would have been acted on.
    #[must_use]
    pub fn planned_count(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Planned(_)))
    }

    /// Files left alone on purpose.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(_)))
    }

    /// Files whose action failed.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    /// Whether any action failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }

    /// Bytes removed from their original location.
    #[must_use]
    pub fn bytes_done(&self) -> u64 {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Done(_)))
            .map(|o| o.size)
            .sum()
    }

    /// Bytes a dry run would have processed.
    #[must_use]
    pub fn bytes_planned(&self) -> u64 {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Planned(_)))
            .map(|o| o.size)
            .sum()
    }

    /// One-line human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.dry_run {
            format!(
                "Dry run: {} file(s) ({}) would be processed, {} retained, {} skipped",
                self.planned_count(),
                ByteSize(self.bytes_planned()),
                self.retained,
                self.skipped_count()
            )
        } else if self.has_failures() {
            format!(
                "Processed {} file(s) ({}), {} retained, {} skipped, {} failed",
                self.done_count(),
                ByteSize(self.bytes_done()),
                self.retained,
                self.skipped_count(),
                self.failed_count()
            )
        } else {
            format!(
                "Processed {} file(s) ({}), {} retained, {} skipped",
                self.done_count(),
                ByteSize(self.bytes_done()),
                self.retained,
                self.skipped_count()
            )
        }
    }
}

/// Runs a [`RetentionPlan`].
pub struct Executor {
    config: RetentionConfig,
    probe: Box<dyn SpaceProbe>,
    observer: Option<Arc<dyn ActionObserver>>,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Executor {
    /// Executor using the system space probe.
    #[must_use]
    pub fn new(config: RetentionConfig) -> Self {
        Self {
            config,
            probe: Box::new(SystemSpaceProbe),
            observer: None,
            shutdown_flag: None,
        }
    }

    /// Replace the space probe.
    #[must_use]
    pub fn with_probe(mut self, probe: Box<dyn SpaceProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Stream outcomes to an observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ActionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Skip remaining files once the flag is set.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &RetentionConfig {
        &self.config
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Execute every planned action.
    pub fn execute(&self, plan: &RetentionPlan) -> RetentionReport {
        let mut report = RetentionReport {
            outcomes: Vec::with_capacity(plan.action_count()),
            retained: plan.retained_count(),
            dry_run: self.config.dry_run,
        };

        if let Some(o) = &self.observer {
            o.on_start(plan.action_count());
        }

        for action in plan.actions() {
            let outcome = if self.is_shutdown_requested() {
                Outcome::Skipped("interrupted".to_string())
            } else {
                self.execute_one(action)
            };
            let outcome = ActionOutcome {
                path: action.path.clone(),
                size: action.size,
                outcome,
            };
            if let Some(o) = &self.observer {
                o.on_outcome(&outcome);
            }
            report.outcomes.push(outcome);
        }

        if let Some(o) = &self.observer {
            o.on_complete(&report);
        }
        report
    }

    fn execute_one(&self, action: &PlannedAction) -> Outcome {
        let path = &action.path;

        match &action.operation {
            Operation::Unsupported(name) => return unsupported(name, path),
            Operation::RenameTo(_) if is_renamed(path) => {
                log::debug!("{} is already renamed", path.display());
                return Outcome::Skipped("already renamed".to_string());
            }
            _ => {}
        }

        if self.config.dry_run {
            log_intent(action);
            return Outcome::Planned(action.operation.clone());
        }

        if self.config.verify_unchanged {
            let snapshot = FileSnapshot::new(path.clone(), action.size, action.modified);
            if let Err(e) = snapshot.verify() {
                return classify(path, e);
            }
        }

        let result = match &action.operation {
            Operation::Delete => self.delete(path),
            Operation::MoveTo(target) => self.relocate(action, target),
            Operation::RenameTo(_) => rename_in_place(path).map(|target| {
                log::info!("Renamed: {} to {}", path.display(), target.display());
                Operation::RenameTo(target)
            }),
            Operation::Unsupported(name) => return unsupported(name, path),
        };

        match result {
            Ok(op) => Outcome::Done(op),
            Err(e) => classify(path, e),
        }
    }

    fn delete(&self, path: &Path) -> Result<Operation, ActionError> {
        match self.config.delete_mode {
            DeleteMode::Permanent => permanent_delete(path)?,
            DeleteMode::Trash => delete_to_trash(path)?,
        };
        Ok(Operation::Delete)
    }

    fn relocate(&self, action: &PlannedAction, target: &Path) -> Result<Operation, ActionError> {
        let dir = target.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(dir).map_err(|e| ActionError::from_io(dir, e))?;

        let space = self.probe.space_for(dir)?;
        check_space(space, action.size, self.config.min_free_ratio, dir)?;

        let target = if target.symlink_metadata().is_ok() {
            unique_destination(dir, &action.fingerprint, &action.path)?
        } else {
            target.to_path_buf()
        };

        move_file(&action.path, &target)?;
        log::info!("Moved: {} to {}", action.path.display(), target.display());
        Ok(Operation::MoveTo(target))
    }
}

fn unsupported(name: &str, path: &Path) -> Outcome {
    log::warn!("Unsupported action '{}', leaving {}", name, path.display());
    Outcome::Skipped(format!("unsupported action '{name}'"))
}

fn log_intent(action: &PlannedAction) {
    let path = action.path.display();
    match &action.operation {
        Operation::Delete => log::info!("Would delete: {}", path),
        Operation::MoveTo(t) => log::info!("Would move: {} to {}", path, t.display()),
        Operation::RenameTo(t) => log::info!("Would rename: {} to {}", path, t.display()),
        Operation::Unsupported(_) => {}
    }
}

fn classify(path: &Path, error: ActionError) -> Outcome {
    match error {
        e if e.is_skip() => {
            log::warn!("Skipping {}: {}", path.display(), e);
            Outcome::Skipped(e.to_string())
        }
        e @ (ActionError::InsufficientSpace { .. }
        | ActionError::LowFreeSpace { .. }
        | ActionError::SpaceUnknown { .. }) => {
            log::error!("Not moving {}: {}", path.display(), e);
            Outcome::Skipped(e.to_string())
        }
        e => {
            log::error!("Failed to process {}: {}", path.display(), e);
            Outcome::Failed(e.to_string())
        }
    }
}
