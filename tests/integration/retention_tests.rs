use dupsweep::actions::{
    plan_retention, Action, ActionError, ActionObserver, ActionOutcome, Executor, Operation,
    Outcome, RetentionConfig, SpaceProbe, VolumeSpace,
};
use dupsweep::duplicates::{assign_priorities, DuplicateIndex, FileRecord, PriorityPolicy};
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::{Duration, UNIX_EPOCH};
use tempfile::tempdir;

struct FixedProbe(VolumeSpace);

impl SpaceProbe for FixedProbe {
    fn space_for(&self, _path: &Path) -> Result<VolumeSpace, ActionError> {
        Ok(self.0)
    }
}

#[derive(Default)]
struct Recorder(Mutex<Vec<PathBuf>>);

impl ActionObserver for Recorder {
    fn on_outcome(&self, outcome: &ActionOutcome) {
        self.0.lock().unwrap().push(outcome.path.clone());
    }
}

fn roomy() -> Box<dyn SpaceProbe> {
    Box::new(FixedProbe(VolumeSpace::new(1 << 40, 1 << 39)))
}

/// Write `count` identical files with increasing mtimes and index them.
fn duplicate_files(dir: &Path, count: usize, content: &[u8]) -> (DuplicateIndex, Vec<PathBuf>) {
    let mut index = DuplicateIndex::new();
    let mut paths = Vec::new();
    for i in 0..count {
        let path = dir.join(format!("copy{i}.dat"));
        fs::write(&path, content).unwrap();
        let secs = 1_600_000_000 + i as i64;
        set_file_mtime(&path, FileTime::from_unix_time(secs, 0)).unwrap();
        let modified = UNIX_EPOCH + Duration::from_secs(secs as u64);
        index.insert(FileRecord::new(
            path.clone(),
            content.len() as u64,
            modified,
            "f00d".to_string(),
        ));
        paths.push(path);
    }
    assign_priorities(&mut index, &PriorityPolicy::default());
    (index, paths)
}

// ==== Space Guard Tests ====

#[test]
fn test_insufficient_space_leaves_file_in_place() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("dest");
    let (index, paths) = duplicate_files(dir.path(), 2, &[1u8; 100]);

    let config = RetentionConfig::new(Action::Move).with_destination(Some(dest.clone()));
    let plan = plan_retention(&index, &config);
    let report = Executor::new(config)
        .with_probe(Box::new(FixedProbe(VolumeSpace::new(1_000_000, 50))))
        .execute(&plan);

    assert_eq!(report.skipped_count(), 1);
    assert!(!report.has_failures());
    assert!(paths.iter().all(|p| p.exists()));
}

#[test]
fn test_low_free_ratio_refuses_move() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("dest");
    let (index, paths) = duplicate_files(dir.path(), 2, b"payload");

    let config = RetentionConfig::new(Action::Move).with_destination(Some(dest));
    let plan = plan_retention(&index, &config);
    let report = Executor::new(config)
        .with_probe(Box::new(FixedProbe(VolumeSpace::new(1_000_000, 40_000))))
        .execute(&plan);

    assert_eq!(report.skipped_count(), 1);
    assert!(paths.iter().all(|p| p.exists()));
}

// ==== Move Tests ====

#[test]
fn test_move_resolves_name_collisions() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("dest");
    let (index, paths) = duplicate_files(dir.path(), 2, b"payload");

    let config = RetentionConfig::new(Action::Move).with_destination(Some(dest.clone()));
    let plan = plan_retention(&index, &config);
    let Operation::MoveTo(planned) = &plan.groups[0].actions[0].operation else {
        panic!("expected a move");
    };
    fs::create_dir_all(&dest).unwrap();
    fs::write(planned, b"squatter").unwrap();

    let report = Executor::new(config).with_probe(roomy()).execute(&plan);

    assert_eq!(report.done_count(), 1);
    let Outcome::Done(Operation::MoveTo(actual)) = &report.outcomes[0].outcome else {
        panic!("expected a completed move");
    };
    assert_ne!(actual, planned);
    assert!(actual.to_string_lossy().ends_with(".1"));
    assert_eq!(fs::read(planned).unwrap(), b"squatter");
    assert_eq!(fs::read(actual).unwrap(), b"payload");
    // Oldest copy is processed, newest kept
    assert!(!paths[0].exists());
    assert!(paths[1].exists());
}

#[test]
fn test_dry_run_creates_nothing() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("dest");
    let (index, paths) = duplicate_files(dir.path(), 3, b"payload");

    let config = RetentionConfig::new(Action::Move)
        .with_destination(Some(dest.clone()))
        .with_dry_run(true);
    let plan = plan_retention(&index, &config);
    let report = Executor::new(config)
        .with_probe(Box::new(FixedProbe(VolumeSpace::new(10, 0))))
        .execute(&plan);

    assert_eq!(report.planned_count(), 2);
    assert_eq!(report.bytes_planned(), 14);
    assert!(!dest.exists());
    assert!(paths.iter().all(|p| p.exists()));
}

// ==== Delete Tests ====

#[test]
fn test_delete_keeps_single_best_copy() {
    let dir = tempdir().unwrap();
    let (index, paths) = duplicate_files(dir.path(), 4, b"same bytes");

    let config = RetentionConfig::new(Action::Delete);
    let plan = plan_retention(&index, &config);
    let report = Executor::new(config).execute(&plan);

    assert_eq!(report.done_count(), 3);
    assert_eq!(report.bytes_done(), 30);
    assert_eq!(report.retained, 1);
    let survivors: Vec<_> = paths.iter().filter(|p| p.exists()).collect();
    assert_eq!(survivors, vec![&paths[3]]);
}

#[test]
fn test_vanished_file_is_skipped() {
    let dir = tempdir().unwrap();
    let (index, paths) = duplicate_files(dir.path(), 2, b"same");
    fs::remove_file(&paths[0]).unwrap();

    let config = RetentionConfig::new(Action::Delete);
    let plan = plan_retention(&index, &config);
    let report = Executor::new(config).execute(&plan);

    assert_eq!(report.skipped_count(), 1);
    assert!(!report.has_failures());
    assert!(paths[1].exists());
}

#[test]
fn test_failure_does_not_stop_other_groups() {
    let dir = tempdir().unwrap();
    let bogus = dir.path().join("bogus_dir");
    fs::create_dir(&bogus).unwrap();
    let keeper = dir.path().join("keep.dat");
    let older = dir.path().join("older.dat");
    let newer = dir.path().join("newer.dat");
    for path in [&keeper, &older, &newer] {
        fs::write(path, b"bytes").unwrap();
    }

    let record = |path: &Path, fingerprint: &str, priority: u32| {
        let mut record = FileRecord::new(path.to_path_buf(), 5, UNIX_EPOCH, fingerprint.to_string());
        record.priority = Some(priority);
        record
    };
    let mut index = DuplicateIndex::new();
    // A directory posing as a processed copy cannot be removed as a file
    index.insert(record(&bogus, "beef", 2));
    index.insert(record(&keeper, "beef", 1));
    index.insert(record(&older, "cafe", 2));
    index.insert(record(&newer, "cafe", 1));

    let mut config = RetentionConfig::new(Action::Delete);
    config.verify_unchanged = false;
    let plan = plan_retention(&index, &config);
    let report = Executor::new(config).execute(&plan);

    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.done_count(), 1);
    assert!(bogus.exists());
    assert!(keeper.exists());
    assert!(!older.exists());
    assert!(newer.exists());
}

// ==== Observer and Shutdown Tests ====

#[test]
fn test_observer_sees_every_outcome() {
    let dir = tempdir().unwrap();
    let (index, _) = duplicate_files(dir.path(), 3, b"x");

    let recorder = Arc::new(Recorder::default());
    let config = RetentionConfig::new(Action::Delete).with_dry_run(true);
    let plan = plan_retention(&index, &config);
    Executor::new(config)
        .with_observer(recorder.clone())
        .execute(&plan);

    assert_eq!(recorder.0.lock().unwrap().len(), 2);
}

#[test]
fn test_shutdown_skips_remaining_actions() {
    let dir = tempdir().unwrap();
    let (index, paths) = duplicate_files(dir.path(), 3, b"x");

    let flag = Arc::new(AtomicBool::new(true));
    let config = RetentionConfig::new(Action::Delete);
    let plan = plan_retention(&index, &config);
    let report = Executor::new(config).with_shutdown_flag(flag).execute(&plan);

    assert_eq!(report.skipped_count(), 2);
    assert!(paths.iter().all(|p| p.exists()));
}
