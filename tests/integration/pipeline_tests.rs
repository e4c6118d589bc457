use dupsweep::actions::{Action, ActionError, Outcome, SpaceProbe, VolumeSpace};
use dupsweep::app::{Sweep, SweepSummary};
use dupsweep::config::Settings;
use dupsweep::duplicates::DuplicateReport;
use dupsweep::error::ExitCode;
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

const T1: i64 = 1_600_000_000;
const T2: i64 = 1_600_000_100;

struct Roomy;

impl SpaceProbe for Roomy {
    fn space_for(&self, _path: &Path) -> Result<VolumeSpace, ActionError> {
        Ok(VolumeSpace::new(1 << 40, 1 << 39))
    }
}

/// `root/A/x` (older) and `root/B/x` (newer), 100 identical bytes.
fn scenario() -> (TempDir, PathBuf, PathBuf) {
    let root = tempdir().unwrap();
    let a = root.path().join("A").join("x");
    let b = root.path().join("B").join("x");
    for (path, mtime) in [(&a, T1), (&b, T2)] {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, [7u8; 100]).unwrap();
        set_file_mtime(path, FileTime::from_unix_time(mtime, 0)).unwrap();
    }
    (root, a, b)
}

fn settings(root: &TempDir) -> Settings {
    Settings {
        directories: vec![root.path().join("A"), root.path().join("B")],
        cache_path: Some(root.path().join("cache").join("ids.json")),
        report_out: Some(root.path().join("report.json")),
        ..Settings::default()
    }
}

fn run(settings: &Settings) -> SweepSummary {
    Sweep::new(settings).with_probe(Box::new(Roomy)).run().unwrap()
}

fn priority_of(root: &TempDir, file: &Path) -> Option<u32> {
    let report = DuplicateReport::load(&root.path().join("report.json")).unwrap();
    let wanted = file.canonicalize().unwrap_or_else(|_| file.to_path_buf());
    let priority = report
        .iter()
        .flat_map(|(_, entries)| entries)
        .find(|e| e.path == wanted)
        .and_then(|e| e.priority);
    priority
}

#[test]
fn test_newest_copy_wins_and_older_is_deleted() {
    let (root, a, b) = scenario();
    let a_canon = a.canonicalize().unwrap();
    let b_canon = b.canonicalize().unwrap();
    let settings = Settings {
        action: Action::Delete,
        ..settings(&root)
    };

    let summary = run(&settings);

    assert_eq!(summary.groups, 1);
    assert_eq!(summary.exit_code(), ExitCode::Success);
    let report = DuplicateReport::load(&root.path().join("report.json")).unwrap();
    let entries: Vec<_> = report.iter().flat_map(|(_, e)| e).collect();
    let prio = |p: &Path| entries.iter().find(|e| e.path == p).and_then(|e| e.priority);
    assert_eq!(prio(&b_canon), Some(1));
    assert_eq!(prio(&a_canon), Some(2));

    assert!(!a.exists());
    assert!(b.exists());
}

#[test]
fn test_ascending_mtime_prefers_older_copy() {
    let (root, a, b) = scenario();
    let settings = Settings {
        action: Action::Delete,
        priority_order: vec!["modified_time:asc".into(), "path".into()],
        ..settings(&root)
    };

    run(&settings);

    assert!(a.exists());
    assert!(!b.exists());
}

#[test]
fn test_retain_keyword_with_keep_best_keeps_both() {
    let (root, a, b) = scenario();
    let settings = Settings {
        retain: vec!["/B/".into()],
        move_to: Some(root.path().join("dupes")),
        ..settings(&root)
    };

    let summary = run(&settings);

    assert_eq!(priority_of(&root, &b), Some(0));
    assert_eq!(priority_of(&root, &a), Some(1));
    assert_eq!(summary.plan.action_count(), 0);
    assert!(a.exists());
    assert!(b.exists());
    assert!(!root.path().join("dupes").exists());
}

#[test]
fn test_retain_keyword_without_keep_best_moves_unprotected_copy() {
    let (root, a, b) = scenario();
    let dupes = root.path().join("dupes");
    let settings = Settings {
        retain: vec!["/B/".into()],
        move_to: Some(dupes.clone()),
        keep_best: false,
        ..settings(&root)
    };

    let summary = run(&settings);

    assert_eq!(summary.exit_code(), ExitCode::Success);
    assert!(!a.exists());
    assert!(b.exists());

    let moved: Vec<_> = fs::read_dir(&dupes)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(moved.len(), 1);
    assert!(moved[0].contains("___"));
    assert!(moved[0].ends_with("A___x"));
    assert_eq!(fs::read(dupes.join(&moved[0])).unwrap(), vec![7u8; 100]);
}

#[test]
fn test_keep_best_false_without_protection_still_keeps_one() {
    let (root, a, b) = scenario();
    let settings = Settings {
        action: Action::Delete,
        keep_best: false,
        ..settings(&root)
    };

    run(&settings);

    assert!(!a.exists());
    assert!(b.exists());
}

#[test]
fn test_move_without_destination_renames_in_place() {
    let (root, a, b) = scenario();
    let settings = settings(&root);

    let first = run(&settings);
    let renamed = a.with_file_name("x.dupsweep");
    assert!(renamed.exists());
    assert!(!a.exists());
    assert!(b.exists());
    assert_eq!(first.report.as_ref().unwrap().done_count(), 1);

    let second = run(&settings);
    let report = second.report.unwrap();
    assert_eq!(report.done_count(), 0);
    assert!(matches!(&report.outcomes[0].outcome, Outcome::Skipped(r) if r == "already renamed"));
    assert!(renamed.exists());
}

#[test]
fn test_dry_run_is_idempotent_and_touches_nothing() {
    let (root, a, b) = scenario();
    let dupes = root.path().join("dupes");
    let settings = Settings {
        dry_run: true,
        move_to: Some(dupes.clone()),
        ..settings(&root)
    };

    let first = run(&settings);
    let second = run(&settings);

    assert_eq!(first.plan, second.plan);
    assert_eq!(first.plan.action_count(), 1);
    assert_eq!(first.report.as_ref().unwrap().planned_count(), 1);
    assert!(a.exists());
    assert!(b.exists());
    assert!(!dupes.exists());

    // The cache is still written so the second run reuses fingerprints
    assert_eq!(second.cache.unwrap().hits, 2);
}

#[test]
fn test_move_destination_does_not_hide_similarly_named_siblings() {
    let root = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let archive = root.path().join("dupes_archive");
    let dupes = root.path().join("dupes");
    fs::create_dir_all(&archive).unwrap();
    fs::create_dir_all(&dupes).unwrap();
    fs::write(archive.join("a"), b"archived copy").unwrap();
    fs::write(archive.join("b"), b"archived copy").unwrap();
    fs::write(dupes.join("earlier"), b"archived copy").unwrap();

    let settings = Settings {
        directories: vec![root.path().to_path_buf()],
        cache_path: Some(cache_dir.path().join("ids.json")),
        move_to: Some(dupes),
        dry_run: true,
        ..Settings::default()
    };
    let summary = run(&settings);

    assert_eq!(summary.index.as_ref().unwrap().candidates, 2);
    assert_eq!(summary.groups, 1);
    assert_eq!(summary.plan.action_count(), 1);
}

#[test]
fn test_no_duplicates_exit_code() {
    let root = tempdir().unwrap();
    fs::create_dir_all(root.path().join("A")).unwrap();
    fs::create_dir_all(root.path().join("B")).unwrap();
    fs::write(root.path().join("A").join("x"), b"one").unwrap();
    fs::write(root.path().join("B").join("x"), b"two").unwrap();

    let summary = run(&settings(&root));

    assert_eq!(summary.groups, 0);
    assert_eq!(summary.exit_code(), ExitCode::NoDuplicates);
}

#[test]
fn test_collision_group_is_left_untouched() {
    let root = tempdir().unwrap();
    let small = root.path().join("small.bin");
    let large = root.path().join("large.bin");
    fs::write(&small, b"abc").unwrap();
    fs::write(&large, b"abcdef").unwrap();

    let report_in = root.path().join("collision.json");
    let json = serde_json::json!({
        "deadbeef": [
            {"path": small, "size": 3, "type": ".bin", "modified_time": 1.0, "priority": null},
            {"path": large, "size": 6, "type": ".bin", "modified_time": 2.0, "priority": null}
        ]
    });
    fs::write(&report_in, serde_json::to_string(&json).unwrap()).unwrap();

    let settings = Settings {
        report_in: Some(report_in),
        action: Action::Delete,
        ..Settings::default()
    };
    let summary = run(&settings);

    assert_eq!(summary.ranking.anomalies, 1);
    assert_eq!(summary.plan.action_count(), 0);
    assert!(small.exists());
    assert!(large.exists());
}

#[test]
fn test_report_round_trip_skips_rescan() {
    let (root, a, b) = scenario();
    let first = Settings {
        dry_run: true,
        ..settings(&root)
    };
    run(&first);

    let second = Settings {
        directories: Vec::new(),
        report_out: None,
        report_in: Some(root.path().join("report.json")),
        action: Action::Delete,
        ..settings(&root)
    };
    let summary = run(&second);

    assert!(summary.index.is_none());
    assert_eq!(summary.ranking.preserved_groups, 1);
    assert!(!a.exists());
    assert!(b.exists());
}

#[test]
fn test_changed_file_is_skipped_before_mutation() {
    let (root, a, b) = scenario();
    let first = Settings {
        dry_run: true,
        ..settings(&root)
    };
    run(&first);

    // Same size, different mtime: the saved report no longer describes it
    set_file_mtime(&a, FileTime::from_unix_time(T1 + 5, 0)).unwrap();

    let second = Settings {
        directories: Vec::new(),
        report_out: None,
        report_in: Some(root.path().join("report.json")),
        action: Action::Delete,
        ..settings(&root)
    };
    let summary = run(&second);
    let report = summary.report.unwrap();

    assert_eq!(report.skipped_count(), 1);
    assert!(a.exists());
    assert!(b.exists());
}

#[test]
fn test_unsupported_action_is_a_no_op() {
    let (root, a, b) = scenario();
    let settings = Settings {
        action: Action::parse("shred"),
        ..settings(&root)
    };

    let summary = run(&settings);

    let report = summary.report.unwrap();
    assert_eq!(report.skipped_count(), 1);
    assert!(a.exists());
    assert!(b.exists());
}
