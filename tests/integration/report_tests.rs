use dupsweep::duplicates::{
    assign_priorities, DuplicateIndex, DuplicateReport, FileRecord, PriorityPolicy, ReportError,
};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, UNIX_EPOCH};
use tempfile::tempdir;

fn ranked_index() -> DuplicateIndex {
    let mut index = DuplicateIndex::new();
    for (path, secs) in [("/data/a/photo.jpg", 10), ("/backup/photo.jpg", 20), ("/data/b/photo.jpg", 30)] {
        index.insert(FileRecord::new(
            PathBuf::from(path),
            42,
            UNIX_EPOCH + Duration::from_secs(secs),
            "abc123".to_string(),
        ));
    }
    assign_priorities(&mut index, &PriorityPolicy::default());
    index
}

#[test]
fn test_report_wire_format() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("report.json");
    DuplicateReport::from_index(&ranked_index()).save(&path).unwrap();

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let group = raw["abc123"].as_array().unwrap();
    assert_eq!(group.len(), 3);
    for entry in group {
        assert_eq!(entry["size"], 42);
        assert_eq!(entry["type"], ".jpg");
        assert!(entry["modified_time"].is_f64());
        assert!(entry["priority"].is_u64());
    }
}

#[test]
fn test_saved_report_reloads_into_same_index() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("report.json");
    let index = ranked_index();
    DuplicateReport::from_index(&index).save(&path).unwrap();

    let reloaded = DuplicateReport::load(&path).unwrap();
    assert!(reloaded.has_complete_priorities());
    assert_eq!(reloaded.into_index(), index);
}

#[test]
fn test_adjust_promotes_matching_paths() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("report.json");
    DuplicateReport::from_index(&ranked_index()).save(&path).unwrap();

    let mut report = DuplicateReport::load(&path).unwrap();
    let matched = report.adjust_priority("/BACKUP/", 5);
    assert_eq!(matched, 1);

    let group = report.group("abc123").unwrap();
    assert_eq!(group[0].path, PathBuf::from("/backup/photo.jpg"));
    assert_eq!(group[0].priority, Some(0));
}

#[test]
fn test_adjust_negative_demotes() {
    let mut report = DuplicateReport::from_index(&ranked_index());
    report.adjust_priority("/data/b/", -10);

    let group = report.group("abc123").unwrap();
    let last = group.last().unwrap();
    assert_eq!(last.path, PathBuf::from("/data/b/photo.jpg"));
    assert_eq!(last.priority, Some(11));
}

#[test]
fn test_missing_priority_field_loads_as_unranked() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("legacy.json");
    fs::write(
        &path,
        r#"{"ff": [
            {"path": "/x/1", "size": 3, "type": "", "modified_time": 1.5},
            {"path": "/x/2", "size": 3, "type": "", "modified_time": 2.5}
        ]}"#,
    )
    .unwrap();

    let report = DuplicateReport::load(&path).unwrap();
    assert!(!report.has_complete_priorities());
    let index = report.into_index();
    assert_eq!(index.len(), 1);
    assert!(index.groups().all(|g| !g.is_fully_ranked()));
}

#[test]
fn test_load_errors_name_the_path() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    assert!(matches!(
        DuplicateReport::load(&missing),
        Err(ReportError::Io { path, .. }) if path == missing
    ));

    let garbage = dir.path().join("garbage.json");
    fs::write(&garbage, "[1, 2").unwrap();
    assert!(matches!(
        DuplicateReport::load(&garbage),
        Err(ReportError::Parse { path, .. }) if path == garbage
    ));
}
