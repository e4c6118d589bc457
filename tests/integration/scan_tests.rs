use dupsweep::cache::{CacheOptions, IdentityCache};
use dupsweep::duplicates::{DuplicateIndex, IndexBuilder, IndexStats};
use dupsweep::scanner::{HashAlgorithm, ScanError, Walker, WalkerConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

fn build(roots: &[PathBuf], config: WalkerConfig, cache_dir: &TempDir) -> (DuplicateIndex, IndexStats) {
    let walker = Walker::new(roots, config).unwrap();
    let mut cache = IdentityCache::open(
        &cache_dir.path().join("ids.json"),
        CacheOptions {
            flush_every: 2,
            algorithm: HashAlgorithm::Sha256,
        },
    )
    .unwrap();
    let result = IndexBuilder::new(&mut cache).build(walker.walk());
    cache.finish().unwrap();
    result
}

fn write(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();

    let (index, stats) = build(&[dir.path().to_path_buf()], WalkerConfig::default(), &cache_dir);

    assert!(index.is_empty());
    assert_eq!(stats.candidates, 0);
    assert_eq!(stats.groups, 0);
}

#[test]
fn test_scan_unique_files() {
    let dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"content a");
    write(&dir.path().join("b.txt"), b"content b");
    write(&dir.path().join("c.txt"), b"content c");

    let (index, stats) = build(&[dir.path().to_path_buf()], WalkerConfig::default(), &cache_dir);

    assert!(index.is_empty());
    assert_eq!(stats.candidates, 3);
    assert_eq!(stats.hashed, 3);
}

#[test]
fn test_scan_duplicate_files() {
    let dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"duplicate");
    write(&dir.path().join("sub").join("b.txt"), b"duplicate");
    write(&dir.path().join("c.txt"), b"unique");

    let (index, stats) = build(&[dir.path().to_path_buf()], WalkerConfig::default(), &cache_dir);

    assert_eq!(index.len(), 1);
    assert_eq!(index.file_count(), 2);
    assert_eq!(stats.duplicate_files, 2);
    assert_eq!(stats.wasted_bytes, 9);

    let group = index.groups().next().unwrap();
    assert!(group.files.iter().all(|f| f.priority.is_none()));
    assert!(group.files.iter().all(|f| f.extension == ".txt"));
}

#[test]
fn test_scan_across_roots() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    write(&a.path().join("x"), b"shared bytes");
    write(&b.path().join("x"), b"shared bytes");

    let (index, _) = build(
        &[a.path().to_path_buf(), b.path().to_path_buf()],
        WalkerConfig::default(),
        &cache_dir,
    );

    assert_eq!(index.len(), 1);
    assert_eq!(index.file_count(), 2);
}

#[test]
fn test_overlapping_roots_do_not_double_count() {
    let dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    write(&dir.path().join("inner").join("a"), b"one");
    write(&dir.path().join("inner").join("b"), b"one");

    let (index, _) = build(
        &[dir.path().to_path_buf(), dir.path().join("inner")],
        WalkerConfig::default(),
        &cache_dir,
    );

    assert_eq!(index.file_count(), 2);
}

#[test]
fn test_exclude_keyword_prunes_subtree() {
    let dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    write(&dir.path().join("keep").join("a"), b"same");
    write(&dir.path().join("keep").join("b"), b"same");
    write(&dir.path().join("skip_me").join("c"), b"same");

    let config = WalkerConfig::with_excludes(vec!["skip_me".to_string()]);
    let (index, stats) = build(&[dir.path().to_path_buf()], config, &cache_dir);

    assert_eq!(stats.candidates, 2);
    assert_eq!(index.file_count(), 2);
}

#[test]
fn test_size_filters() {
    let dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    write(&dir.path().join("small1"), b"ab");
    write(&dir.path().join("small2"), b"ab");
    write(&dir.path().join("big1"), b"abcdefgh");
    write(&dir.path().join("big2"), b"abcdefgh");

    let config = WalkerConfig {
        min_size: Some(4),
        ..WalkerConfig::default()
    };
    let (index, stats) = build(&[dir.path().to_path_buf()], config, &cache_dir);

    assert_eq!(stats.candidates, 2);
    assert_eq!(index.len(), 1);
    assert_eq!(index.groups().next().unwrap().size(), 8);
}

#[test]
fn test_missing_roots_are_rejected() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope");

    let walker = Walker::new(&[dir.path().to_path_buf(), missing.clone()], WalkerConfig::default()).unwrap();
    assert_eq!(walker.roots().len(), 1);
    assert_eq!(walker.rejected_roots().len(), 1);
    assert_eq!(walker.rejected_roots()[0].0, missing);

    let result = Walker::new(&[missing], WalkerConfig::default());
    assert!(matches!(result, Err(ScanError::NoRoots(1))));
}

#[test]
fn test_walk_is_restartable() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a"), b"1");
    write(&dir.path().join("b"), b"2");

    let walker = Walker::new(&[dir.path().to_path_buf()], WalkerConfig::default()).unwrap();
    let first: Vec<_> = walker.walk().filter_map(Result::ok).map(|e| e.path).collect();
    let second: Vec<_> = walker.walk().filter_map(Result::ok).map(|e| e.path).collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[test]
fn test_shutdown_stops_index_build() {
    let dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    write(&dir.path().join("a"), b"same");
    write(&dir.path().join("b"), b"same");

    let walker = Walker::new(&[dir.path().to_path_buf()], WalkerConfig::default()).unwrap();
    let mut cache = IdentityCache::open(
        &cache_dir.path().join("ids.json"),
        CacheOptions::default(),
    )
    .unwrap();
    let (index, stats) = IndexBuilder::new(&mut cache)
        .with_shutdown_flag(Arc::new(AtomicBool::new(true)))
        .build(walker.walk());

    assert!(stats.interrupted);
    assert!(index.is_empty());
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_not_followed() {
    let dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    write(&dir.path().join("real"), b"linked content");
    std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("link")).unwrap();

    let (index, stats) = build(&[dir.path().to_path_buf()], WalkerConfig::default(), &cache_dir);

    assert_eq!(stats.candidates, 1);
    assert!(index.is_empty());
}
