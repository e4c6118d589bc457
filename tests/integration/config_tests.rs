use dupsweep::actions::Action;
use dupsweep::cli::{AlgorithmArg, ScanArgs};
use dupsweep::config::Settings;
use dupsweep::duplicates::{Criterion, SortKey};
use dupsweep::scanner::HashAlgorithm;
use figment::providers::Serialized;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let figment = figment::Figment::from(Serialized::defaults(Settings::default()));
    let settings: Settings = figment.extract().unwrap();
    assert_eq!(settings.action, Action::Move);
    assert!(settings.keep_best);
    assert_eq!(settings.flush_every, 100);
    assert_eq!(settings.algorithm, HashAlgorithm::Sha256);
}

#[test]
fn test_config_file_then_cli_overrides() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
directories = ["/from/file"]
exclude = [".cache"]
action = "delete"
flush_every = 25
priority_order = ["size", "path:asc"]
"#,
    )
    .unwrap();

    let args = ScanArgs {
        directories: vec![PathBuf::from("/from/cli")],
        dry_run: true,
        algorithm: Some(AlgorithmArg::Blake3),
        ..ScanArgs::default()
    };
    let settings = Settings::load(Some(&config_path), &args).unwrap();

    assert_eq!(settings.directories, vec![PathBuf::from("/from/cli")]);
    assert_eq!(settings.exclude, vec![".cache"]);
    assert_eq!(settings.action, Action::Delete);
    assert_eq!(settings.flush_every, 25);
    assert!(settings.dry_run);
    assert_eq!(settings.algorithm, HashAlgorithm::Blake3);
    assert_eq!(
        settings.sort_keys().unwrap(),
        vec![
            SortKey::descending(Criterion::Size),
            SortKey::ascending(Criterion::Path)
        ]
    );
}

#[test]
fn test_unset_cli_flags_do_not_clobber_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "directories = [\"/a\"]\nkeep_best = false\n").unwrap();

    let settings = Settings::load(Some(&config_path), &ScanArgs::default()).unwrap();
    assert!(!settings.keep_best);
    assert_eq!(settings.directories, vec![PathBuf::from("/a")]);
}

#[test]
fn test_config_load_from_env() {
    std::env::set_var("DUPSWEEP_SKIP_HIDDEN", "true");

    let args = ScanArgs {
        directories: vec![PathBuf::from("/x")],
        ..ScanArgs::default()
    };
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "").unwrap();
    let settings = Settings::load(Some(&config_path), &args).unwrap();

    assert!(settings.skip_hidden);

    std::env::remove_var("DUPSWEEP_SKIP_HIDDEN");
}

#[test]
fn test_missing_explicit_config_is_an_error() {
    let dir = tempdir().unwrap();
    let result = Settings::load(Some(&dir.path().join("absent.toml")), &ScanArgs::default());
    assert!(result.is_err());
}

#[test]
fn test_invalid_criterion_is_reported() {
    let settings = Settings {
        directories: vec![PathBuf::from("/x")],
        priority_order: vec!["colour".into()],
        ..Settings::default()
    };
    let err = settings.sort_keys().unwrap_err();
    assert!(err.to_string().contains("colour"));
}

#[test]
fn test_keyword_files_merge_with_inline_keywords() {
    let dir = tempdir().unwrap();
    let retain_file = dir.path().join("retain.txt");
    fs::write(&retain_file, "# canonical copies\n/originals/\n\n/masters/\n").unwrap();

    let settings = Settings {
        directories: vec![PathBuf::from("/x")],
        retain: vec!["/keep/".into()],
        retain_file: Some(retain_file),
        ..Settings::default()
    };

    assert_eq!(
        settings.retain_keywords().unwrap(),
        vec!["/keep/", "/originals/", "/masters/"]
    );
}

#[test]
fn test_unsupported_action_name_survives_loading() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "directories = [\"/a\"]\naction = \"archive\"\n").unwrap();

    let settings = Settings::load(Some(&config_path), &ScanArgs::default()).unwrap();
    assert_eq!(settings.action, Action::Unsupported("archive".into()));
}
