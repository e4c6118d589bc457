//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults ([`Settings::default`])
//! 2. A TOML file: `--config <PATH>`, or `config.toml` in the platform
//!    config directory if it exists
//! 3. `DUPSWEEP_*` environment variables (`DUPSWEEP_DRY_RUN=true`)
//! 4. Command-line flags that were actually given
//!
//! # Example
//!
//! ```toml
//! directories = ["/home/me/Photos", "/mnt/backup/Photos"]
//! exclude = [".thumbnails"]
//! retain = ["/originals/"]
//! action = "move"
//! move_to = "/home/me/dupes"
//! priority_order = ["modified_time", "path"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::actions::{Action, DeleteMode, RetentionConfig, DEFAULT_MIN_FREE_RATIO};
use crate::cache::{CacheOptions, DEFAULT_FLUSH_EVERY};
use crate::duplicates::{parse_sort_keys, PriorityPolicy, SortKey};
use crate::scanner::{HashAlgorithm, WalkerConfig};

/// Prefix of environment variables read into [`Settings`].
pub const ENV_PREFIX: &str = "DUPSWEEP_";

/// Resolved configuration for a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directories to scan
    pub directories: Vec<PathBuf>,
    /// Exclude keywords
    pub exclude: Vec<String>,
    /// File of exclude keywords
    pub exclude_file: Option<PathBuf>,
    /// Retain (protection) keywords
    pub retain: Vec<String>,
    /// File of retain keywords
    pub retain_file: Option<PathBuf>,
    /// Action for processed files
    pub action: Action,
    /// Ranking criteria, empty for the default
    pub priority_order: Vec<String>,
    /// Move destination
    pub move_to: Option<PathBuf>,
    /// Log only
    pub dry_run: bool,
    /// Report to load instead of scanning
    pub report_in: Option<PathBuf>,
    /// Report to write after ranking
    pub report_out: Option<PathBuf>,
    /// Re-rank groups loaded from a report
    pub rerank: bool,
    /// Identity cache file, or the platform default
    pub cache_path: Option<PathBuf>,
    /// Files between cache rewrites
    pub flush_every: usize,
    /// Fingerprint algorithm
    pub algorithm: HashAlgorithm,
    /// Delete to trash
    pub trash: bool,
    /// Retain the best unprotected copy next to protected ones
    pub keep_best: bool,
    /// Minimum file size
    pub min_size: Option<u64>,
    /// Maximum file size
    pub max_size: Option<u64>,
    /// Skip dot-files
    pub skip_hidden: bool,
    /// Fraction of the destination volume that must stay free
    pub min_free_ratio: f64,
    /// Drop cache entries for missing files
    pub prune_cache: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            exclude: Vec::new(),
            exclude_file: None,
            retain: Vec::new(),
            retain_file: None,
            action: Action::Move,
            priority_order: Vec::new(),
            move_to: None,
            dry_run: false,
            report_in: None,
            report_out: None,
            rerank: false,
            cache_path: None,
            flush_every: DEFAULT_FLUSH_EVERY,
            algorithm: HashAlgorithm::default(),
            trash: false,
            keep_best: true,
            min_size: None,
            max_size: None,
            skip_hidden: false,
            min_free_ratio: DEFAULT_MIN_FREE_RATIO,
            prune_cache: false,
        }
    }
}

impl Settings {
    /// Defaults, config file and environment, without command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named config file does not exist.
    pub fn figment(config_file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        match config_file {
            Some(path) => {
                if !path.is_file() {
                    bail!("config file {} does not exist", path.display());
                }
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Some(path) = default_config_path().filter(|p| p.is_file()) {
                    log::debug!("Using config file {}", path.display());
                    figment = figment.merge(Toml::file(path));
                }
            }
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Load settings with command-line overrides on top.
    ///
    /// `overrides` should serialize only the flags that were given.
    ///
    /// # Errors
    ///
    /// Returns an error if any layer is malformed or the result is invalid.
    pub fn load<T: Serialize>(config_file: Option<&Path>, overrides: &T) -> Result<Self> {
        let settings: Self = Self::figment(config_file)?
            .merge(Serialized::defaults(overrides))
            .extract()
            .context("invalid configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.directories.is_empty() && self.report_in.is_none() {
            bail!("no directories to scan (give at least one, or --report-in)");
        }
        if let (Some(min), Some(max)) = (self.min_size, self.max_size) {
            if min > max {
                bail!("min_size ({min}) is larger than max_size ({max})");
            }
        }
        if !(0.0..1.0).contains(&self.min_free_ratio) {
            bail!(
                "min_free_ratio must be in [0, 1), got {}",
                self.min_free_ratio
            );
        }
        if self.flush_every == 0 {
            bail!("flush_every must be at least 1");
        }
        Ok(())
    }

    /// Exclude keywords from the list and the keyword file.
    ///
    /// # Errors
    ///
    /// Returns an error if the keyword file cannot be read.
    pub fn exclude_keywords(&self) -> Result<Vec<String>> {
        merge_keywords(&self.exclude, self.exclude_file.as_deref())
    }

    /// Retain keywords from the list and the keyword file.
    ///
    /// # Errors
    ///
    /// Returns an error if the keyword file cannot be read.
    pub fn retain_keywords(&self) -> Result<Vec<String>> {
        merge_keywords(&self.retain, self.retain_file.as_deref())
    }

    /// Parsed ranking criteria, or the default order when none are configured.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown criterion or direction.
    pub fn sort_keys(&self) -> Result<Vec<SortKey>> {
        if self.priority_order.is_empty() {
            return Ok(PriorityPolicy::default().keys().to_vec());
        }
        Ok(parse_sort_keys(&self.priority_order)?)
    }

    /// Identity cache location.
    #[must_use]
    pub fn resolved_cache_path(&self) -> PathBuf {
        self.cache_path
            .clone()
            .or_else(default_cache_path)
            .unwrap_or_else(|| PathBuf::from(".dupsweep_cache.json"))
    }

    /// Identity cache options.
    #[must_use]
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            flush_every: self.flush_every,
            algorithm: self.algorithm,
        }
    }

    /// Walker filters for the given exclude keywords.
    #[must_use]
    pub fn walker_config(&self, exclude: Vec<String>) -> WalkerConfig {
        let mut config = WalkerConfig::with_excludes(exclude);
        config.skip_hidden = self.skip_hidden;
        config.min_size = self.min_size;
        config.max_size = self.max_size;
        config
    }

    /// Retention settings.
    #[must_use]
    pub fn retention_config(&self) -> RetentionConfig {
        let mode = if self.trash {
            DeleteMode::Trash
        } else {
            DeleteMode::Permanent
        };
        RetentionConfig::new(self.action.clone())
            .with_destination(self.move_to.clone())
            .with_dry_run(self.dry_run)
            .with_delete_mode(mode)
            .with_keep_best(self.keep_best)
            .with_min_free_ratio(self.min_free_ratio)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "dupsweep")
}

/// `config.toml` in the platform config directory.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().join("config.toml"))
}

/// `identity_cache.json` in the platform cache directory.
#[must_use]
pub fn default_cache_path() -> Option<PathBuf> {
    project_dirs().map(|d| d.cache_dir().join("identity_cache.json"))
}

/// Read a keyword file: one keyword per line, blank lines and `#` comments ignored.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn read_keyword_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("cannot read keyword file {}", path.display()))?;
    Ok(parse_keywords(&content))
}

fn parse_keywords(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn merge_keywords(inline: &[String], file: Option<&Path>) -> Result<Vec<String>> {
    let mut keywords: Vec<String> = inline.iter().filter(|k| !k.is_empty()).cloned().collect();
    if let Some(path) = file {
        for keyword in read_keyword_file(path)? {
            if !keywords.contains(&keyword) {
                keywords.push(keyword);
            }
        }
    }
    Ok(keywords)
}
