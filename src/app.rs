//! Run orchestration.
//!
//! [`Sweep`] wires the components together for one run:
//!
//! ```text
//! Walker → IndexBuilder (IdentityCache) → assign_priorities
//!        → [report_out] → plan_retention → Executor
//! ```
//!
//! With `report_in` set, the walker and cache are skipped and the index is
//! rebuilt from the saved report. [`run_app`] is the entry point used by
//! the binary.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use bytesize::ByteSize;

use crate::actions::{
    plan_retention, ActionObserver, Executor, RetentionPlan, RetentionReport, SpaceProbe,
};
use crate::cache::{CacheStats, IdentityCache};
use crate::cli::{AdjustArgs, Cli, Commands, ScanArgs};
use crate::config::Settings;
use crate::duplicates::{
    assign_priorities, reconcile_priorities, DuplicateIndex, DuplicateReport, IndexBuilder,
    IndexStats, PriorityPolicy, RankingStats,
};
use crate::error::ExitCode;
use crate::logging::init_logging;
use crate::progress::{Progress, ProgressCallback};
use crate::scanner::{Walker, WalkerConfig};
use crate::signal::install_handler;

/// What one sweep did.
#[derive(Debug, Clone, Default)]
pub struct SweepSummary {
    /// Index build counters, when a scan ran
    pub index: Option<IndexStats>,
    /// Identity cache counters, when a scan ran
    pub cache: Option<CacheStats>,
    /// Ranking counters
    pub ranking: RankingStats,
    /// Number of duplicate groups
    pub groups: usize,
    /// Retention decisions
    pub plan: RetentionPlan,
    /// Execution outcomes, absent when nothing ran
    pub report: Option<RetentionReport>,
    /// Whether Ctrl+C stopped the run
    pub interrupted: bool,
}

impl SweepSummary {
    /// Exit code for this run.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        if self.interrupted {
            ExitCode::Interrupted
        } else if self.groups == 0 {
            ExitCode::NoDuplicates
        } else if self.report.as_ref().is_some_and(RetentionReport::has_failures)
            || self.index.as_ref().is_some_and(IndexStats::had_errors)
        {
            ExitCode::PartialSuccess
        } else {
            ExitCode::Success
        }
    }
}

/// One scan-rank-retain run.
pub struct Sweep<'a> {
    settings: &'a Settings,
    progress: Option<Arc<dyn ProgressCallback>>,
    observer: Option<Arc<dyn ActionObserver>>,
    probe: Option<Box<dyn SpaceProbe>>,
    shutdown_flag: Arc<AtomicBool>,
}

impl<'a> Sweep<'a> {
    /// Prepare a run with the given settings.
    #[must_use]
    pub fn new(settings: &'a Settings) -> Self {
        Self {
            settings,
            progress: None,
            observer: None,
            probe: None,
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Report scan progress.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Stream action outcomes.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ActionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Replace the destination space probe.
    #[must_use]
    pub fn with_probe(mut self, probe: Box<dyn SpaceProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Poll this flag for Ctrl+C.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = flag;
        self
    }

    /// Execute the run.
    ///
    /// # Errors
    ///
    /// Fails only for run-level problems: unreadable keyword files, bad
    /// criteria, no scannable directory, a cache lock failure, or an
    /// unreadable or unwritable report.
    pub fn run(self) -> Result<SweepSummary> {
        let settings = self.settings;
        let exclude = settings.exclude_keywords()?;
        let retain = settings.retain_keywords()?;
        let keys = settings.sort_keys()?;
        let mut summary = SweepSummary::default();

        let index = match &settings.report_in {
            Some(path) => {
                let index = DuplicateReport::load(path)
                    .with_context(|| format!("cannot use report {}", path.display()))?
                    .into_index();
                log::info!("Loaded {} duplicate groups from {}", index.len(), path.display());

                let mut protect = retain;
                protect.extend(exclude);
                let policy = PriorityPolicy::default()
                    .with_keys(keys)
                    .with_protect_keywords(protect);
                let mut index = index;
                summary.ranking = if settings.rerank {
                    assign_priorities(&mut index, &policy)
                } else {
                    reconcile_priorities(&mut index, &policy)
                };
                index
            }
            None => {
                let mut walker_config = settings.walker_config(exclude);
                if let Some(dest) = &settings.move_to {
                    let dest = dest
                        .canonicalize()
                        .or_else(|_| std::path::absolute(dest))
                        .unwrap_or_else(|_| dest.clone());
                    log::debug!("Excluding move destination {} from the scan", dest.display());
                    walker_config.exclude_dirs.push(dest);
                }
                let (index, stats, cache) = self.scan(walker_config)?;
                summary.interrupted =
                    stats.interrupted || self.shutdown_flag.load(Ordering::SeqCst);
                summary.index = Some(stats);
                summary.cache = cache;
                if summary.interrupted {
                    return Ok(summary);
                }

                let policy = PriorityPolicy::default()
                    .with_keys(keys)
                    .with_protect_keywords(retain);
                let mut index = index;
                summary.ranking = assign_priorities(&mut index, &policy);
                index
            }
        };
        summary.groups = index.len();

        if let Some(path) = &settings.report_out {
            DuplicateReport::from_index(&index)
                .save(path)
                .with_context(|| format!("cannot write report {}", path.display()))?;
        }

        if index.is_empty() {
            log::info!("No duplicates found");
            return Ok(summary);
        }
        log_groups(&index);

        if self.shutdown_flag.load(Ordering::SeqCst) {
            summary.interrupted = true;
            return Ok(summary);
        }

        let config = settings.retention_config();
        summary.plan = plan_retention(&index, &config);

        let mut executor = Executor::new(config).with_shutdown_flag(self.shutdown_flag.clone());
        if let Some(probe) = self.probe {
            executor = executor.with_probe(probe);
        }
        if let Some(observer) = self.observer {
            executor = executor.with_observer(observer);
        }
        let report = executor.execute(&summary.plan);
        log::info!("{}", report.summary());

        summary.interrupted = self.shutdown_flag.load(Ordering::SeqCst);
        summary.report = Some(report);
        Ok(summary)
    }

    fn scan(
        &self,
        walker_config: WalkerConfig,
    ) -> Result<(DuplicateIndex, IndexStats, Option<CacheStats>)> {
        let settings = self.settings;
        let walker = Walker::new(&settings.directories, walker_config)
            .context("nothing to scan")?
            .with_shutdown_flag(self.shutdown_flag.clone());
        for (root, reason) in walker.rejected_roots() {
            log::warn!("Skipping {}: {}", root.display(), reason);
        }

        let cache_path = settings.resolved_cache_path();
        let mut cache = IdentityCache::open(&cache_path, settings.cache_options())
            .with_context(|| format!("cannot open identity cache {}", cache_path.display()))?;

        let mut builder = IndexBuilder::new(&mut cache).with_shutdown_flag(self.shutdown_flag.clone());
        if let Some(progress) = &self.progress {
            builder = builder.with_progress(progress.clone());
        }
        let (index, stats) = builder.build(walker.walk());

        if settings.prune_cache && !stats.interrupted {
            cache.prune_missing();
        }

        let cache_stats = match cache.finish() {
            Ok(s) => {
                log::info!(
                    "Identity cache: {} reused, {} hashed, {} failed",
                    s.hits,
                    s.misses,
                    s.failures
                );
                Some(s)
            }
            Err(e) => {
                log::error!("Identity cache was not saved: {}", e);
                None
            }
        };

        log::info!(
            "Found {} duplicate groups among {} files ({} reclaimable)",
            stats.groups,
            stats.candidates,
            ByteSize(stats.wasted_bytes)
        );
        Ok((index, stats, cache_stats))
    }
}

fn log_groups(index: &DuplicateIndex) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    for group in index.groups() {
        log::debug!("Group {} ({} bytes each):", group.fingerprint, group.size());
        for file in &group.files {
            let priority = file
                .priority
                .map_or_else(|| "-".to_string(), |p| p.to_string());
            log::debug!("  [{}] {}", priority, file.path.display());
        }
    }
}

/// Run the parsed command line.
///
/// # Errors
///
/// Returns run-level failures; per-file problems are reflected in the exit code.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    init_logging(cli.verbose, cli.quiet);

    match &cli.command {
        Commands::Scan(args) => run_scan(cli.config.as_deref(), args, cli.quiet),
        Commands::Adjust(args) => run_adjust(args),
    }
}

fn run_scan(config: Option<&Path>, args: &ScanArgs, quiet: bool) -> Result<ExitCode> {
    let settings = Settings::load(config, args)?;
    let handler = install_handler()?;
    let progress = Arc::new(Progress::new(quiet));

    let summary = Sweep::new(&settings)
        .with_progress(progress.clone())
        .with_observer(progress)
        .with_shutdown_flag(handler.flag())
        .run()?;

    if !quiet {
        if let Some(report) = &summary.report {
            println!("{}", report.summary());
        } else if summary.groups == 0 && !summary.interrupted {
            println!("No duplicates found");
        }
    }
    Ok(summary.exit_code())
}

fn run_adjust(args: &AdjustArgs) -> Result<ExitCode> {
    let mut report = DuplicateReport::load(&args.input)
        .with_context(|| format!("cannot read report {}", args.input.display()))?;
    let matched = report.adjust_priority(&args.pattern, args.adjust);
    report
        .save(&args.output)
        .with_context(|| format!("cannot write report {}", args.output.display()))?;
    if matched == 0 {
        log::warn!("No path matched '{}'", args.pattern);
    }
    Ok(ExitCode::Success)
}
