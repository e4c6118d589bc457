//! Progress reporting utilities using indicatif.
//!
//! [`Progress`] implements [`ProgressCallback`] for the scan phases and
//! [`ActionObserver`] for the retention phase, drawing one bar per phase.
//! Core components only see the traits; the binary decides whether a
//! terminal display is attached.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::actions::{ActionObserver, ActionOutcome, Outcome, RetentionReport};

/// Phase names reported by the index builder.
pub mod phase {
    /// Directory enumeration
    pub const WALKING: &str = "walking";
    /// Fingerprinting
    pub const HASHING: &str = "hashing";
}

/// Progress callback for scan phases.
///
/// Implement this trait to receive progress updates while the
/// duplicate index is built.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase (see [`phase`])
    /// * `total` - Total number of items, or 0 if unknown
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Items processed so far (1-based)
    /// * `path` - Path being processed, or empty
    fn on_progress(&self, current: usize, path: &str);

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message.
    fn on_message(&self, _message: &str) {}
}

/// Progress reporter using indicatif.
pub struct Progress {
    multi: MultiProgress,
    active: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use dupsweep::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        let multi = if quiet {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };
        Self {
            multi,
            active: Mutex::new(None),
            quiet,
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn start(&self, bar: ProgressBar, message: &str) {
        if self.quiet {
            return;
        }
        let bar = self.multi.add(bar);
        bar.set_message(message.to_string());
        if let Ok(mut active) = self.active.lock() {
            if let Some(previous) = active.replace(bar) {
                previous.finish_and_clear();
            }
        }
    }

    fn update(&self, position: usize, message: Option<String>) {
        if let Ok(active) = self.active.lock() {
            if let Some(bar) = active.as_ref() {
                bar.set_position(position as u64);
                if let Some(message) = message {
                    bar.set_message(message);
                }
            }
        }
    }

    fn finish(&self, message: &str) {
        if let Ok(mut active) = self.active.lock() {
            if let Some(bar) = active.take() {
                bar.finish_with_message(message.to_string());
            }
        }
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        match phase {
            phase::WALKING => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(Self::spinner_style());
                bar.enable_steady_tick(Duration::from_millis(100));
                self.start(bar, "Walking directories");
            }
            _ => {
                let bar = ProgressBar::new(total as u64);
                bar.set_style(Self::bar_style());
                self.start(bar, "Fingerprinting");
            }
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }
        let message = (!path.is_empty()).then(|| truncate_path(path, 30));
        self.update(current, message);
    }

    fn on_phase_end(&self, phase: &str) {
        match phase {
            phase::WALKING => self.finish("Walking complete"),
            _ => self.finish("Fingerprinting complete"),
        }
    }

    fn on_message(&self, message: &str) {
        if let Ok(active) = self.active.lock() {
            if let Some(bar) = active.as_ref() {
                bar.set_message(message.to_string());
            }
        }
    }
}

impl ActionObserver for Progress {
    fn on_start(&self, total: usize) {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(Self::bar_style());
        self.start(bar, "Processing duplicates");
    }

    fn on_outcome(&self, outcome: &ActionOutcome) {
        if let Ok(active) = self.active.lock() {
            if let Some(bar) = active.as_ref() {
                bar.inc(1);
                if let Outcome::Failed(reason) = &outcome.outcome {
                    bar.set_message(format!("failed: {}", truncate_path(reason, 40)));
                }
            }
        }
    }

    fn on_complete(&self, report: &RetentionReport) {
        self.finish(&report.summary());
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let chars = file_name.chars().count();
    if chars + 4 > max_len {
        let tail: String = file_name.chars().skip(chars.saturating_sub(max_len - 3)).collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
