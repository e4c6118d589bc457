//! Command-line interface definitions for dupsweep.
//!
//! This module defines all CLI arguments and subcommands using the clap
//! derive API. Global options control verbosity and the configuration
//! file; `scan` finds and sweeps duplicates, `adjust` edits priorities in
//! a saved report.
//!
//! # Example
//!
//! ```bash
//! # Report what would happen, without touching anything
//! dupsweep scan ~/Photos /mnt/backup --dry-run
//!
//! # Keep anything under an "originals" folder, move the other copies away
//! dupsweep scan ~/Photos --retain originals/ --move-to ~/dupes
//!
//! # Prefer the oldest copy, then the shallowest path
//! dupsweep scan ~/Photos --priority-order modified_time:asc path:asc
//!
//! # Promote every copy under /mnt/backup in a saved report
//! dupsweep adjust -i report.json -o report.json -p /mnt/backup -a 1
//! ```

use std::path::PathBuf;

use bytesize::ByteSize;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::scanner::HashAlgorithm;

/// Find byte-identical files, rank each duplicate set and sweep the extras.
#[derive(Debug, Parser)]
#[command(name = "dupsweep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (TOML). Defaults to the platform config directory.
    #[arg(long, global = true, value_name = "PATH", env = "DUPSWEEP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan directories, rank duplicates and apply the retention action
    Scan(ScanArgs),
    /// Shift the priorities of matching paths in a duplicate report
    Adjust(AdjustArgs),
}

/// Fingerprint algorithm choice on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmArg {
    /// SHA-256
    Sha256,
    /// BLAKE3
    Blake3,
}

impl From<AlgorithmArg> for HashAlgorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Sha256 => Self::Sha256,
            AlgorithmArg::Blake3 => Self::Blake3,
        }
    }
}

/// Arguments for the scan subcommand.
///
/// Every field is optional so that unset flags fall through to the
/// configuration file and environment.
#[derive(Debug, Default, Args, Serialize)]
pub struct ScanArgs {
    /// Directories to search for duplicate files
    #[arg(value_name = "DIR")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub directories: Vec<PathBuf>,

    /// Skip any path containing this substring (repeatable)
    #[arg(short = 'x', long = "exclude", value_name = "KEYWORD")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,

    /// File of exclude keywords, one per line
    #[arg(long, value_name = "PATH")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_file: Option<PathBuf>,

    /// Never touch a path containing this substring (repeatable)
    #[arg(short = 'k', long = "retain", visible_alias = "keyword", value_name = "KEYWORD")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub retain: Vec<String>,

    /// File of retain keywords, one per line
    #[arg(long, value_name = "PATH")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retain_file: Option<PathBuf>,

    /// Action for files that are not retained: delete or move
    #[arg(long, value_name = "ACTION")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Ranking criteria in order: modified_time, path, size (append :asc to flip)
    #[arg(long, num_args = 1.., value_name = "CRITERION")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub priority_order: Vec<String>,

    /// Directory to move files into (without it, files are renamed in place)
    #[arg(long, visible_alias = "move-to-dir", value_name = "DIR")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub move_to: Option<PathBuf>,

    /// Only log what would be done
    #[arg(short = 'n', long, visible_alias = "try-run")]
    #[serde(skip_serializing_if = "is_false")]
    pub dry_run: bool,

    /// Use a saved duplicate report instead of scanning
    #[arg(long, value_name = "PATH")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_in: Option<PathBuf>,

    /// Write the ranked duplicate report to this path
    #[arg(long, value_name = "PATH")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_out: Option<PathBuf>,

    /// Re-rank groups loaded from a report even if they carry priorities
    #[arg(long)]
    #[serde(skip_serializing_if = "is_false")]
    pub rerank: bool,

    /// Identity cache file
    #[arg(long = "cache", value_name = "PATH")]
    #[serde(rename = "cache_path", skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,

    /// Rewrite the identity cache every N files
    #[arg(long, value_name = "N")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flush_every: Option<usize>,

    /// Fingerprint algorithm
    #[arg(long, value_enum)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<AlgorithmArg>,

    /// Delete to the system trash instead of permanently
    #[arg(long)]
    #[serde(skip_serializing_if = "is_false")]
    pub trash: bool,

    /// Also retain the best unranked copy when a protected copy exists
    #[arg(long, value_name = "BOOL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_best: Option<bool>,

    /// Minimum file size to consider (e.g., 1KB, 1MiB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u64>,

    /// Maximum file size to consider (e.g., 1GB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    #[serde(skip_serializing_if = "is_false")]
    pub skip_hidden: bool,

    /// Drop cache entries for files that no longer exist
    #[arg(long)]
    #[serde(skip_serializing_if = "is_false")]
    pub prune_cache: bool,
}

/// Arguments for the adjust subcommand.
#[derive(Debug, Args)]
pub struct AdjustArgs {
    /// Report to read
    #[arg(short, long, value_name = "PATH")]
    pub input: PathBuf,

    /// Report to write (may equal the input)
    #[arg(short, long, value_name = "PATH")]
    pub output: PathBuf,

    /// Case-insensitive substring selecting the paths to adjust
    #[arg(short, long = "path", value_name = "PATTERN")]
    pub pattern: String,

    /// Amount subtracted from each matching priority (negative demotes)
    #[arg(short, long, value_name = "N", allow_hyphen_values = true)]
    pub adjust: i64,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Parse a human-readable size such as `10MB`, `1.5GiB` or `4096`.
///
/// # Errors
///
/// Returns a message if the text is not a size.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }
    if s.starts_with('-') {
        return Err("Size cannot be negative".to_string());
    }
    s.parse::<ByteSize>()
        .map(|b| b.as_u64())
        .map_err(|e| format!("Invalid size '{s}': {e}"))
}
