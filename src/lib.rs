//! dupsweep - duplicate file sweeper
//!
//! Finds byte-identical files across one or more directory trees, ranks the
//! copies in each duplicate set, and deletes, moves or renames every copy
//! except the best one. Content fingerprints are kept in a persistent
//! identity cache so repeat runs only hash files that changed.
//!
//! # Layout
//!
//! - [`scanner`]: directory walking and content hashing
//! - [`cache`]: the identity cache (path, size, mtime to fingerprint)
//! - [`duplicates`]: the duplicate index, ranking and saved reports
//! - [`actions`]: retention planning and execution
//! - [`app`]: wires a run together
//!
//! # Example
//!
//! ```rust,no_run
//! use dupsweep::app::Sweep;
//! use dupsweep::config::Settings;
//!
//! let settings = Settings {
//!     directories: vec!["/home/me/Photos".into()],
//!     dry_run: true,
//!     ..Settings::default()
//! };
//! let summary = Sweep::new(&settings).run().expect("sweep");
//! println!("{} duplicate groups", summary.groups);
//! ```

pub mod actions;
pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod persist;
pub mod progress;
pub mod scanner;
pub mod signal;

pub use app::run_app;
