//! Destination file names for relocated duplicates.
//!
//! A moved file is named after its fingerprint and its original path with
//! every separator replaced by `___`:
//!
//! ```text
//! /home/u/docs/report.pdf  →  <fingerprint>___home___u___docs___report.pdf
//! ```
//!
//! Names are capped at [`MAX_NAME_BYTES`]. The fingerprint is always kept in
//! full; when the flattened path does not fit, its head is dropped so the
//! file name and nearest directories survive.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::ActionError;

/// Longest file name most filesystems accept.
pub const MAX_NAME_BYTES: usize = 255;

/// Replacement for path separators in flattened names.
pub const SEPARATOR_FILLER: &str = "___";

/// Suffix appended when a file is renamed in place.
pub const RENAME_SUFFIX: &str = ".dupsweep";

/// Numeric suffixes tried before giving up on a destination.
const MAX_COLLISION_SUFFIX: usize = 9999;

/// Flatten a path into a single name component.
#[must_use]
pub fn flatten_path(path: &Path) -> String {
    let text = path.to_string_lossy();
    let mut flat = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        if std::path::is_separator(c) || (cfg!(windows) && c == ':') {
            flat.push_str(SEPARATOR_FILLER);
        } else {
            flat.push(c);
        }
    }
    flat
}

/// Longest suffix of `text` that fits in `budget` bytes and starts on a char boundary.
fn tail_within(text: &str, budget: usize) -> &str {
    if text.len() <= budget {
        return text;
    }
    let mut start = text.len() - budget;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

fn compose(fingerprint: &str, flat: &str, suffix: &str) -> String {
    let flat = flat.trim_start_matches(SEPARATOR_FILLER);
    let fixed = fingerprint.len() + SEPARATOR_FILLER.len() + suffix.len();
    let budget = MAX_NAME_BYTES.saturating_sub(fixed);
    let tail = tail_within(flat, budget);

    let mut name = String::with_capacity(MAX_NAME_BYTES);
    name.push_str(tail_within(fingerprint, MAX_NAME_BYTES.saturating_sub(suffix.len())));
    if !tail.is_empty() {
        name.push_str(SEPARATOR_FILLER);
        name.push_str(tail);
    }
    name.push_str(suffix);
    name
}

/// Destination file name for a fingerprinted file, at most [`MAX_NAME_BYTES`] bytes.
#[must_use]
pub fn destination_name(fingerprint: &str, path: &Path) -> String {
    compose(fingerprint, &flatten_path(path), "")
}

/// First free destination path in `dir`.
///
/// The plain name is tried first, then `.1`, `.2`, ... within the same
/// byte budget.
///
/// # Errors
///
/// Returns [`ActionError::NoFreeName`] if every candidate exists.
pub fn unique_destination(dir: &Path, fingerprint: &str, path: &Path) -> Result<PathBuf, ActionError> {
    let flat = flatten_path(path);
    let candidate = dir.join(compose(fingerprint, &flat, ""));
    if !exists(&candidate) {
        return Ok(candidate);
    }
    for n in 1..=MAX_COLLISION_SUFFIX {
        let candidate = dir.join(compose(fingerprint, &flat, &format!(".{n}")));
        if !exists(&candidate) {
            log::debug!(
                "Destination name taken, using {}",
                candidate.display()
            );
            return Ok(candidate);
        }
    }
    Err(ActionError::NoFreeName(dir.to_path_buf()))
}

/// `<path>.dupsweep`, the in-place rename target.
#[must_use]
pub fn rename_in_place_target(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(RENAME_SUFFIX);
    PathBuf::from(name)
}

/// First free in-place rename target: `<path>.dupsweep`, then `.dupsweep.1`, ...
///
/// # Errors
///
/// Returns [`ActionError::NoFreeName`] if every candidate exists.
pub fn unique_rename_target(path: &Path) -> Result<PathBuf, ActionError> {
    let base = rename_in_place_target(path);
    if !exists(&base) {
        return Ok(base);
    }
    for n in 1..=MAX_COLLISION_SUFFIX {
        let mut name = OsString::from(base.as_os_str());
        name.push(format!(".{n}"));
        let candidate = PathBuf::from(name);
        if !exists(&candidate) {
            return Ok(candidate);
        }
    }
    Err(ActionError::NoFreeName(
        path.parent().unwrap_or(Path::new("")).to_path_buf(),
    ))
}

/// Whether a path already carries the in-place rename suffix.
#[must_use]
pub fn is_renamed(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().ends_with(RENAME_SUFFIX))
}

fn exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}
