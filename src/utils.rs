//! Utility functions for timestamps, string manipulation, and file system checks.
//!
//! This module provides helpers used throughout the application:
//! - Run timestamps in the format the output files use
//! - Filesystem-safe name normalization
//! - String truncation and title casing
//! - File system validation for output directories

use crate::error::Result;
use chrono::Local;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Local timestamp in `YYYY-MM-DDTHH:MM:SS` form.
pub fn timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Make a string safe to use as a file or directory name.
///
/// Percent-encoded sequences are decoded first, then every character outside
/// `[A-Za-z0-9._-]` becomes `-`. Leading dots are stripped so the result can
/// never be `.`/`..` or a hidden file.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(filesystem_safe("how-to%20train"), "how-to-train");
/// assert_eq!(filesystem_safe("../etc"), "-etc");
/// ```
pub fn filesystem_safe(s: &str) -> String {
    let decoded = urlencoding::decode(s)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| s.to_string());
    let cleaned: String = decoded
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at `max` characters with an ellipsis and the number
/// of dropped characters appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{}…(+{} chars)", head, total - max)
    }
}

/// Capitalize the first character of a string.
pub fn upcase(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
    }
}

/// Turn a slug into a display label: `"fat-loss"` becomes `"Fat Loss"`.
pub fn title_from_slug(slug: &str) -> String {
    slug.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| upcase(&w.to_lowercase()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Directory is writable");
    Ok(())
}
