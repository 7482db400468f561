//! Utility functions for string cleanup, source naming, and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - Whitespace collapsing shared by the converter and the taxonomy unifier
//! - Source identifier derivation from collection-unit filenames
//! - UTC offset parsing for configured source defaults
//! - String truncation for log previews
//! - File system validation for the output directory

use chrono::FixedOffset;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs as stdfs;
use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static UTC_OFFSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([+-])(\d{2}):?(\d{2})$").unwrap());

/// Collapse every run of whitespace into one space and trim both ends.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(collapse_whitespace("  Local \n\t News "), "Local News");
/// ```
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_RUN.replace_all(s.trim(), " ").into_owned()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at the last character boundary before `max` bytes
/// and get an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Reduce a source identifier to a bare lowercase hostname.
///
/// Accepts things like `"https://WWW.Example.com/news/"` or
/// `"example.com:443"` and returns `"www.example.com"` / `"example.com"`.
pub fn bare_hostname(source: &str) -> String {
    let s = source.trim();
    let s = s.split_once("://").map(|(_, rest)| rest).unwrap_or(s);
    let s = s.split(['/', '?', '#']).next().unwrap_or("");
    let s = s.rsplit_once('@').map(|(_, host)| host).unwrap_or(s);
    let s = s.split(':').next().unwrap_or("");
    s.trim_end_matches('.').to_lowercase()
}

/// Derive the source domain from a collection-unit filename.
///
/// The collector stores each domain's feed as the domain with dots replaced
/// by underscores, e.g. `athensreview_com.json` → `athensreview.com`.
pub fn source_domain_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    bare_hostname(&stem.replace('_', "."))
}

/// Parse a `±HH:MM` / `±HHMM` / `Z` / `UTC` offset string.
///
/// Returns `None` for anything else, including offsets of 24 hours or more.
pub fn parse_utc_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") || s.eq_ignore_ascii_case("gmt")
    {
        return FixedOffset::east_opt(0);
    }
    let caps = UTC_OFFSET.captures(s)?;
    let hours: i32 = caps[2].parse().ok()?;
    let minutes: i32 = caps[3].parse().ok()?;
    if minutes >= 60 {
        return None;
    }
    let secs = hours * 3600 + minutes * 60;
    if &caps[1] == "-" {
        FixedOffset::west_opt(secs)
    } else {
        FixedOffset::east_opt(secs)
    }
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path).await?;
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Local \n\t News "), "Local News");
        assert_eq!(collapse_whitespace(""), "");
        assert_eq!(collapse_whitespace("one"), "one");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        let s = "ééééé";
        let result = truncate_for_log(s, 3);
        assert!(result.starts_with('é'));
        assert!(result.contains("(+8 bytes)"));
    }

    #[test]
    fn test_bare_hostname() {
        assert_eq!(bare_hostname("https://WWW.Example.com/news/"), "www.example.com");
        assert_eq!(bare_hostname("example.com:443"), "example.com");
        assert_eq!(bare_hostname("athensreview.com"), "athensreview.com");
        assert_eq!(bare_hostname(""), "");
    }

    #[test]
    fn test_source_domain_from_path() {
        let path = PathBuf::from("raw_news_data/2025-11-20/1763657957/athensreview_com.json");
        assert_eq!(source_domain_from_path(&path), "athensreview.com");
    }

    #[test]
    fn test_parse_utc_offset() {
        assert_eq!(parse_utc_offset("-06:00"), FixedOffset::west_opt(6 * 3600));
        assert_eq!(parse_utc_offset("+0530"), FixedOffset::east_opt(5 * 3600 + 30 * 60));
        assert_eq!(parse_utc_offset("Z"), FixedOffset::east_opt(0));
        assert_eq!(parse_utc_offset("central"), None);
        assert_eq!(parse_utc_offset("+25:00"), None);
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b/c");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join("..__probe_write__").exists());
    }
}
