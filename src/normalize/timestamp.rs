//! Source date string → UTC epoch seconds.
//!
//! Parsers are tried in a fixed order and the first success wins:
//!
//! 1. RFC 3339 (`2025-11-20T14:30:00-06:00`, `…Z`)
//! 2. ISO 8601 variants with an explicit offset (no colon, space separator,
//!    fractional seconds)
//! 3. RFC 2822 (`Thu, 20 Nov 2025 14:30:00 -0600`)
//! 4. Bare epoch seconds (10 digits) or milliseconds (13 digits)
//! 5. Source patterns without an offset (`November 20, 2025 2:30 PM`,
//!    `2025-11-20 14:30:00`, …), which only succeed when the caller supplies
//!    the source's documented [`SourceZone`]
//!
//! A parse that yields no unambiguous offset is a failure, and failure is
//! reported as `None`, never as a guessed instant. Local times that fall in
//! a daylight-saving gap or overlap of a named zone are failures too.

use crate::utils::parse_utc_offset;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Documented time zone of a source, applied to dates that carry no offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceZone {
    /// A constant offset such as `-06:00`.
    Fixed(FixedOffset),
    /// An IANA zone such as `America/Chicago`, daylight saving included.
    Named(Tz),
}

impl SourceZone {
    /// Parse `±HH:MM`, `±HHMM`, `Z`/`UTC`/`GMT` or an IANA zone name.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        parse_utc_offset(s)
            .map(SourceZone::Fixed)
            .or_else(|| s.parse::<Tz>().ok().map(SourceZone::Named))
    }

    /// UTC epoch seconds of a local wall-clock time in this zone.
    fn resolve(&self, local: &NaiveDateTime) -> Option<i64> {
        match self {
            SourceZone::Fixed(offset) => offset
                .from_local_datetime(local)
                .single()
                .map(|dt| dt.timestamp()),
            SourceZone::Named(tz) => tz.from_local_datetime(local).single().map(|dt| dt.timestamp()),
        }
    }
}

impl fmt::Display for SourceZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceZone::Fixed(offset) => write!(f, "{offset}"),
            SourceZone::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}

/// Explicit-offset layouts beyond what RFC 3339 accepts.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
];

/// Offset-less date-time layouts seen in TownNews feeds and article pages.
const LOCAL_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%B %d, %Y %I:%M %p",
    "%b %d, %Y %I:%M %p",
    "%A, %B %d, %Y %I:%M %p",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %H:%M",
];

const LOCAL_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%A, %B %d, %Y", "%m/%d/%Y"];

static MERIDIEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b([ap])\.\s?m\.?").unwrap());
static UTC_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s*\b(?:UTC|GMT)$").unwrap());
static EPOCH_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{10}(\d{3})?$").unwrap());

/// Resolve a source date expression to UTC epoch seconds.
///
/// `source_tz_hint` is the source's documented time zone; it is only
/// consulted for expressions that carry no offset of their own. Returns
/// `None` for a missing, empty or unparseable expression.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(reconcile(Some("2025-11-20T14:30:00-06:00"), None), Some(1_763_670_600));
/// assert_eq!(reconcile(Some("not a date"), None), None);
/// ```
pub fn reconcile(date_expr: Option<&str>, source_tz_hint: Option<SourceZone>) -> Option<i64> {
    let raw = date_expr?.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(dt) = parse_with_offset(raw) {
        return Some(dt.timestamp());
    }
    if EPOCH_DIGITS.is_match(raw) {
        let n: i64 = raw.parse().ok()?;
        return Some(if raw.len() == 13 { n / 1000 } else { n });
    }

    let cleaned = normalize_expr(raw);
    if cleaned != raw {
        if let Some(dt) = parse_with_offset(&cleaned) {
            return Some(dt.timestamp());
        }
    }
    // A trailing UTC/GMT zone name is an explicit zero offset.
    if let Some(stripped) = strip_utc_suffix(&cleaned) {
        let utc = SourceZone::Fixed(FixedOffset::east_opt(0)?);
        return utc.resolve(&parse_local(&stripped)?);
    }

    let zone = source_tz_hint?;
    zone.resolve(&parse_local(&cleaned)?)
}

fn parse_with_offset(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .or_else(|| {
            OFFSET_FORMATS
                .iter()
                .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
        })
        .or_else(|| DateTime::parse_from_rfc2822(s).ok())
}

fn parse_local(s: &str) -> Option<NaiveDateTime> {
    LOCAL_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            LOCAL_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Spell `a.m.`/`p.m.` as `AM`/`PM` and collapse whitespace.
fn normalize_expr(s: &str) -> String {
    let s = MERIDIEM.replace_all(s, |caps: &regex::Captures| format!("{}M", caps[1].to_uppercase()));
    crate::utils::collapse_whitespace(&s)
}

fn strip_utc_suffix(s: &str) -> Option<String> {
    if !UTC_SUFFIX.is_match(s) {
        return None;
    }
    Some(UTC_SUFFIX.replace(s, "").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn central() -> Option<SourceZone> {
        FixedOffset::west_opt(6 * 3600).map(SourceZone::Fixed)
    }

    fn chicago() -> Option<SourceZone> {
        SourceZone::parse("America/Chicago")
    }

    #[test]
    fn test_iso8601_with_offset() {
        assert_eq!(
            reconcile(Some("2025-11-20T14:30:00-06:00"), None),
            Some(1_763_670_600)
        );
    }

    #[test]
    fn test_iso8601_zulu_and_fraction() {
        assert_eq!(reconcile(Some("2025-11-20T20:30:00Z"), None), Some(1_763_670_600));
        assert_eq!(
            reconcile(Some("2025-11-20T20:30:00.250Z"), None),
            Some(1_763_670_600)
        );
    }

    #[test]
    fn test_iso8601_offset_without_colon_and_space_separator() {
        assert_eq!(
            reconcile(Some("2025-11-20T14:30:00-0600"), None),
            Some(1_763_670_600)
        );
        assert_eq!(
            reconcile(Some("2025-11-20 14:30:00-0600"), None),
            Some(1_763_670_600)
        );
    }

    #[test]
    fn test_rfc2822() {
        assert_eq!(
            reconcile(Some("Thu, 20 Nov 2025 14:30:00 -0600"), None),
            Some(1_763_670_600)
        );
        assert_eq!(
            reconcile(Some("Thu, 20 Nov 2025 20:30:00 GMT"), None),
            Some(1_763_670_600)
        );
    }

    #[test]
    fn test_epoch_digits() {
        assert_eq!(reconcile(Some("1763670600"), None), Some(1_763_670_600));
        assert_eq!(reconcile(Some("1763670600000"), None), Some(1_763_670_600));
    }

    #[test]
    fn test_trailing_utc_name_is_explicit_offset() {
        assert_eq!(
            reconcile(Some("2025-11-20 20:30:00 UTC"), None),
            Some(1_763_670_600)
        );
    }

    #[test]
    fn test_local_patterns_need_a_hint() {
        assert_eq!(reconcile(Some("November 20, 2025 2:30 PM"), None), None);
        assert_eq!(
            reconcile(Some("November 20, 2025 2:30 PM"), central()),
            Some(1_763_670_600)
        );
        assert_eq!(
            reconcile(Some("Nov 20, 2025 2:30 p.m."), central()),
            Some(1_763_670_600)
        );
        assert_eq!(
            reconcile(Some("2025-11-20 14:30:00"), central()),
            Some(1_763_670_600)
        );
    }

    #[test]
    fn test_offset_in_string_wins_over_hint() {
        assert_eq!(
            reconcile(Some("2025-11-20T20:30:00+00:00"), central()),
            Some(1_763_670_600)
        );
    }

    #[test]
    fn test_date_only_is_local_midnight() {
        // 2025-11-20T00:00:00-06:00
        assert_eq!(reconcile(Some("2025-11-20"), central()), Some(1_763_618_400));
    }

    #[test]
    fn test_unparseable_and_empty() {
        assert_eq!(reconcile(Some("not a date"), None), None);
        assert_eq!(reconcile(Some("not a date"), central()), None);
        assert_eq!(reconcile(Some("   "), None), None);
        assert_eq!(reconcile(None, central()), None);
        assert_eq!(reconcile(Some("2025-13-45T99:00:00Z"), None), None);
    }

    #[test]
    fn test_source_zone_parse() {
        assert_eq!(
            SourceZone::parse("-06:00"),
            FixedOffset::west_opt(6 * 3600).map(SourceZone::Fixed)
        );
        assert_eq!(
            SourceZone::parse(" America/Chicago "),
            Some(SourceZone::Named(chrono_tz::America::Chicago))
        );
        assert_eq!(SourceZone::parse("Central"), None);
        assert_eq!(chicago().unwrap().to_string(), "America/Chicago");
    }

    #[test]
    fn test_named_zone_follows_daylight_saving() {
        // CDT (-05:00) in July, CST (-06:00) in November.
        assert_eq!(
            reconcile(Some("July 4, 2025 2:30 PM"), chicago()),
            Some(1_751_657_400)
        );
        assert_eq!(
            reconcile(Some("November 20, 2025 2:30 PM"), chicago()),
            Some(1_763_670_600)
        );
    }

    #[test]
    fn test_named_zone_rejects_gap_and_overlap() {
        // 02:30 does not exist on 2025-03-09; 01:30 happens twice on 2025-11-02.
        assert_eq!(reconcile(Some("2025-03-09 02:30:00"), chicago()), None);
        assert_eq!(reconcile(Some("2025-11-02 01:30:00"), chicago()), None);
        assert_eq!(
            reconcile(Some("2025-11-02 03:30:00"), chicago()),
            Some(1_762_075_800)
        );
    }
}
