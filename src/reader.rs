//! Raw record reader for collected feed dumps.
//!
//! A collection unit is one JSON file written by the collector. Two shapes
//! are understood:
//!
//! | Shape | Example | Source identifier |
//! |-------|---------|-------------------|
//! | TownNews search feed | `{"total": 100, "rows": [...]}` | file stem, `_` → `.` |
//! | Source mapping | `{"example.com": [...], "other.org": [...]}` | each key |
//!
//! A bare top-level array is also accepted and treated like a feed. Every
//! record is resolved into a [`RawArticleRecord`] right here, so the rest of
//! the pipeline works on typed optional fields. Missing keys and wrongly
//! typed values resolve to `None`/empty; they never fail the unit.

use crate::error::LoadError;
use crate::models::{CollectionUnit, RawArticleRecord, SourceBatch};
use crate::utils::{bare_hostname, source_domain_from_path};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

const URL_KEYS: &[&str] = &["url", "link", "canonical_url"];
const TITLE_KEYS: &[&str] = &["title", "headline"];
const BODY_KEYS: &[&str] = &["body", "html", "text"];
const DATE_KEYS: &[&str] = &["publication_date", "pubDate", "published", "date"];
const BYLINE_KEYS: &[&str] = &["byline", "author"];
const TAXONOMY_KEYS: &[&str] = &["keywords", "sections", "tags", "categories", "topics"];
const TERM_NAME_KEYS: &[&str] = &["name", "title", "label"];
const AUTHOR_NAME_KEYS: &[&str] = &["name", "screen_name"];
const IMAGE_KEYS: &[&str] = &["image_url", "image", "preview", "thumbnail"];
const EXCERPT_KEYS: &[&str] = &["prologue", "summary", "description"];
const WORD_COUNT_KEYS: &[&str] = &["word_count", "wordcount"];

/// Find every collection unit below `root`.
///
/// Walks the directory tree (the collector nests units as
/// `<date>/<epoch>/<domain>.json`) and returns the `.json` files whose name
/// does not start with `skip_prefix`, sorted for a stable processing order.
/// A `root` that is itself a file is returned as the only unit.
#[instrument(level = "info", skip_all, fields(root = %root.display()))]
pub async fn discover_units(root: &Path, skip_prefix: &str) -> Result<Vec<PathBuf>, LoadError> {
    let io_err = |source| LoadError::Io {
        path: root.to_path_buf(),
        source,
    };

    let meta = fs::metadata(root).await.map_err(io_err)?;
    if meta.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut units = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if dir == root => return Err(io_err(e)),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
                continue;
            }
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            if file_type.is_dir() {
                pending.push(path);
            } else if is_unit_file(&path, skip_prefix) {
                units.push(path);
            }
        }
    }

    units.sort();
    info!(count = units.len(), "Discovered collection units");
    Ok(units)
}

fn is_unit_file(path: &Path, skip_prefix: &str) -> bool {
    let is_json = path.extension().is_some_and(|ext| ext == "json");
    let skipped = !skip_prefix.is_empty()
        && path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with(skip_prefix));
    is_json && !skipped
}

/// Read and parse one collection unit from disk.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn read_unit(path: &Path) -> Result<CollectionUnit, LoadError> {
    let contents = fs::read_to_string(path).await.map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let unit = parse_unit(path, &contents)?;
    debug!(records = unit.record_count(), batches = unit.batches.len(), "Loaded unit");
    Ok(unit)
}

/// Parse the text of one collection unit.
pub fn parse_unit(path: &Path, contents: &str) -> Result<CollectionUnit, LoadError> {
    let data: Value = serde_json::from_str(contents).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let unsupported = |reason: &str| LoadError::UnsupportedShape {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let batches = match &data {
        Value::Array(rows) => vec![feed_batch(path, rows)],
        Value::Object(obj) => match obj.get("rows") {
            Some(Value::Array(rows)) => vec![feed_batch(path, rows)],
            Some(_) => return Err(unsupported("`rows` is not an array")),
            None => {
                let batches: Vec<SourceBatch> = obj
                    .iter()
                    .filter_map(|(source, value)| {
                        let rows = value.as_array()?;
                        Some(SourceBatch {
                            source: bare_hostname(source),
                            records: rows.iter().map(read_record).collect(),
                        })
                    })
                    .collect();
                if batches.is_empty() {
                    return Err(unsupported("no `rows` array and no source → records mapping"));
                }
                batches
            }
        },
        _ => return Err(unsupported("top-level value is neither an object nor an array")),
    };

    Ok(CollectionUnit {
        path: path.to_path_buf(),
        batches,
    })
}

fn feed_batch(path: &Path, rows: &[Value]) -> SourceBatch {
    SourceBatch {
        source: source_domain_from_path(path),
        records: rows.iter().map(read_record).collect(),
    }
}

/// Resolve one raw JSON value into a [`RawArticleRecord`].
///
/// Non-object values produce an empty record, which the validator later
/// rejects for its missing URL.
pub fn read_record(value: &Value) -> RawArticleRecord {
    let Some(obj) = value.as_object() else {
        return RawArticleRecord::default();
    };

    let starttime = obj.get("starttime").and_then(Value::as_object);
    // Kept verbatim; the timestamp parser does its own trimming.
    let publication_date = starttime
        .and_then(|st| first_verbatim_string(st, &["iso8601", "rfc2822"]))
        .or_else(|| first_verbatim_string(obj, DATE_KEYS));
    let publication_epoch_millis = starttime.and_then(|st| st.get("utc")).and_then(as_i64);

    let authors = match obj.get("authors") {
        Some(Value::Array(items)) => items.iter().filter_map(author_name).collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    };

    RawArticleRecord {
        url: first_string(obj, URL_KEYS),
        title: first_string(obj, TITLE_KEYS),
        body_html: body_html(obj),
        publication_date,
        publication_epoch_millis,
        authors,
        byline: first_string(obj, BYLINE_KEYS),
        taxonomies: TAXONOMY_KEYS
            .iter()
            .filter_map(|key| obj.get(*key))
            .map(taxonomy_terms)
            .collect(),
        image_url: IMAGE_KEYS.iter().find_map(|key| obj.get(*key).and_then(image_url)),
        excerpt: first_string(obj, EXCERPT_KEYS),
        word_count: WORD_COUNT_KEYS
            .iter()
            .find_map(|key| obj.get(*key).and_then(as_i64))
            .and_then(|n| u64::try_from(n).ok()),
        metadata: obj.get("metadata").filter(|m| m.is_object()).cloned(),
    }
}

/// First non-blank string value among `keys`.
fn first_string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

/// First non-blank string value among `keys`, untrimmed.
fn first_verbatim_string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    })
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Prologue followed by every piece of `content`, or a flat body field.
fn body_html(obj: &Map<String, Value>) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(prologue) = first_string(obj, &["prologue"]) {
        if prologue.starts_with('<') {
            parts.push(prologue);
        } else {
            parts.push(format!("<p>{prologue}</p>"));
        }
    }
    if let Some(Value::Array(content)) = obj.get("content") {
        parts.extend(
            content
                .iter()
                .map(extract_text)
                .filter(|text| !text.trim().is_empty()),
        );
    } else if let Some(Value::String(content)) = obj.get("content") {
        parts.push(content.clone());
    }

    if parts.is_empty() {
        return first_string(obj, BODY_KEYS);
    }
    Some(parts.join(" "))
}

/// Recursively collect the string leaves of a content item.
fn extract_text(item: &Value) -> String {
    match item {
        Value::String(s) => s.clone(),
        Value::Array(items) => join_non_empty(items.iter().map(extract_text)),
        Value::Object(obj) => join_non_empty(obj.values().map(extract_text)),
        _ => String::new(),
    }
}

fn join_non_empty(parts: impl Iterator<Item = String>) -> String {
    parts.filter(|p| !p.is_empty()).collect::<Vec<_>>().join(" ")
}

fn author_name(item: &Value) -> Option<String> {
    match item {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(obj) => first_string(obj, AUTHOR_NAME_KEYS),
        _ => None,
    }
}

/// Terms of one taxonomy field: a list of strings or named objects, or a
/// single comma-separated string.
fn taxonomy_terms(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(obj) => first_string(obj, TERM_NAME_KEYS),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn image_url(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(obj) => first_string(obj, &["url", "src"]),
        _ => None,
    }
}
