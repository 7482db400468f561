//! Data models for raw feed records and their canonical representation.
//!
//! This module defines the core data structures used throughout the application:
//! - [`RawArticleRecord`]: One article as resolved from a source feed, every field optional
//! - [`SourceBatch`] / [`CollectionUnit`]: The records of one input file, grouped by source
//! - [`CanonicalArticle`]: The normalized, validated output record
//! - [`RunStatistics`] / [`RunSummary`]: Per-run counters and their persisted form

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A raw article as emitted by a source platform.
///
/// The [`reader`](crate::reader) resolves the loosely keyed JSON into this
/// structure once; downstream code never looks at raw keys again. Absence is
/// modelled explicitly: a missing or wrongly typed field becomes `None` or an
/// empty list, never an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawArticleRecord {
    /// Article URL, possibly relative to the source site.
    pub url: Option<String>,
    /// Headline, possibly containing entities or inline markup.
    pub title: Option<String>,
    /// HTML (or plain text) body.
    pub body_html: Option<String>,
    /// Source-native publication date string, verbatim.
    pub publication_date: Option<String>,
    /// Source-provided UTC instant in epoch milliseconds, if any.
    pub publication_epoch_millis: Option<i64>,
    /// Structured author names.
    pub authors: Vec<String>,
    /// Free-form byline, used when no structured authors exist.
    pub byline: Option<String>,
    /// Every taxonomy field, in merge order.
    pub taxonomies: Vec<Vec<String>>,
    pub image_url: Option<String>,
    pub excerpt: Option<String>,
    pub word_count: Option<u64>,
    pub metadata: Option<serde_json::Value>,
}

/// All records a collection unit holds for one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceBatch {
    /// Bare hostname of the source, e.g. `athensreview.com`.
    pub source: String,
    pub records: Vec<RawArticleRecord>,
}

/// One input file: a mapping from source identifier to raw records.
#[derive(Debug, Clone)]
pub struct CollectionUnit {
    pub path: PathBuf,
    pub batches: Vec<SourceBatch>,
}

impl CollectionUnit {
    /// Total number of raw records across every batch.
    pub fn record_count(&self) -> usize {
        self.batches.iter().map(|b| b.records.len()).sum()
    }
}

/// The normalized, contract-conformant article record.
///
/// Instances are only ever produced by
/// [`validate`](crate::normalize::validate::validate), so every value of this
/// type satisfies the required-field contract.
///
/// # JSON Schema
///
/// Nullable fields serialize as `null`; the pass-through fields
/// (`image_url`, `excerpt`, `word_count`, `metadata`) are omitted entirely
/// when the source did not provide them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalArticle {
    /// Absolute article URL.
    pub url: String,
    /// Headline as plain text.
    pub title: String,
    /// Body as lightweight markup.
    pub article_text: String,
    /// Bare hostname of the source, no scheme.
    pub source_domain: String,
    /// Original source date string, verbatim.
    pub publication_date: Option<String>,
    /// UTC epoch seconds, `None` when the date could not be resolved.
    pub publication_timestamp_gmt: Option<i64>,
    /// UTC epoch seconds of the first run that saw this article.
    pub first_seen_timestamp_gmt: i64,
    /// Comma-joined author names.
    pub author: Option<String>,
    /// Deduplicated union of every taxonomy field.
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Counters for a single normalization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Collection units that were loaded and processed.
    pub files_processed: usize,
    /// Canonical articles written.
    pub articles_normalized: usize,
    /// Load failures, rejected records, and failed writes.
    pub errors: usize,
}

/// The summary persisted once at the end of every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// RFC 3339 creation time in UTC.
    pub timestamp: String,
    /// Source platform identifier, e.g. `townnews`.
    pub source: String,
    pub statistics: RunStatistics,
}

impl RunSummary {
    /// Stamp a summary with the current UTC time.
    pub fn new(source: impl Into<String>, statistics: RunStatistics) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            source: source.into(),
            statistics,
        }
    }
}
