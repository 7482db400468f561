//! Per-record normalization: raw record → validated canonical article.
//!
//! # Submodules
//!
//! - [`markup`]: HTML body → lightweight markup
//! - [`timestamp`]: source date string → UTC epoch seconds
//! - [`taxonomy`]: keyword/section/tag merge
//! - [`identity`]: URL-derived identity and first-seen lookup
//! - [`validate`]: required-field contract
//!
//! [`normalize_record`] is pure: it reads the record, the context and the
//! read-only [`ExistingIndex`], and nothing else. Records can therefore be
//! normalized in any order and on any thread.

pub mod identity;
pub mod markup;
pub mod taxonomy;
pub mod timestamp;
pub mod validate;

use crate::models::{CanonicalArticle, RawArticleRecord};
use identity::{ArticleIdentity, ExistingIndex};
use itertools::Itertools;
use timestamp::SourceZone;
use url::Url;
use validate::{ArticleCandidate, RejectionReason};

/// Everything a record needs besides itself.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext<'a> {
    /// Bare hostname of the batch's source; may be empty when unknown.
    pub source_domain: &'a str,
    /// UTC epoch seconds at which this run started.
    pub run_started_at: i64,
    pub existing: &'a ExistingIndex,
    /// Documented time zone for dates that carry none.
    pub tz_hint: Option<SourceZone>,
}

/// An accepted article together with its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub identity: ArticleIdentity,
    pub article: CanonicalArticle,
    /// Markup conversion fell back to plain text (`ConversionDegraded`).
    pub degraded: bool,
    /// A date string was present but could not be resolved (`TimestampUnresolved`).
    pub timestamp_unresolved: bool,
}

/// Normalize one raw record.
pub fn normalize_record(
    raw: &RawArticleRecord,
    ctx: &NormalizeContext<'_>,
) -> Result<Normalized, RejectionReason> {
    let url = raw
        .url
        .as_deref()
        .map(|u| resolve_url(u, ctx.source_domain));

    let converted = raw.body_html.as_deref().map(markup::convert_with_status);
    let degraded = converted.as_ref().is_some_and(|c| c.degraded);

    let mut publication_timestamp_gmt =
        timestamp::reconcile(raw.publication_date.as_deref(), ctx.tz_hint);
    if publication_timestamp_gmt.is_none() && raw.publication_date.is_some() {
        // Source-recorded UTC instant (epoch millis) backs up an unparseable string.
        publication_timestamp_gmt = raw
            .publication_epoch_millis
            .filter(|ms| *ms > 0)
            .map(|ms| ms / 1000);
    }
    let timestamp_unresolved =
        raw.publication_date.is_some() && publication_timestamp_gmt.is_none();

    let author = if raw.authors.is_empty() {
        raw.byline.as_deref().map(markup::plain_text)
    } else {
        Some(
            raw.authors
                .iter()
                .map(|a| markup::plain_text(a))
                .filter(|a| !a.is_empty())
                .join(", "),
        )
    };

    let source_domain = if ctx.source_domain.is_empty() {
        url.as_deref()
            .and_then(|u| Url::parse(u).ok())
            .and_then(|u| u.host_str().map(str::to_lowercase))
    } else {
        Some(ctx.source_domain.to_string())
    };

    let (identity, first_seen_timestamp_gmt) = match url.as_deref() {
        Some(u) => identity::assign(u, ctx.existing, ctx.run_started_at),
        None => return Err(RejectionReason::MissingField("url")),
    };

    let article = validate::validate(ArticleCandidate {
        url,
        title: raw.title.as_deref().map(markup::plain_text),
        article_text: converted.map(|c| c.text),
        source_domain,
        first_seen_timestamp_gmt,
        publication_date: raw.publication_date.clone(),
        publication_timestamp_gmt,
        author,
        keywords: taxonomy::unify(&raw.taxonomies),
        image_url: raw.image_url.clone(),
        excerpt: raw.excerpt.as_deref().map(markup::plain_text).filter(|e| !e.is_empty()),
        word_count: raw.word_count,
        metadata: raw.metadata.clone(),
    })?;

    Ok(Normalized {
        identity,
        article,
        degraded,
        timestamp_unresolved,
    })
}

/// Resolve a possibly relative article URL against the source's site root.
fn resolve_url(url: &str, source_domain: &str) -> String {
    let url = url.trim();
    if Url::parse(url).is_ok() || source_domain.is_empty() {
        return url.to_string();
    }
    Url::parse(&format!("https://{source_domain}/"))
        .and_then(|base| base.join(url))
        .map(|resolved| resolved.to_string())
        .unwrap_or_else(|_| url.to_string())
}
