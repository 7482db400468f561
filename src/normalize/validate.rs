//! Required/optional field contract for canonical articles.

use crate::models::CanonicalArticle;
use thiserror::Error;
use url::Url;

/// A fully assembled record that has not been checked yet.
///
/// Required strings are optional here so a missing value can be reported
/// instead of papered over with a sentinel. `keywords` and `author` are
/// already typed as a string sequence and an optional string by the reader,
/// so their type checks hold by construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleCandidate {
    pub url: Option<String>,
    pub title: Option<String>,
    pub article_text: Option<String>,
    pub source_domain: Option<String>,
    pub first_seen_timestamp_gmt: i64,
    pub publication_date: Option<String>,
    pub publication_timestamp_gmt: Option<i64>,
    pub author: Option<String>,
    pub keywords: Vec<String>,
    pub image_url: Option<String>,
    pub excerpt: Option<String>,
    pub word_count: Option<u64>,
    pub metadata: Option<serde_json::Value>,
}

/// Why a candidate was excluded from output (`ValidationRejected`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectionReason {
    #[error("required field `{0}` is missing or empty")]
    MissingField(&'static str),

    #[error("url `{0}` is not a well-formed absolute URL")]
    InvalidUrl(String),

    #[error("source_domain `{0}` is not a bare hostname")]
    InvalidSourceDomain(String),

    #[error("first_seen_timestamp_gmt must be a positive integer, got {0}")]
    InvalidFirstSeen(i64),

    #[error("publication_timestamp_gmt must be a positive integer, got {0}")]
    InvalidPublicationTimestamp(i64),
}

/// Check a candidate and turn it into a [`CanonicalArticle`].
///
/// Checks run in a fixed order and the first failure is returned:
/// required strings non-empty (`url`, `title`, `article_text`,
/// `source_domain`), `url` absolute with a host, `source_domain` a bare
/// hostname, `first_seen_timestamp_gmt` positive, then
/// `publication_timestamp_gmt` positive when present.
pub fn validate(candidate: ArticleCandidate) -> Result<CanonicalArticle, RejectionReason> {
    let url = required(candidate.url, "url")?;
    let title = required(candidate.title, "title")?;
    let article_text = required(candidate.article_text, "article_text")?;
    let source_domain = required(candidate.source_domain, "source_domain")?;

    match Url::parse(&url) {
        Ok(parsed) if parsed.has_host() && matches!(parsed.scheme(), "http" | "https") => {}
        _ => return Err(RejectionReason::InvalidUrl(url)),
    }
    if !is_bare_hostname(&source_domain) {
        return Err(RejectionReason::InvalidSourceDomain(source_domain));
    }
    if candidate.first_seen_timestamp_gmt <= 0 {
        return Err(RejectionReason::InvalidFirstSeen(
            candidate.first_seen_timestamp_gmt,
        ));
    }
    if let Some(ts) = candidate.publication_timestamp_gmt.filter(|ts| *ts <= 0) {
        return Err(RejectionReason::InvalidPublicationTimestamp(ts));
    }

    Ok(CanonicalArticle {
        url,
        title,
        article_text,
        source_domain,
        publication_date: candidate.publication_date,
        publication_timestamp_gmt: candidate.publication_timestamp_gmt,
        first_seen_timestamp_gmt: candidate.first_seen_timestamp_gmt,
        author: candidate.author.filter(|a| !a.trim().is_empty()),
        keywords: candidate.keywords,
        image_url: candidate.image_url,
        excerpt: candidate.excerpt,
        word_count: candidate.word_count,
        metadata: candidate.metadata,
    })
}

fn required(value: Option<String>, field: &'static str) -> Result<String, RejectionReason> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(RejectionReason::MissingField(field))
}

fn is_bare_hostname(s: &str) -> bool {
    s.split('.').all(|label| {
        !label.is_empty()
            && label
                .chars()
                .all(|c| c.is_alphanumeric() || c == '-')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> ArticleCandidate {
        ArticleCandidate {
            url: Some("https://www.athensreview.com/news/article_1.html".to_string()),
            title: Some("Council approves budget".to_string()),
            article_text: Some("The council met.".to_string()),
            source_domain: Some("www.athensreview.com".to_string()),
            first_seen_timestamp_gmt: 1_763_657_957,
            publication_date: Some("2025-11-20T14:30:00-06:00".to_string()),
            publication_timestamp_gmt: Some(1_763_670_600),
            author: Some("Jane Roe".to_string()),
            keywords: vec!["Politics".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_candidate_passes() {
        let article = validate(candidate()).unwrap();
        assert_eq!(article.title, "Council approves budget");
        assert_eq!(article.publication_timestamp_gmt, Some(1_763_670_600));
        assert_eq!(article.keywords, vec!["Politics"]);
    }

    #[test]
    fn test_missing_required_fields_in_order() {
        let mut c = candidate();
        c.url = None;
        c.title = Some("  ".to_string());
        assert_eq!(validate(c), Err(RejectionReason::MissingField("url")));

        let mut c = candidate();
        c.title = Some("  ".to_string());
        assert_eq!(validate(c), Err(RejectionReason::MissingField("title")));

        let mut c = candidate();
        c.article_text = Some(String::new());
        assert_eq!(validate(c), Err(RejectionReason::MissingField("article_text")));

        let mut c = candidate();
        c.source_domain = None;
        assert_eq!(validate(c), Err(RejectionReason::MissingField("source_domain")));
    }

    #[test]
    fn test_relative_or_odd_urls_are_rejected() {
        for bad in ["/news/article_1.html", "mailto:desk@example.com", "not a url"] {
            let mut c = candidate();
            c.url = Some(bad.to_string());
            assert_eq!(validate(c), Err(RejectionReason::InvalidUrl(bad.to_string())));
        }
    }

    #[test]
    fn test_source_domain_must_be_bare() {
        let mut c = candidate();
        c.source_domain = Some("https://example.com".to_string());
        assert!(matches!(
            validate(c),
            Err(RejectionReason::InvalidSourceDomain(_))
        ));
    }

    #[test]
    fn test_timestamps_must_be_positive() {
        let mut c = candidate();
        c.first_seen_timestamp_gmt = 0;
        assert_eq!(validate(c), Err(RejectionReason::InvalidFirstSeen(0)));

        let mut c = candidate();
        c.publication_timestamp_gmt = Some(-5);
        assert_eq!(
            validate(c),
            Err(RejectionReason::InvalidPublicationTimestamp(-5))
        );
    }

    #[test]
    fn test_null_optionals_are_fine() {
        let mut c = candidate();
        c.publication_date = None;
        c.publication_timestamp_gmt = None;
        c.author = Some("   ".to_string());
        c.keywords.clear();
        let article = validate(c).unwrap();
        assert_eq!(article.publication_timestamp_gmt, None);
        assert_eq!(article.author, None);
        assert!(article.keywords.is_empty());
    }
}
