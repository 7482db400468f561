//! Stable article identities and first-seen bookkeeping.
//!
//! An [`ArticleIdentity`] is the first 128 bits of the SHA-256 of the
//! article's canonical URL, hex encoded. It names the article's output file
//! and keys the [`ExistingIndex`] of first-seen timestamps carried over from
//! earlier runs.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use url::Url;

/// Hex characters kept from the SHA-256 digest.
const IDENTITY_HEX_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArticleIdentity(String);

impl ArticleIdentity {
    /// Identity of the article at `url`.
    pub fn from_url(url: &str) -> Self {
        let digest = Sha256::digest(canonical_url(url).as_bytes());
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        Self(hex[..IDENTITY_HEX_LEN].to_string())
    }

    /// Accept a previously written identity (an output file stem).
    pub fn parse(s: &str) -> Option<Self> {
        let valid = s.len() == IDENTITY_HEX_LEN
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArticleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical form of an article URL used for identity.
///
/// Scheme, host and path are lowercased, default ports and the fragment are
/// dropped, and a trailing slash on the path is removed. The query string is
/// kept verbatim. Strings that do not parse as absolute URLs are trimmed,
/// lowercased and stripped of trailing slashes so they still map to a stable
/// identity (the validator rejects them later).
pub fn canonical_url(url: &str) -> String {
    let trimmed = url.trim();
    let Ok(parsed) = Url::parse(trimmed) else {
        return trimmed.trim_end_matches('/').to_lowercase();
    };
    let Some(host) = parsed.host_str() else {
        return trimmed.trim_end_matches('/').to_lowercase();
    };

    let mut out = format!("{}://{}", parsed.scheme(), host.to_lowercase());
    // `Url::port` is already `None` for the scheme's default port.
    if let Some(port) = parsed.port() {
        out.push_str(&format!(":{port}"));
    }
    out.push_str(&parsed.path().trim_end_matches('/').to_lowercase());
    if let Some(query) = parsed.query().filter(|q| !q.is_empty()) {
        out.push('?');
        out.push_str(query);
    }
    out
}

/// Read-only snapshot of identities already written by earlier runs.
///
/// Built once before processing starts and shared by every worker; nothing
/// mutates it while records are being normalized.
#[derive(Debug, Clone, Default)]
pub struct ExistingIndex {
    first_seen: HashMap<ArticleIdentity, i64>,
}

impl ExistingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored first-seen timestamp for `identity`, if any.
    pub fn first_seen(&self, identity: &ArticleIdentity) -> Option<i64> {
        self.first_seen.get(identity).copied()
    }

    pub fn len(&self) -> usize {
        self.first_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first_seen.is_empty()
    }
}

impl FromIterator<(ArticleIdentity, i64)> for ExistingIndex {
    /// Collect stored entries. If an identity appears twice (e.g. filed under
    /// two source directories) the earliest timestamp is kept.
    fn from_iter<T: IntoIterator<Item = (ArticleIdentity, i64)>>(iter: T) -> Self {
        let mut first_seen: HashMap<ArticleIdentity, i64> = HashMap::new();
        for (identity, ts) in iter {
            first_seen
                .entry(identity)
                .and_modify(|existing| *existing = (*existing).min(ts))
                .or_insert(ts);
        }
        Self { first_seen }
    }
}

/// Derive the identity of `article_url` and resolve its first-seen time.
///
/// A previously stored timestamp always wins over `run_started_at`, so the
/// value never moves forward across runs.
pub fn assign(
    article_url: &str,
    existing_index: &ExistingIndex,
    run_started_at: i64,
) -> (ArticleIdentity, i64) {
    let identity = ArticleIdentity::from_url(article_url);
    let first_seen = existing_index
        .first_seen(&identity)
        .unwrap_or(run_started_at);
    (identity, first_seen)
}
