//! Canonical article storage.
//!
//! Each accepted article lives at `{output_dir}/{source_domain}/{identity}.json`.
//! Re-running over the same input overwrites those files in place; the
//! first-seen timestamp survives because [`load_existing_index`] reads it
//! back before processing starts.

use crate::error::OutputError;
use crate::models::CanonicalArticle;
use crate::normalize::identity::{ArticleIdentity, ExistingIndex};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// The only part of a stored article the index needs.
#[derive(Deserialize)]
struct StoredFreshness {
    first_seen_timestamp_gmt: i64,
}

/// Location of an article's file.
pub fn article_path(output_dir: &Path, source_domain: &str, identity: &ArticleIdentity) -> PathBuf {
    output_dir
        .join(source_domain)
        .join(format!("{identity}.json"))
}

/// Write one canonical article, replacing any previous version.
///
/// The JSON is pretty-printed and keeps non-ASCII text as UTF-8.
#[instrument(level = "debug", skip_all, fields(%identity))]
pub async fn write_article(
    output_dir: &Path,
    identity: &ArticleIdentity,
    article: &CanonicalArticle,
) -> Result<PathBuf, OutputError> {
    let path = article_path(output_dir, &article.source_domain, identity);
    let json = serde_json::to_string_pretty(article).map_err(|source| OutputError::Json {
        path: path.clone(),
        source,
    })?;

    let io_err = |source| OutputError::Io {
        path: path.clone(),
        source,
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).await.map_err(io_err)?;
    }
    fs::write(&path, json).await.map_err(io_err)?;
    debug!(path = %path.display(), "Wrote article");
    Ok(path)
}

/// Rebuild the first-seen index from articles written by earlier runs.
///
/// Scans `{output_dir}/*/*.json`. Files whose stem is not an identity, or
/// that cannot be read or parsed, are skipped with a warning. A missing
/// output directory yields an empty index.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn load_existing_index(output_dir: &Path) -> ExistingIndex {
    let mut entries = Vec::new();
    let Ok(mut domains) = fs::read_dir(output_dir).await else {
        info!("No previous output; starting with an empty index");
        return ExistingIndex::new();
    };

    while let Ok(Some(domain)) = domains.next_entry().await {
        if !domain.file_type().await.is_ok_and(|t| t.is_dir()) {
            continue;
        }
        let Ok(mut files) = fs::read_dir(domain.path()).await else {
            warn!(dir = %domain.path().display(), "Unreadable source directory");
            continue;
        };
        while let Ok(Some(file)) = files.next_entry().await {
            let path = file.path();
            let Some(identity) = path
                .file_stem()
                .filter(|_| path.extension().is_some_and(|ext| ext == "json"))
                .and_then(|stem| ArticleIdentity::parse(&stem.to_string_lossy()))
            else {
                continue;
            };
            match read_first_seen(&path).await {
                Some(ts) => entries.push((identity, ts)),
                None => warn!(path = %path.display(), "Skipping unreadable stored article"),
            }
        }
    }

    let index: ExistingIndex = entries.into_iter().collect();
    info!(identities = index.len(), "Loaded existing index");
    index
}

async fn read_first_seen(path: &Path) -> Option<i64> {
    let text = fs::read_to_string(path).await.ok()?;
    let stored: StoredFreshness = serde_json::from_str(&text).ok()?;
    (stored.first_seen_timestamp_gmt > 0).then_some(stored.first_seen_timestamp_gmt)
}
