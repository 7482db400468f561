//! Batch normalizer: drives one run from raw collection units to canonical
//! output.
//!
//! A run moves through `Start → Loading → Processing → Finalizing → Done`:
//!
//! 1. **Loading**: discover and parse every collection unit, and read the
//!    first-seen index of earlier output. A unit that fails to load is
//!    counted and skipped.
//! 2. **Processing**: normalize every record of every loaded unit. Units run
//!    in parallel on the blocking pool, bounded by the worker count; records
//!    never share mutable state.
//! 3. **Finalizing**: write accepted articles and the run summary.
//!
//! Rejected records and failed writes are counted in `errors` and never stop
//! the run. The only fatal outcome is [`RunError::Aborted`]: not a single
//! unit could be loaded.

use crate::config::RunOptions;
use crate::error::{LoadError, RunError};
use crate::models::{CollectionUnit, RunStatistics, RunSummary};
use crate::normalize::identity::{ArticleIdentity, ExistingIndex};
use crate::normalize::{NormalizeContext, Normalized, normalize_record};
use crate::outputs::{json, summary};
use crate::reader;
use crate::utils::{ensure_writable_dir, truncate_for_log};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Start,
    Loading,
    Processing,
    Finalizing,
    Done,
}

/// What a completed run reports back to its caller.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub stats: RunStatistics,
    /// UTC epoch seconds used as first-seen time for new identities.
    pub started_at: i64,
    pub summary_path: Option<PathBuf>,
    /// Articles whose body fell back to plain text.
    pub degraded: usize,
    /// Articles whose publication date could not be resolved.
    pub unresolved_timestamps: usize,
    /// Records dropped because an earlier record in this run had the same identity.
    pub duplicates: usize,
}

/// Result of normalizing every record in one unit.
#[derive(Debug, Default)]
struct UnitOutcome {
    accepted: Vec<Normalized>,
    rejected: usize,
}

/// Tracks the current phase and logs every transition.
struct Run {
    phase: RunPhase,
}

impl Run {
    fn new() -> Self {
        Self {
            phase: RunPhase::Start,
        }
    }

    fn advance(&mut self, next: RunPhase) {
        debug!(from = ?self.phase, to = ?next, "Run phase transition");
        self.phase = next;
    }
}

/// Run the normalizer with the current time as the run start.
pub async fn run(options: &RunOptions) -> Result<RunReport, RunError> {
    run_at(options, Utc::now().timestamp()).await
}

/// Run the normalizer with an explicit run start (UTC epoch seconds).
#[instrument(level = "info", skip_all, fields(input = %options.input_dir.display(), output = %options.output_dir.display()))]
pub async fn run_at(options: &RunOptions, started_at: i64) -> Result<RunReport, RunError> {
    let mut run = Run::new();
    let mut stats = RunStatistics::default();
    let options = Arc::new(options.clone());
    // A zero-sized buffer never polls its futures.
    let workers = options.workers.max(1);

    ensure_writable_dir(&options.output_dir)
        .await
        .map_err(|source| RunError::OutputDir {
            path: options.output_dir.clone(),
            source,
        })?;

    // ---- Loading ----
    run.advance(RunPhase::Loading);
    let unit_paths = match reader::discover_units(&options.input_dir, &options.skip_prefix).await {
        Ok(paths) => paths,
        Err(e) => {
            error!(error = %e, "Could not list collection units");
            stats.errors += 1;
            Vec::new()
        }
    };

    let loaded: Vec<Result<CollectionUnit, LoadError>> = stream::iter(unit_paths)
        .map(|path| async move { reader::read_unit(&path).await })
        .buffered(workers)
        .collect()
        .await;

    let mut units = Vec::with_capacity(loaded.len());
    for result in loaded {
        match result {
            Ok(unit) => units.push(unit),
            Err(e) => {
                warn!(error = %e, "Skipping collection unit that failed to load");
                stats.errors += 1;
            }
        }
    }

    if units.is_empty() {
        run.advance(RunPhase::Finalizing);
        error!(errors = stats.errors, "No collection units could be loaded; aborting run");
        let summary = RunSummary::new(options.source.clone(), stats);
        if let Err(e) = summary::write_summary(&options.output_dir, &summary).await {
            error!(error = %e, "Failed to write run summary");
        }
        return Err(RunError::Aborted { stats });
    }

    let existing = Arc::new(json::load_existing_index(&options.output_dir).await);
    info!(
        units = units.len(),
        records = units.iter().map(CollectionUnit::record_count).sum::<usize>(),
        known_identities = existing.len(),
        "Loading complete"
    );

    // ---- Processing ----
    run.advance(RunPhase::Processing);
    let outcomes: Vec<(PathBuf, Result<UnitOutcome, tokio::task::JoinError>)> = stream::iter(units)
        .map(|unit| {
            let existing = Arc::clone(&existing);
            let options = Arc::clone(&options);
            async move {
                let path = unit.path.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    process_unit(&unit, &existing, &options, started_at)
                })
                .await;
                (path, outcome)
            }
        })
        .buffered(workers)
        .collect()
        .await;

    let mut accepted = Vec::new();
    for (path, outcome) in outcomes {
        match outcome {
            Ok(outcome) => {
                stats.files_processed += 1;
                stats.errors += outcome.rejected;
                info!(
                    path = %path.display(),
                    accepted = outcome.accepted.len(),
                    rejected = outcome.rejected,
                    "Processed collection unit"
                );
                accepted.extend(outcome.accepted);
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Worker failed while processing unit");
                stats.errors += 1;
            }
        }
    }

    // ---- Finalizing ----
    run.advance(RunPhase::Finalizing);
    let degraded = accepted.iter().filter(|n| n.degraded).count();
    let unresolved_timestamps = accepted.iter().filter(|n| n.timestamp_unresolved).count();

    let mut seen: HashSet<ArticleIdentity> = HashSet::new();
    let before = accepted.len();
    accepted.retain(|n| {
        let fresh = seen.insert(n.identity.clone());
        if !fresh {
            debug!(identity = %n.identity, url = %n.article.url, "Dropping duplicate article within run");
        }
        fresh
    });
    let duplicates = before - accepted.len();

    let writes: Vec<_> = stream::iter(accepted.iter())
        .map(|n| json::write_article(&options.output_dir, &n.identity, &n.article))
        .buffer_unordered(workers)
        .collect()
        .await;
    for result in writes {
        match result {
            Ok(_) => stats.articles_normalized += 1,
            Err(e) => {
                error!(error = %e, "Failed to write article");
                stats.errors += 1;
            }
        }
    }

    let summary = RunSummary::new(options.source.clone(), stats);
    let summary_path = match summary::write_summary(&options.output_dir, &summary).await {
        Ok(path) => Some(path),
        Err(e) => {
            error!(error = %e, "Failed to write run summary");
            None
        }
    };

    run.advance(RunPhase::Done);
    info!(
        files_processed = stats.files_processed,
        articles_normalized = stats.articles_normalized,
        errors = stats.errors,
        degraded,
        unresolved_timestamps,
        duplicates,
        "Normalization complete"
    );

    Ok(RunReport {
        stats,
        started_at,
        summary_path,
        degraded,
        unresolved_timestamps,
        duplicates,
    })
}

/// Normalize every record of one unit. Pure apart from logging.
fn process_unit(
    unit: &CollectionUnit,
    existing: &ExistingIndex,
    options: &RunOptions,
    started_at: i64,
) -> UnitOutcome {
    let mut outcome = UnitOutcome::default();
    for batch in &unit.batches {
        let ctx = NormalizeContext {
            source_domain: &batch.source,
            run_started_at: started_at,
            existing,
            tz_hint: options.zone_for(&batch.source),
        };
        for (index, raw) in batch.records.iter().enumerate() {
            match normalize_record(raw, &ctx) {
                Ok(normalized) => {
                    if normalized.degraded {
                        warn!(
                            source = %batch.source,
                            index,
                            url = %normalized.article.url,
                            "Markup conversion degraded to plain text"
                        );
                    }
                    if normalized.timestamp_unresolved {
                        debug!(
                            source = %batch.source,
                            index,
                            date = ?normalized.article.publication_date,
                            "Publication date unresolved"
                        );
                    }
                    outcome.accepted.push(normalized);
                }
                Err(reason) => {
                    warn!(
                        source = %batch.source,
                        index,
                        title = %truncate_for_log(raw.title.as_deref().unwrap_or(""), 80),
                        %reason,
                        "Rejected record"
                    );
                    outcome.rejected += 1;
                }
            }
        }
    }
    outcome
}
