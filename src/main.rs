//! # TownNews Normalizer
//!
//! Converts raw article feeds collected from TownNews-hosted news sites into
//! canonical, strongly-typed article records suitable for cross-source
//! aggregation.
//!
//! ## Features
//!
//! - Reads every collected feed below an input directory (`rows` feeds or
//!   source → records mappings), tolerating missing and malformed fields
//! - Converts HTML bodies to lightweight markup with entities decoded
//! - Resolves source date strings to UTC epoch seconds across time zones
//! - Merges keywords, sections, tags and categories into one ordered set
//! - Assigns each article a URL-derived identity, so re-runs overwrite in
//!   place and keep the original first-seen time
//! - Writes one JSON file per article plus a run summary
//!
//! ## Usage
//!
//! ```sh
//! townnews_normalizer -i raw_news_data -o ../normalized_news
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Loading**: Discover and parse collection units, load the first-seen index
//! 2. **Processing**: Normalize every record in parallel (one worker per core)
//! 3. **Finalizing**: Write accepted articles and the run summary

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod models;
mod normalize;
mod outputs;
mod pipeline;
mod reader;
mod utils;

use cli::Cli;
use config::NormalizerConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("townnews_normalizer starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.input_dir, ?args.output_dir, ?args.config, "Parsed CLI arguments");

    // ---- Load config ----
    let file_config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => NormalizerConfig::default(),
    };
    let options = file_config.resolve(&args)?;
    info!(
        workers = options.workers,
        source = %options.source,
        default_zone = ?options.default_zone,
        "Resolved run options"
    );

    // ---- Run ----
    let result = pipeline::run(&options).await;

    let elapsed = start_time.elapsed();
    match result {
        Ok(report) => {
            info!(
                ?elapsed,
                secs = elapsed.as_secs(),
                millis = elapsed.subsec_millis(),
                files_processed = report.stats.files_processed,
                articles_normalized = report.stats.articles_normalized,
                errors = report.stats.errors,
                degraded = report.degraded,
                unresolved_timestamps = report.unresolved_timestamps,
                duplicates = report.duplicates,
                run_started_at = report.started_at,
                summary = ?report.summary_path,
                "Execution complete"
            );
            Ok(())
        }
        Err(e) => {
            error!(?elapsed, error = %e, "Run failed");
            Err(e.into())
        }
    }
}
