//! Command-line interface definitions for the TownNews normalizer.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Most options can also be provided via environment variables.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the normalizer.
///
/// # Examples
///
/// ```sh
/// # Normalize every collected feed below raw_news_data/
/// townnews_normalizer -i raw_news_data -o ../normalized_news
///
/// # With a config file supplying per-source time zones
/// townnews_normalizer -i raw_news_data -o ../normalized_news -c normalizer.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory (or single file) holding raw collection units
    #[arg(short, long, env = "NORMALIZER_INPUT_DIR", default_value = "raw_news_data")]
    pub input_dir: PathBuf,

    /// Directory receiving one JSON file per canonical article
    #[arg(short, long, env = "NORMALIZER_OUTPUT_DIR", default_value = "../normalized_news")]
    pub output_dir: PathBuf,

    /// Source platform identifier recorded in the run summary
    #[arg(short, long, default_value = "townnews")]
    pub source: String,

    /// Optional path to a YAML config file
    #[arg(short, long, env = "NORMALIZER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of parallel workers (defaults to available cores)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Time zone assumed for dates without one, e.g. "-06:00" or "America/Chicago"
    #[arg(long)]
    pub default_utc_offset: Option<String>,
}
