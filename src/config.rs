//! Optional YAML configuration and its merge with command-line flags.
//!
//! ```yaml
//! # normalizer.yaml
//! default_utc_offset: "America/Chicago"
//! source_utc_offsets:
//!   www.athensreview.com: "America/Chicago"
//!   www.hawaiitribune-herald.com: "-10:00"
//! workers: 8
//! skip_prefix: "_"
//! ```
//!
//! Every key is optional. Command-line values win over the file. Zones are
//! either a fixed `±HH:MM` offset or an IANA name; prefer the name for
//! sources that observe daylight saving time.

use crate::cli::Cli;
use crate::error::ConfigError;
use crate::normalize::timestamp::SourceZone;
use crate::utils::bare_hostname;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Prefix of files in the input tree that are never collection units.
pub const DEFAULT_SKIP_PREFIX: &str = "_";

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizerConfig {
    /// Zone applied to offset-less dates of sources without their own entry.
    pub default_utc_offset: Option<String>,
    /// Documented zone per source domain.
    pub source_utc_offsets: BTreeMap<String, String>,
    pub workers: Option<usize>,
    pub skip_prefix: Option<String>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Source platform identifier written to the run summary.
    pub source: String,
    pub workers: usize,
    pub skip_prefix: String,
    pub default_zone: Option<SourceZone>,
    pub source_zones: HashMap<String, SourceZone>,
}

impl RunOptions {
    /// Documented time zone for `source_domain`, if any.
    pub fn zone_for(&self, source_domain: &str) -> Option<SourceZone> {
        self.source_zones
            .get(source_domain)
            .copied()
            .or(self.default_zone)
    }
}

/// Load a YAML config file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn load_config(path: &Path) -> Result<NormalizerConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: NormalizerConfig =
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
    info!(
        sources_with_zones = config.source_utc_offsets.len(),
        "Loaded configuration"
    );
    Ok(config)
}

impl NormalizerConfig {
    /// Merge with command-line arguments into [`RunOptions`].
    pub fn resolve(self, cli: &Cli) -> Result<RunOptions, ConfigError> {
        let zone = |s: &str| {
            SourceZone::parse(s).ok_or_else(|| ConfigError::InvalidTimeZone(s.to_string()))
        };

        let default_zone = cli
            .default_utc_offset
            .as_deref()
            .or(self.default_utc_offset.as_deref())
            .map(zone)
            .transpose()?;

        let source_zones = self
            .source_utc_offsets
            .iter()
            .map(|(source, value)| -> Result<_, ConfigError> {
                Ok((bare_hostname(source), zone(value.as_str())?))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        let workers = cli
            .workers
            .or(self.workers)
            .filter(|w| *w > 0)
            .unwrap_or_else(default_workers);

        Ok(RunOptions {
            input_dir: cli.input_dir.clone(),
            output_dir: cli.output_dir.clone(),
            source: cli.source.clone(),
            workers,
            skip_prefix: self
                .skip_prefix
                .unwrap_or_else(|| DEFAULT_SKIP_PREFIX.to_string()),
            default_zone,
            source_zones,
        })
    }
}

/// One worker per available core.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use clap::Parser;

    fn fixed_west(hours: i32) -> Option<SourceZone> {
        FixedOffset::west_opt(hours * 3600).map(SourceZone::Fixed)
    }

    fn cli(extra: &[&str]) -> Cli {
        let mut args = vec!["townnews_normalizer", "-i", "raw_news_data", "-o", "normalized_news"];
        args.extend_from_slice(extra);
        Cli::parse_from(args)
    }

    #[test]
    fn test_load_and_resolve_config() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("normalizer.yaml");
        std::fs::write(
            &path,
            "default_utc_offset: \"-06:00\"\nsource_utc_offsets:\n  WWW.Hawaii.com: \"-10:00\"\nworkers: 3\n",
        )
        .unwrap();

        let options = load_config(&path).unwrap().resolve(&cli(&[])).unwrap();
        assert_eq!(options.workers, 3);
        assert_eq!(options.skip_prefix, "_");
        assert_eq!(options.zone_for("www.hawaii.com"), fixed_west(10));
        assert_eq!(options.zone_for("elsewhere.com"), fixed_west(6));
    }

    #[test]
    fn test_cli_overrides_config() {
        let config = NormalizerConfig {
            default_utc_offset: Some("-06:00".to_string()),
            workers: Some(3),
            ..Default::default()
        };
        let options = config
            .resolve(&cli(&["--workers", "7", "--default-utc-offset", "+00:00"]))
            .unwrap();
        assert_eq!(options.workers, 7);
        assert_eq!(options.default_zone, FixedOffset::east_opt(0).map(SourceZone::Fixed));
    }

    #[test]
    fn test_defaults_without_config() {
        let options = NormalizerConfig::default().resolve(&cli(&[])).unwrap();
        assert!(options.workers >= 1);
        assert_eq!(options.default_zone, None);
        assert_eq!(options.zone_for("example.com"), None);
        assert_eq!(options.source, "townnews");
    }

    #[test]
    fn test_invalid_offset_is_an_error() {
        let config = NormalizerConfig {
            default_utc_offset: Some("Central".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.resolve(&cli(&[])),
            Err(ConfigError::InvalidTimeZone(_))
        ));
    }

    #[test]
    fn test_named_zones_in_config() {
        let config: NormalizerConfig = serde_yaml::from_str(
            "default_utc_offset: America/Chicago\nsource_utc_offsets:\n  www.hawaiitribune-herald.com: Pacific/Honolulu\n",
        )
        .unwrap();
        let options = config.resolve(&cli(&[])).unwrap();
        assert_eq!(
            options.zone_for("www.hawaiitribune-herald.com"),
            Some(SourceZone::Named(chrono_tz::Pacific::Honolulu))
        );
        assert_eq!(
            options.zone_for("www.athensreview.com"),
            Some(SourceZone::Named(chrono_tz::America::Chicago))
        );
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.yaml");
        std::fs::write(&path, "wokers: 3\n").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Yaml { .. })));
    }
}
