//! Error types for loading, configuration, output, and whole-run failures.
//!
//! Per-article problems never show up here: a rejected record is a
//! [`RejectionReason`](crate::normalize::validate::RejectionReason), an
//! unparseable date is a `None` timestamp, and a degraded markup conversion
//! is a flag on the result. Only the conditions below leave a function as an
//! `Err`.

use crate::models::RunStatistics;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A collection unit could not be read or parsed (`LoadFailure`).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} has an unsupported shape: {reason}")]
    UnsupportedShape { path: PathBuf, reason: String },
}

/// Problems with the optional YAML config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid time zone `{0}` (expected ±HH:MM, Z, UTC or an IANA name such as America/Chicago)")]
    InvalidTimeZone(String),
}

/// A canonical article or run summary could not be persisted.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Run-level failures. Everything else is contained per unit or per record.
#[derive(Debug, Error)]
pub enum RunError {
    /// No collection unit could be loaded at all (`RunAborted`).
    #[error(
        "run aborted: no collection units could be loaded \
         (files_processed={}, articles_normalized={}, errors={})",
        .stats.files_processed,
        .stats.articles_normalized,
        .stats.errors
    )]
    Aborted { stats: RunStatistics },

    #[error("output directory {path} is not writable: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
