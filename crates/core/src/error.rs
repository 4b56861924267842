//! Error types for the preprocessing pipeline and dashboard queries.
//!
//! Every fallible operation returns `Result<T, Error>`. Nothing in the
//! pipeline substitutes a default for a missing file, an unknown option
//! code or a malformed cell: the run stops with a message naming the key.

use std::path::PathBuf;

use thiserror::Error;

use crate::table::SeriesKey;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type.
#[derive(Debug, Error)]
pub enum Error {
    // ===== Source data =====
    /// A required source file does not exist.
    #[error("missing {metric} source for {key}: {}", path.display())]
    MissingSource {
        /// Metric directory (`total_area_burned`, `veg_counts`, ...).
        metric: &'static str,
        /// Key whose file is absent.
        key: SeriesKey,
        /// Resolved path that was checked.
        path: PathBuf,
    },

    /// Neither black nor white spruce counts exist for a key.
    #[error("neither black nor white spruce counts found for {key}")]
    MissingConifer {
        /// Key with no coniferous data.
        key: SeriesKey,
    },

    /// A cell could not be parsed as a finite number.
    #[error("malformed value {value:?} in {} at line {line}, column {column}", path.display())]
    Malformed {
        /// File containing the cell.
        path: PathBuf,
        /// 1-based line number (header is line 1).
        line: u64,
        /// 1-based column number.
        column: usize,
        /// Raw cell text.
        value: String,
    },

    /// A required source file lacks rows for some years of its range.
    #[error(
        "{metric} source for {key} is missing {missing} year(s) from {first}: {}",
        path.display()
    )]
    MissingYears {
        /// Metric directory.
        metric: &'static str,
        /// Key whose file is short.
        key: SeriesKey,
        /// File that was read.
        path: PathBuf,
        /// First absent year.
        first: i32,
        /// Number of absent years.
        missing: usize,
    },

    /// A source file is not a well-formed CSV table.
    #[error("unreadable CSV {}: {source}", path.display())]
    SourceCsv {
        /// Offending file.
        path: PathBuf,
        /// Underlying reader error.
        source: csv::Error,
    },

    /// A source file has a header but no data rows or no replicate columns.
    #[error("source file {} has no replicate data", path.display())]
    EmptySource {
        /// Offending file.
        path: PathBuf,
    },

    // ===== Cost estimation =====
    /// The FMO option code is not in the cost table.
    #[error("unknown cost option code {0:?}")]
    UnknownCostOption(String),

    /// A simulated year has no entry in the seeded year map.
    #[error("year {0} is outside the cost year map")]
    UnmappedYear(i32),

    /// The cost table has no factors for a mapped historical year.
    #[error("no cost factors recorded for historical year {0}")]
    MissingCostFactor(i32),

    // ===== Configuration =====
    /// Invalid configuration value.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// TOML parse failure.
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    // ===== Queries =====
    /// The snapshot has no rows for the requested key.
    #[error("no {table} series for {key}")]
    SeriesNotFound {
        /// Table that was searched.
        table: &'static str,
        /// Requested key.
        key: SeriesKey,
    },

    /// Snapshot was written by an incompatible format version.
    #[error("snapshot format version {found} is not supported (expected {expected})")]
    SnapshotVersion {
        /// Version found in the file.
        found: u32,
        /// Version this build reads.
        expected: u32,
    },

    /// Columnar snapshot table has columns of different lengths.
    #[error("snapshot table {table} is ragged: column {column} has {found} rows, expected {expected}")]
    RaggedColumns {
        /// Table name.
        table: &'static str,
        /// Column name.
        column: &'static str,
        /// Length found.
        found: usize,
        /// Length of the year column.
        expected: usize,
    },

    // ===== I/O =====
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write error.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
