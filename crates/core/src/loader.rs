//! Source file resolution and replicate CSV reading
//!
//! ALFRESCO writes one CSV per (spatial group, treatment, scenario, model,
//! metric, region):
//!
//! ```text
//! {data_dir}/{spatial_prefix}/{treatment}/{fragment}/{metric}/
//!     {file_prefix}_{region}[_{forest}]_{fragment}_{date_range}.csv
//! ```
//!
//! The future fragment is `{fmo_prefix}_{scenario}_{model}`; historical runs
//! use the historical FMO prefix as the fragment. Each file has a header row,
//! the year in the first column, and one column per stochastic replicate.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::aggregate::{replicate_mean, replicate_median};
use crate::catalog::HISTORICAL_SCENARIO;
use crate::config::{PipelineConfig, YearRange};
use crate::error::{Error, Result};
use crate::table::{AnnualSeries, SeriesKey};

/// Output metric directories in the ALFRESCO tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Total area burned (km²)
    TotalAreaBurned,
    /// Vegetation cell counts per forest type
    VegCounts,
}

impl Metric {
    /// Directory name under the fragment directory.
    #[must_use]
    pub const fn dir(self) -> &'static str {
        match self {
            Metric::TotalAreaBurned => "total_area_burned",
            Metric::VegCounts => "veg_counts",
        }
    }

    /// File name prefix.
    #[must_use]
    pub const fn file_prefix(self) -> &'static str {
        match self {
            Metric::TotalAreaBurned => "alfresco_totalareaburned",
            Metric::VegCounts => "alfresco_vegcounts",
        }
    }
}

/// Resolves source paths from the naming convention.
#[derive(Debug, Clone, Copy)]
pub struct SourceLayout<'a> {
    config: &'a PipelineConfig,
}

impl<'a> SourceLayout<'a> {
    /// Layout rooted at `config.data_dir`.
    #[must_use]
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Run fragment shared by the directory and file name.
    #[must_use]
    pub fn fragment(&self, key: &SeriesKey) -> String {
        if key.scenario == HISTORICAL_SCENARIO {
            self.config.historical_fmo_prefix.clone()
        } else {
            format!("{}_{}_{}", self.config.fmo_prefix, key.scenario, key.model)
        }
    }

    /// Date range suffix of the file name.
    #[must_use]
    pub fn date_range(&self, key: &SeriesKey) -> &'a str {
        if key.scenario == HISTORICAL_SCENARIO {
            &self.config.historical_date_postfix
        } else {
            &self.config.date_postfix
        }
    }

    /// Full path of the source file for `key`.
    ///
    /// `forest` inserts a forest type between region and fragment
    /// (vegetation counts only).
    #[must_use]
    pub fn path(
        &self,
        spatial_prefix: &str,
        metric: Metric,
        key: &SeriesKey,
        forest: Option<&str>,
    ) -> PathBuf {
        let fragment = self.fragment(key);
        let mut name = format!("{}_{}", metric.file_prefix(), key.region);
        if let Some(forest) = forest {
            name.push('_');
            name.push_str(forest);
        }
        name = format!("{name}_{fragment}_{}.csv", self.date_range(key));

        self.config
            .data_dir
            .join(spatial_prefix)
            .join(&key.treatment)
            .join(&fragment)
            .join(metric.dir())
            .join(name)
    }
}

/// Year-indexed replicate values of one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicateTable {
    path: PathBuf,
    rows: Vec<(i32, Vec<f64>)>,
}

impl ReplicateTable {
    /// Read a replicate CSV.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, a row is ragged, a cell is
    /// not a finite number, or the file has no data.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Reading {}", path.display());
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|source| csv_error(path, source))?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|source| csv_error(path, source))?;
            let line = record.position().map_or(0, csv::Position::line);
            let mut cells = record.iter().enumerate();
            let Some((_, year_cell)) = cells.next() else {
                continue;
            };
            let year = parse_year(year_cell).ok_or_else(|| Error::Malformed {
                path: path.to_path_buf(),
                line,
                column: 1,
                value: year_cell.to_string(),
            })?;
            let values = cells
                .map(|(idx, cell)| {
                    cell.parse::<f64>()
                        .ok()
                        .filter(|v| v.is_finite())
                        .ok_or_else(|| Error::Malformed {
                            path: path.to_path_buf(),
                            line,
                            column: idx + 1,
                            value: cell.to_string(),
                        })
                })
                .collect::<Result<Vec<f64>>>()?;
            rows.push((year, values));
        }

        if rows.is_empty() || rows.iter().any(|(_, v)| v.is_empty()) {
            return Err(Error::EmptySource {
                path: path.to_path_buf(),
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
            rows,
        })
    }

    /// Read a file that must exist for `key`.
    ///
    /// # Errors
    /// Returns [`Error::MissingSource`] naming the key when the file is
    /// absent, otherwise any error of [`ReplicateTable::read`].
    pub fn read_required(path: &Path, metric: Metric, key: &SeriesKey) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::MissingSource {
                metric: metric.dir(),
                key: key.clone(),
                path: path.to_path_buf(),
            });
        }
        Self::read(path)
    }

    /// Read a file that may be absent.
    ///
    /// # Errors
    /// Returns any error of [`ReplicateTable::read`] for a file that exists.
    pub fn read_optional(path: &Path) -> Result<Option<Self>> {
        if path.is_file() {
            Self::read(path).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Source path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cross-replicate means that must cover every year of `years`.
    ///
    /// # Errors
    /// Returns [`Error::MissingYears`] naming `key` when the file has no row
    /// for some year in range.
    pub fn required_means(
        &self,
        years: YearRange,
        metric: Metric,
        key: &SeriesKey,
    ) -> Result<AnnualSeries> {
        let series = self.means(years);
        let absent: Vec<i32> = years.iter().filter(|y| series.get(*y).is_none()).collect();
        match absent.first() {
            None => Ok(series),
            Some(&first) => Err(Error::MissingYears {
                metric: metric.dir(),
                key: key.clone(),
                path: self.path().to_path_buf(),
                first,
                missing: absent.len(),
            }),
        }
    }

    /// Number of replicate columns of the first row.
    #[must_use]
    pub fn replicate_count(&self) -> usize {
        self.rows.first().map_or(0, |(_, v)| v.len())
    }

    /// Cross-replicate mean for each year in `years`.
    #[must_use]
    pub fn means(&self, years: YearRange) -> AnnualSeries {
        self.reduce(years, replicate_mean)
    }

    /// Cross-replicate median for each year in `years`.
    #[must_use]
    pub fn medians(&self, years: YearRange) -> AnnualSeries {
        self.reduce(years, replicate_median)
    }

    fn reduce(&self, years: YearRange, f: fn(&[f64]) -> f64) -> AnnualSeries {
        self.rows
            .iter()
            .filter(|(year, _)| years.contains(*year))
            .map(|(year, values)| (*year, f(values)))
            .collect()
    }
}

fn csv_error(path: &Path, source: csv::Error) -> Error {
    Error::SourceCsv {
        path: path.to_path_buf(),
        source,
    }
}

/// Parse a year index cell written either as an integer or as `1950.0`.
fn parse_year(cell: &str) -> Option<i32> {
    if let Ok(year) = cell.parse::<i32>() {
        return Some(year);
    }
    let value = cell.parse::<f64>().ok()?;
    (value.is_finite() && value.fract() == 0.0 && value.abs() < f64::from(i32::MAX))
        .then_some(value as i32)
}
