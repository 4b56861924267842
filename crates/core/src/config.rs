//! Pipeline configuration
//!
//! Defaults reproduce the JFSP ALFRESCO runs; a TOML file can override any
//! field. Unknown keys are rejected so a typo cannot silently fall back to a
//! default.
//!
//! ```toml
//! data_dir = "data"
//! seed = 7
//! rolling_window = 20
//!
//! [future_years]
//! first = 2014
//! last = 2099
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{Catalog, HISTORICAL_SCENARIO};
use crate::error::{Error, Result};
use crate::query::MAX_ROLLING_WINDOW;
use crate::table::SeriesKey;

/// Inclusive range of years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YearRange {
    /// First year (inclusive)
    pub first: i32,
    /// Last year (inclusive)
    pub last: i32,
}

impl YearRange {
    /// Create a range `first..=last`.
    #[must_use]
    pub const fn new(first: i32, last: i32) -> Self {
        Self { first, last }
    }

    /// True when `year` lies in the range.
    #[must_use]
    pub fn contains(&self, year: i32) -> bool {
        (self.first..=self.last).contains(&year)
    }

    /// Years in order.
    pub fn iter(&self) -> impl Iterator<Item = i32> {
        self.first..=self.last
    }

    /// True when the range has no years.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first > self.last
    }

    /// True when every year of `other` lies in this range.
    #[must_use]
    pub fn covers(&self, other: &YearRange) -> bool {
        other.is_empty() || (self.contains(other.first) && self.contains(other.last))
    }
}

/// Preprocessing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PipelineConfig {
    /// Root of the ALFRESCO output tree
    pub data_dir: PathBuf,
    /// Directory receiving the snapshot and CSV exports
    pub out_dir: PathBuf,
    /// FMO run prefix of future file names
    pub fmo_prefix: String,
    /// FMO run prefix (and directory) of historical files
    pub historical_fmo_prefix: String,
    /// Date suffix of future file names
    pub date_postfix: String,
    /// Date suffix of historical file names
    pub historical_date_postfix: String,
    /// Treatment directory holding the historical runs
    pub historical_treatment: String,
    /// Seed of the cost year map
    pub seed: u64,
    /// Default rolling window in years
    pub rolling_window: usize,
    /// Years kept from historical files
    pub historical_years: YearRange,
    /// Years kept from future files
    pub future_years: YearRange,
    /// Domain of the cost year map
    pub cost_years: YearRange,
    /// Lookup tables
    pub catalog: Catalog,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            out_dir: PathBuf::from("."),
            fmo_prefix: "fmo99s95i".to_string(),
            historical_fmo_prefix: "fmo99s95i_historical_CRU32".to_string(),
            date_postfix: "2014_2099".to_string(),
            historical_date_postfix: "1950_2013".to_string(),
            historical_treatment: "cru_tx0".to_string(),
            seed: 1,
            rolling_window: 30,
            historical_years: YearRange::new(1950, 2013),
            future_years: YearRange::new(2014, 2099),
            cost_years: YearRange::new(1950, 2099),
            catalog: Catalog::alaska(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a TOML configuration file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, is not valid TOML for this
    /// schema, or fails [`PipelineConfig::validate`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading pipeline configuration from {}", path.display());
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text.
    ///
    /// # Errors
    /// Returns error on TOML syntax/schema errors or invalid values.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check semantic constraints.
    ///
    /// # Errors
    /// Returns a configuration error describing the first violation.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_ROLLING_WINDOW).contains(&self.rolling_window) {
            return Err(Error::config(format!(
                "rolling_window {} outside 1..={MAX_ROLLING_WINDOW}",
                self.rolling_window
            )));
        }
        for (name, range) in [
            ("historical_years", &self.historical_years),
            ("future_years", &self.future_years),
            ("cost_years", &self.cost_years),
        ] {
            if range.is_empty() {
                return Err(Error::config(format!(
                    "{name} is empty ({}..={})",
                    range.first, range.last
                )));
            }
        }
        if !self.cost_years.covers(&self.historical_years)
            || !self.cost_years.covers(&self.future_years)
        {
            return Err(Error::config(
                "cost_years must cover both historical_years and future_years",
            ));
        }
        if self.historical_treatment.is_empty() {
            return Err(Error::config("historical_treatment must not be empty"));
        }
        self.catalog.validate()
    }

    /// Key of the historical series for `region`.
    #[must_use]
    pub fn historical_key(&self, region: &str) -> SeriesKey {
        SeriesKey::new(&self.historical_treatment, HISTORICAL_SCENARIO, "", region)
    }

    /// Year range kept for rows with this key.
    #[must_use]
    pub fn years_for(&self, key: &SeriesKey) -> YearRange {
        if key.scenario == HISTORICAL_SCENARIO {
            self.historical_years
        } else {
            self.future_years
        }
    }
}
