//! Fire suppression cost estimates
//!
//! Each simulated year is assigned one historical year with known costs via
//! a seeded draw, then
//!
//! ```text
//! cost = round(acres(area) * cost_per_acre[mapped_year][option])
//! ```
//!
//! with `acres(km2) = round(km2 * 247.11)`. Both roundings are half to even.
//!
//! # Reproducibility
//! [`map_year`] is a pure function of `(year, seed)`: it seeds a fresh
//! PCG-64 stream per year, so the mapping does not depend on how many other
//! years were drawn before or in which order.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregate::{model_averages, sum_regions};
use crate::catalog::{Catalog, FMO_SPATIAL_PREFIX, TOTAL_OPTION};
use crate::config::{PipelineConfig, YearRange};
use crate::error::{Error, Result};
use crate::loader::{Metric, ReplicateTable, SourceLayout};
use crate::table::{AnnualSeries, SeriesKey, SeriesTable};
use crate::units::SquareKilometers;

/// Historical years with recorded costs that simulated years map onto
/// (`2011..2017`, end exclusive).
pub const MAPPED_YEARS: std::ops::Range<i32> = 2011..2017;

/// Golden-ratio increment separating per-year seed streams.
const YEAR_STREAM_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Map a simulated year to a historical cost year.
///
/// Same `(year, seed)` always yields the same result.
#[must_use]
pub fn map_year(year: i32, seed: u64) -> i32 {
    let stream = (year as u64).wrapping_mul(YEAR_STREAM_STRIDE);
    let mut rng = Pcg64::seed_from_u64(seed ^ stream);
    rng.random_range(MAPPED_YEARS)
}

/// Tabulated [`map_year`] over a range of simulated years.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearMap {
    seed: u64,
    map: BTreeMap<i32, i32>,
}

impl YearMap {
    /// Draw the mapping for every year of `years`.
    #[must_use]
    pub fn generate(seed: u64, years: YearRange) -> Self {
        Self {
            seed,
            map: years.iter().map(|y| (y, map_year(y, seed))).collect(),
        }
    }

    /// Rebuild a mapping from stored pairs.
    pub fn from_pairs(seed: u64, pairs: impl IntoIterator<Item = (i32, i32)>) -> Self {
        Self {
            seed,
            map: pairs.into_iter().collect(),
        }
    }

    /// Seed the map was drawn with.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Historical year for a simulated year.
    ///
    /// # Errors
    /// Returns [`Error::UnmappedYear`] when `year` is outside the map.
    pub fn get(&self, year: i32) -> Result<i32> {
        self.map.get(&year).copied().ok_or(Error::UnmappedYear(year))
    }

    /// `(simulated, historical)` pairs in year order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.map.iter().map(|(&y, &m)| (y, m))
    }

    /// Number of mapped years.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when no years are mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Write the mapping as `year,mapped_year` CSV so it can be checked.
    ///
    /// # Errors
    /// Returns error if the file cannot be created or written.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["year", "mapped_year"])?;
        for (year, mapped) in self.iter() {
            writer.write_record([year.to_string(), mapped.to_string()])?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Cost per acre of one historical year, by FMO option code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CostYear {
    /// Historical year
    pub year: i32,
    /// Dollars per acre keyed by option code
    pub per_acre: BTreeMap<String, f64>,
}

/// Historical cost factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CostFactors(Vec<CostYear>);

impl CostFactors {
    /// Alaska suppression costs per acre by FMO, 2011-2017.
    #[must_use]
    pub fn alaska_2011_2017() -> Self {
        let table: [(i32, [f64; 4]); 7] = [
            (2011, [2459.09, 350.73, 16.32, 13.90]),
            (2012, [473.14, 257.41, 22.10, 0.30]),
            (2013, [12868.50, 456.14, 163.92, 7.57]),
            (2014, [11159.65, 76.36, 356.08, 92.00]),
            (2015, [198.39, 88.92, 31.28, 10.62]),
            (2016, [6934.64, 311.76, 56.44, 8.07]),
            (2017, [8439.06, 119.61, 534.23, 12.04]),
        ];
        Self(
            table
                .iter()
                .map(|(year, [c, f, m, l])| CostYear {
                    year: *year,
                    per_acre: [("C", *c), ("F", *f), ("M", *m), ("L", *l)]
                        .into_iter()
                        .map(|(code, v)| (code.to_string(), v))
                        .collect(),
                })
                .collect(),
        )
    }

    /// Cost per acre for a historical year and option.
    ///
    /// # Errors
    /// Returns [`Error::MissingCostFactor`] for an unrecorded year and
    /// [`Error::UnknownCostOption`] for an option code absent that year.
    pub fn factor(&self, year: i32, option: &str) -> Result<f64> {
        let row = self
            .0
            .iter()
            .find(|r| r.year == year)
            .ok_or(Error::MissingCostFactor(year))?;
        row.per_acre
            .get(option)
            .copied()
            .ok_or_else(|| Error::UnknownCostOption(option.to_string()))
    }

    /// Verify that every recorded year has a factor for `option`.
    ///
    /// # Errors
    /// Returns [`Error::UnknownCostOption`] otherwise.
    pub fn check_option(&self, option: &str) -> Result<()> {
        if self.0.iter().all(|r| r.per_acre.contains_key(option)) && !self.0.is_empty() {
            Ok(())
        } else {
            Err(Error::UnknownCostOption(option.to_string()))
        }
    }

    /// Verify that every historical year `map` can produce has factors.
    ///
    /// # Errors
    /// Returns [`Error::MissingCostFactor`] for the first gap.
    pub fn check_covers(&self, map: &YearMap) -> Result<()> {
        for (_, mapped) in map.iter() {
            if !self.0.iter().any(|r| r.year == mapped) {
                return Err(Error::MissingCostFactor(mapped));
            }
        }
        Ok(())
    }
}

/// Converts burned area to cost through a year map and cost factors.
#[derive(Debug, Clone, Copy)]
pub struct CostEstimator<'a> {
    factors: &'a CostFactors,
    year_map: &'a YearMap,
}

impl<'a> CostEstimator<'a> {
    /// Estimator over `factors` and `year_map`.
    #[must_use]
    pub fn new(factors: &'a CostFactors, year_map: &'a YearMap) -> Self {
        Self { factors, year_map }
    }

    /// Cost of burning `area_km2` in simulated `year` under FMO `option`.
    ///
    /// # Errors
    /// Fails for an unmapped year, an unknown option code, or a mapped year
    /// without factors.
    pub fn row_cost(&self, year: i32, option: &str, area_km2: f64) -> Result<f64> {
        let mapped = self.year_map.get(year)?;
        let factor = self.factors.factor(mapped, option)?;
        let acres = SquareKilometers::new(area_km2).to_acres();
        Ok((*acres * factor).round_ties_even())
    }

    /// Cost series for an area series.
    ///
    /// # Errors
    /// Same as [`CostEstimator::row_cost`].
    pub fn series_cost(&self, option: &str, area: &AnnualSeries) -> Result<AnnualSeries> {
        area.iter()
            .map(|(year, a)| Ok((year, self.row_cost(year, option, a)?)))
            .collect()
    }
}

/// One flat row of the cost table.
#[derive(Debug, Clone, PartialEq)]
pub struct CostRecord<'a> {
    /// Simulated year
    pub year: i32,
    /// Treatment code
    pub treatment: &'a str,
    /// Scenario code
    pub scenario: &'a str,
    /// Model code (empty for historical)
    pub model: &'a str,
    /// FMO option code or `total`
    pub option: &'a str,
    /// Burned area (km²)
    pub area: f64,
    /// Estimated cost (dollars)
    pub cost: f64,
}

/// Area and cost tables keyed with the FMO option as the region column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CostTable {
    /// Burned area (km²)
    pub area: SeriesTable,
    /// Estimated cost (dollars)
    pub cost: SeriesTable,
}

impl CostTable {
    /// Flat records ordered by key then year.
    pub fn records(&self) -> impl Iterator<Item = CostRecord<'_>> {
        self.area.iter().flat_map(move |(key, area)| {
            let cost = self.cost.get(key);
            area.iter().map(move |(year, a)| CostRecord {
                year,
                treatment: &key.treatment,
                scenario: &key.scenario,
                model: &key.model,
                option: &key.region,
                area: a,
                cost: cost.and_then(|c| c.get(year)).unwrap_or(f64::NAN),
            })
        })
    }

    /// Number of flat records.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.area.row_count()
    }
}

/// Build the cost table from the per-FMO-option area files.
///
/// Missing option files are logged and skipped. Model averages are taken
/// over area and re-costed; `total` rows sum area and cost across options.
///
/// # Errors
/// Fails on malformed source files or any cost lookup failure.
pub fn compute_costs(config: &PipelineConfig, year_map: &YearMap) -> Result<CostTable> {
    let catalog = &config.catalog;
    catalog.cost_factors.check_covers(year_map)?;
    let estimator = CostEstimator::new(&catalog.cost_factors, year_map);
    let layout = SourceLayout::new(config);

    let jobs = cost_keys(config, catalog);
    info!("Reading {} FMO option area files", jobs.len());
    let loaded = jobs
        .par_iter()
        .map(|key| {
            let path = layout.path(FMO_SPATIAL_PREFIX, Metric::TotalAreaBurned, key, None);
            let table = ReplicateTable::read_optional(&path)?;
            if table.is_none() {
                warn!("No FMO file found {}", path.display());
            }
            Ok(table.map(|t| (key.clone(), t.means(config.years_for(key)))))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut costs = CostTable::default();
    for (key, area) in loaded.into_iter().flatten() {
        let cost = estimator.series_cost(&key.region, &area)?;
        costs.cost.insert(key.clone(), cost);
        costs.area.insert(key, area);
    }

    let models: Vec<&str> = catalog.model_codes().collect();
    let averages = model_averages(&costs.area, &models);
    for (key, area) in averages.iter() {
        costs
            .cost
            .insert(key.clone(), estimator.series_cost(&key.region, area)?);
    }
    costs.area.extend(averages);

    let options: Vec<&str> = catalog.option_codes().collect();
    let total_area = sum_regions(&costs.area, &options, TOTAL_OPTION);
    let total_cost = sum_regions(&costs.cost, &options, TOTAL_OPTION);
    costs.area.extend(total_area);
    costs.cost.extend(total_cost);

    info!("Computed {} cost records", costs.row_count());
    Ok(costs)
}

fn cost_keys(config: &PipelineConfig, catalog: &Catalog) -> Vec<SeriesKey> {
    let mut keys: Vec<SeriesKey> = catalog
        .option_codes()
        .map(|option| config.historical_key(option))
        .collect();
    for treatment in catalog.treatment_codes() {
        for scenario in catalog.scenario_codes() {
            for model in catalog.model_codes() {
                for option in catalog.option_codes() {
                    keys.push(SeriesKey::new(treatment, scenario, model, option));
                }
            }
        }
    }
    keys
}

/// Write the cost table as tidy CSV.
///
/// # Errors
/// Returns error if the file cannot be created or written.
pub fn write_costs_csv<P: AsRef<Path>>(costs: &CostTable, path: P) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["year", "treatment", "scenario", "model", "option", "area", "cost"])?;
    for r in costs.records() {
        writer.write_record([
            r.year.to_string(),
            r.treatment.to_string(),
            r.scenario.to_string(),
            r.model.to_string(),
            r.option.to_string(),
            r.area.to_string(),
            r.cost.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
