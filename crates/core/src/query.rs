//! Read-only dashboard queries over a loaded snapshot
//!
//! Every query filters the precomputed tables, relabels keys with catalog
//! names and, at most, applies a cheap rolling window. Nothing here reads
//! source files or recomputes an aggregate.

use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::{decadal_means, rolling_mean, rolling_std};
use crate::catalog::{Catalog, HISTORICAL_SCENARIO, TOTAL_OPTION};
use crate::error::{Error, Result};
use crate::snapshot::Snapshot;
use crate::table::{AnnualSeries, SeriesKey, SeriesTable};
use crate::units::SquareKilometers;

/// Largest rolling window the dashboard slider offers.
pub const MAX_ROLLING_WINDOW: usize = 40;

/// Bar interval of area charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    /// One bar per year
    #[default]
    Annual,
    /// One bar per decade
    Decadal,
}

/// Selection shared by every chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesRequest {
    /// Region or statewide aggregate code
    pub region: String,
    /// Scenario codes
    pub scenarios: Vec<String>,
    /// Model codes (including `5modelavg`)
    pub models: Vec<String>,
    /// Treatment codes
    pub treatments: Vec<String>,
    /// Annual or decadal bars
    pub interval: Interval,
    /// Rolling window in years; `None` uses the snapshot default
    pub rolling_window: Option<usize>,
    /// Append the historical series
    pub show_historical: bool,
}

impl SeriesRequest {
    /// Annual request for one region with nothing else selected.
    pub fn for_region(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            scenarios: Vec::new(),
            models: Vec::new(),
            treatments: Vec::new(),
            interval: Interval::Annual,
            rolling_window: None,
            show_historical: false,
        }
    }
}

/// Chart-ready series: x values, y values and a legend label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    /// Years (or decade starts)
    pub x: Vec<i32>,
    /// Values; undefined points serialize as `null`
    pub y: Vec<f64>,
    /// Legend label
    pub label: String,
}

impl Trace {
    fn new(series: &AnnualSeries, label: String) -> Self {
        let (x, y) = series.to_columns();
        Self { x, y, label }
    }
}

type Index = FxHashMap<SeriesKey, AnnualSeries>;

fn index(table: SeriesTable) -> Index {
    table.into_iter().collect()
}

fn to_acres(series: &AnnualSeries) -> AnnualSeries {
    series.map(|km2| *SquareKilometers::new(km2).to_acres())
}

/// Query surface of the dashboard.
#[derive(Debug, Clone)]
pub struct Dashboard {
    catalog: Catalog,
    rolling_window: usize,
    area: Index,
    decadal_area: Index,
    deciduous: Index,
    coniferous: Index,
    cost: Index,
}

impl Dashboard {
    /// Build hash-keyed lookups over a snapshot.
    #[must_use]
    pub fn new(snapshot: Snapshot, catalog: Catalog) -> Self {
        let dashboard = Self {
            catalog,
            rolling_window: snapshot.rolling_window,
            area: index(snapshot.area.annual),
            decadal_area: index(snapshot.area.decadal),
            deciduous: index(snapshot.veg.deciduous),
            coniferous: index(snapshot.veg.coniferous),
            cost: index(snapshot.costs.cost),
        };
        debug!(
            "Dashboard indexed {} area, {} vegetation and {} cost series",
            dashboard.area.len(),
            dashboard.coniferous.len(),
            dashboard.cost.len()
        );
        dashboard
    }

    /// Load a snapshot file and index it.
    ///
    /// # Errors
    /// Returns any error of [`Snapshot::load`].
    pub fn load<P: AsRef<Path>>(path: P, catalog: Catalog) -> Result<Self> {
        Ok(Self::new(Snapshot::load(path)?, catalog))
    }

    /// Lookup tables used for labels.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Rolling window used when a request leaves it unset.
    #[must_use]
    pub fn default_rolling_window(&self) -> usize {
        self.rolling_window
    }

    /// Total area burned in acres.
    ///
    /// One bar trace per selected (treatment, scenario, model); the annual
    /// interval adds a centered rolling mean trace after each. Historical
    /// traces come last when requested.
    ///
    /// # Errors
    /// Returns [`Error::SeriesNotFound`] for a selection with no rows, or a
    /// configuration error for a rolling window outside `1..=40`.
    pub fn generate_series(&self, request: &SeriesRequest) -> Result<Vec<Trace>> {
        let window = self.window(request)?;
        let mut traces = Vec::new();
        for (key, label) in self.selection(request)? {
            match request.interval {
                Interval::Annual => {
                    let acres = to_acres(lookup(&self.area, "total_area_burned", &key)?);
                    traces.push(Trace::new(&acres, label.clone()));
                    traces.push(Trace::new(
                        &rolling_mean(&acres, window),
                        format!("{window}yr rolling {label}"),
                    ));
                }
                Interval::Decadal => {
                    let decadal = lookup(&self.decadal_area, "decadal_area", &key)?;
                    traces.push(Trace::new(&to_acres(decadal), label));
                }
            }
        }
        Ok(traces)
    }

    /// Coniferous to deciduous cell ratio per year (or decade).
    ///
    /// Years without a deciduous count are left out; a zero count gives an
    /// undefined point.
    ///
    /// # Errors
    /// Returns [`Error::SeriesNotFound`] when either count is missing for a
    /// selected key.
    pub fn veg_ratio_series(&self, request: &SeriesRequest) -> Result<Vec<Trace>> {
        self.selection(request)?
            .into_iter()
            .map(|(key, label)| {
                let mut coniferous = lookup(&self.coniferous, "coniferous", &key)?.clone();
                let mut deciduous = lookup(&self.deciduous, "deciduous", &key)?.clone();
                if request.interval == Interval::Decadal {
                    coniferous = decadal_means(&coniferous);
                    deciduous = decadal_means(&deciduous);
                }
                let ratio: AnnualSeries = coniferous
                    .iter()
                    .filter_map(|(year, c)| {
                        deciduous
                            .get(year)
                            .map(|d| (year, if d == 0.0 { f64::NAN } else { c / d }))
                    })
                    .collect();
                Ok(Trace::new(&ratio, label))
            })
            .collect()
    }

    /// Centered rolling standard deviation of annual area burned in acres.
    ///
    /// # Errors
    /// Same as [`Dashboard::generate_series`].
    pub fn variability_series(&self, request: &SeriesRequest) -> Result<Vec<Trace>> {
        let window = self.window(request)?;
        self.selection(request)?
            .into_iter()
            .map(|(key, label)| {
                let acres = to_acres(lookup(&self.area, "total_area_burned", &key)?);
                Ok(Trace::new(
                    &rolling_std(&acres, window),
                    format!("{label} ({window}yr std dev)"),
                ))
            })
            .collect()
    }

    /// Estimated suppression cost in dollars for one FMO option or `total`.
    ///
    /// Costs are statewide, so the request region is ignored.
    ///
    /// # Errors
    /// Returns [`Error::UnknownCostOption`] for an option outside the
    /// catalog, or [`Error::SeriesNotFound`] for a selection with no rows.
    pub fn cost_series(&self, request: &SeriesRequest, option: &str) -> Result<Vec<Trace>> {
        if option != TOTAL_OPTION && !self.catalog.option_codes().any(|c| c == option) {
            return Err(Error::UnknownCostOption(option.to_string()));
        }
        let request = SeriesRequest {
            region: option.to_string(),
            ..request.clone()
        };
        let option_label = self.catalog.option_label(option);
        self.selection(&request)?
            .into_iter()
            .map(|(key, label)| {
                let cost = lookup(&self.cost, "costs", &key)?;
                let series = match request.interval {
                    Interval::Annual => cost.clone(),
                    Interval::Decadal => decadal_means(cost),
                };
                Ok(Trace::new(&series, format!("{label}, {option_label}")))
            })
            .collect()
    }

    fn window(&self, request: &SeriesRequest) -> Result<usize> {
        let window = request.rolling_window.unwrap_or(self.rolling_window);
        if (1..=MAX_ROLLING_WINDOW).contains(&window) {
            Ok(window)
        } else {
            Err(Error::config(format!(
                "rolling window {window} outside 1..={MAX_ROLLING_WINDOW}"
            )))
        }
    }

    /// Keys and labels of the request, future combinations first.
    fn selection(&self, request: &SeriesRequest) -> Result<Vec<(SeriesKey, String)>> {
        let catalog = &self.catalog;
        let mut keys = Vec::new();
        for treatment in &request.treatments {
            for scenario in &request.scenarios {
                for model in &request.models {
                    let label = format!(
                        "{}, {}, {}",
                        catalog.treatment_label(treatment),
                        catalog.scenario_label(scenario),
                        catalog.model_label(model)
                    );
                    keys.push((
                        SeriesKey::new(treatment, scenario, model, &request.region),
                        label,
                    ));
                }
            }
        }
        if request.show_historical {
            let key = self.historical_key(&request.region)?;
            keys.push((key, catalog.scenario_label(HISTORICAL_SCENARIO).to_string()));
        }
        Ok(keys)
    }

    /// Historical key of a region, whatever treatment the run used.
    fn historical_key(&self, region: &str) -> Result<SeriesKey> {
        self.area
            .keys()
            .chain(self.cost.keys())
            .filter(|k| k.scenario == HISTORICAL_SCENARIO && k.region == region)
            .min()
            .cloned()
            .ok_or_else(|| Error::SeriesNotFound {
                table: "historical",
                key: SeriesKey::new("", HISTORICAL_SCENARIO, "", region),
            })
    }
}

fn lookup<'a>(index: &'a Index, table: &'static str, key: &SeriesKey) -> Result<&'a AnnualSeries> {
    index.get(key).ok_or_else(|| Error::SeriesNotFound {
        table,
        key: key.clone(),
    })
}
