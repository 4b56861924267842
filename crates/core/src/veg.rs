//! Vegetation counts: deciduous vs. coniferous cells per year
//!
//! Deciduous comes from one forest type file; coniferous is black spruce plus
//! white spruce. Replicates are reduced with the median. When only one spruce
//! subtype exists for a key it stands in for the coniferous total; when both
//! are absent the run stops.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::aggregate::{model_averages, statewide_sums};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::loader::{Metric, ReplicateTable, SourceLayout};
use crate::table::{AnnualSeries, SeriesKey, SeriesTable};

/// Forest type file tag of deciduous counts.
pub const DECIDUOUS: &str = "Deciduous";
/// Forest type file tag of black spruce counts.
pub const BLACK_SPRUCE: &str = "BlackSpruce";
/// Forest type file tag of white spruce counts.
pub const WHITE_SPRUCE: &str = "WhiteSpruce";

/// Deciduous and coniferous tables sharing one key space.
///
/// A key may be missing from `deciduous` when its source file was absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VegTable {
    /// Deciduous cell counts
    pub deciduous: SeriesTable,
    /// Coniferous cell counts
    pub coniferous: SeriesTable,
}

/// One flat row of the vegetation table.
#[derive(Debug, Clone, PartialEq)]
pub struct VegRecord<'a> {
    /// Year index
    pub year: i32,
    /// Key columns
    pub key: &'a SeriesKey,
    /// Deciduous count, if recorded
    pub deciduous: Option<f64>,
    /// Coniferous count, if recorded
    pub coniferous: Option<f64>,
}

impl VegTable {
    /// Flat records over every key and year of either table, in key then
    /// year order.
    pub fn records(&self) -> impl Iterator<Item = VegRecord<'_>> {
        let keys: BTreeSet<&SeriesKey> = self
            .coniferous
            .iter()
            .chain(self.deciduous.iter())
            .map(|(key, _)| key)
            .collect();
        keys.into_iter().flat_map(move |key| {
            let deciduous = self.deciduous.get(key);
            let coniferous = self.coniferous.get(key);
            let years: BTreeSet<i32> = deciduous
                .into_iter()
                .chain(coniferous)
                .flat_map(AnnualSeries::years)
                .collect();
            years.into_iter().map(move |year| VegRecord {
                year,
                key,
                deciduous: deciduous.and_then(|d| d.get(year)),
                coniferous: coniferous.and_then(|c| c.get(year)),
            })
        })
    }

    /// Number of flat records.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.records().count()
    }
}

/// Counts read for one key.
struct KeyCounts {
    key: SeriesKey,
    deciduous: Option<AnnualSeries>,
    coniferous: AnnualSeries,
}

fn read_key(
    layout: &SourceLayout<'_>,
    config: &PipelineConfig,
    spatial_prefix: &str,
    key: &SeriesKey,
) -> Result<KeyCounts> {
    let years = config.years_for(key);
    let read = |forest: &str| -> Result<Option<AnnualSeries>> {
        let path = layout.path(spatial_prefix, Metric::VegCounts, key, Some(forest));
        Ok(ReplicateTable::read_optional(&path)?.map(|t| t.medians(years)))
    };

    let deciduous = read(DECIDUOUS)?;
    if deciduous.is_none() {
        warn!("No deciduous counts found for {key} in {spatial_prefix}");
    }

    let coniferous = match (read(WHITE_SPRUCE)?, read(BLACK_SPRUCE)?) {
        (Some(white), Some(black)) => {
            let summed: AnnualSeries = white
                .iter()
                .filter_map(|(year, w)| black.get(year).map(|b| (year, w + b)))
                .collect();
            let unpaired = white.len() + black.len() - 2 * summed.len();
            if unpaired > 0 {
                warn!(
                    "Dropped {unpaired} unpaired spruce year(s) for {key} in {spatial_prefix}"
                );
            }
            summed
        }
        (Some(white), None) => {
            warn!("Only white spruce found for {key} in {spatial_prefix}");
            white
        }
        (None, Some(black)) => {
            warn!("Only black spruce found for {key} in {spatial_prefix}");
            black
        }
        (None, None) => return Err(Error::MissingConifer { key: key.clone() }),
    };

    Ok(KeyCounts {
        key: key.clone(),
        deciduous,
        coniferous,
    })
}

/// Build the vegetation table for every region, historical and future, plus
/// model averages and statewide sums.
///
/// # Errors
/// Fails when both spruce subtypes are missing for a key, or on malformed
/// source files.
pub fn compute_veg(config: &PipelineConfig) -> Result<VegTable> {
    let catalog = &config.catalog;
    let layout = SourceLayout::new(config);

    let mut jobs: Vec<(&str, SeriesKey)> = Vec::new();
    for group in &catalog.spatial_groups {
        for region in group.region_codes() {
            jobs.push((group.prefix.as_str(), config.historical_key(region)));
            for treatment in catalog.treatment_codes() {
                for scenario in catalog.scenario_codes() {
                    for model in catalog.model_codes() {
                        jobs.push((group.prefix.as_str(), SeriesKey::new(treatment, scenario, model, region)));
                    }
                }
            }
        }
    }
    info!("Reading vegetation counts for {} keys", jobs.len());

    let counts = jobs
        .par_iter()
        .map(|(prefix, key)| read_key(&layout, config, prefix, key))
        .collect::<Result<Vec<_>>>()?;

    let mut veg = VegTable::default();
    for KeyCounts {
        key,
        deciduous,
        coniferous,
    } in counts
    {
        if let Some(deciduous) = deciduous {
            veg.deciduous.insert(key.clone(), deciduous);
        }
        veg.coniferous.insert(key, coniferous);
    }

    let models: Vec<&str> = catalog.model_codes().collect();
    let deciduous_avg = model_averages(&veg.deciduous, &models);
    let coniferous_avg = model_averages(&veg.coniferous, &models);
    veg.deciduous.extend(deciduous_avg);
    veg.coniferous.extend(coniferous_avg);

    for group in &catalog.spatial_groups {
        let deciduous_sum = statewide_sums(&veg.deciduous, group);
        let coniferous_sum = statewide_sums(&veg.coniferous, group);
        veg.deciduous.extend(deciduous_sum);
        veg.coniferous.extend(coniferous_sum);
    }

    info!("Computed {} vegetation records", veg.row_count());
    Ok(veg)
}

/// Write the vegetation table as tidy CSV; missing cells are empty.
///
/// # Errors
/// Returns error if the file cannot be created or written.
pub fn write_veg_csv<P: AsRef<Path>>(veg: &VegTable, path: P) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "year",
        "treatment",
        "scenario",
        "model",
        "region",
        "deciduous",
        "coniferous",
    ])?;
    for r in veg.records() {
        writer.write_record([
            r.year.to_string(),
            r.key.treatment.clone(),
            r.key.scenario.clone(),
            r.key.model.clone(),
            r.key.region.clone(),
            r.deciduous.map(|d| d.to_string()).unwrap_or_default(),
            r.coniferous.map(|c| c.to_string()).unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
