//! Total area burned
//!
//! Builds the tidy table `year, treatment, scenario, model, region, area`
//! (area in km², mean over replicates), then adds model-average rows and the
//! statewide totals of each spatial group. Total area burned is the primary
//! metric: every source file is required.

use std::fs;
use std::path::Path;

use rayon::prelude::*;
use tracing::info;

use crate::aggregate::{decadal_table, model_averages, statewide_sums};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::loader::{Metric, ReplicateTable, SourceLayout};
use crate::table::{SeriesKey, SeriesTable};

/// Annual and decadal area burned tables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AreaTables {
    /// Area burned per year
    pub annual: SeriesTable,
    /// Mean area burned per decade, keyed by the decade's first year
    pub decadal: SeriesTable,
}

/// Read every total area burned file and aggregate.
///
/// # Errors
/// Returns [`crate::Error::MissingSource`] naming the first absent
/// (region, treatment, scenario, model), [`crate::Error::MissingYears`] for a
/// file that does not cover its year range, or any read error.
pub fn compute_area(config: &PipelineConfig) -> Result<AreaTables> {
    let catalog = &config.catalog;
    let layout = SourceLayout::new(config);

    let mut jobs: Vec<(&str, SeriesKey)> = Vec::new();
    for group in &catalog.spatial_groups {
        for region in group.region_codes() {
            jobs.push((group.prefix.as_str(), config.historical_key(region)));
            for treatment in catalog.treatment_codes() {
                for scenario in catalog.scenario_codes() {
                    for model in catalog.model_codes() {
                        let key = SeriesKey::new(treatment, scenario, model, region);
                        jobs.push((group.prefix.as_str(), key));
                    }
                }
            }
        }
    }
    info!("Reading {} total area burned files", jobs.len());

    let mut annual: SeriesTable = jobs
        .par_iter()
        .map(|(prefix, key)| {
            let path = layout.path(prefix, Metric::TotalAreaBurned, key, None);
            let table = ReplicateTable::read_required(&path, Metric::TotalAreaBurned, key)?;
            let means = table.required_means(config.years_for(key), Metric::TotalAreaBurned, key)?;
            Ok((key.clone(), means))
        })
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .collect();

    let models: Vec<&str> = catalog.model_codes().collect();
    let averages = model_averages(&annual, &models);
    info!("Computed {} model-average series", averages.key_count());
    annual.extend(averages);

    for group in &catalog.spatial_groups {
        let sums = statewide_sums(&annual, group);
        info!("Computed {} {} series", sums.key_count(), group.statewide);
        annual.extend(sums);
    }

    let decadal = decadal_table(&annual);
    info!(
        "Total area burned: {} annual rows, {} decadal rows",
        annual.row_count(),
        decadal.row_count()
    );
    Ok(AreaTables { annual, decadal })
}

/// Write an area table as tidy CSV.
///
/// # Errors
/// Returns error if the file cannot be created or written.
pub fn write_area_csv<P: AsRef<Path>>(table: &SeriesTable, path: P) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["year", "treatment", "scenario", "model", "region", "area"])?;
    for row in table.rows() {
        writer.write_record([
            row.year.to_string(),
            row.key.treatment.clone(),
            row.key.scenario.clone(),
            row.key.model.clone(),
            row.key.region.clone(),
            row.value.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Entry, SpatialGroup, MODEL_AVG};
    use crate::config::YearRange;
    use crate::Error;

    fn write_area(config: &PipelineConfig, key: &SeriesKey, body: &str) {
        let path = SourceLayout::new(config).path("Zones", Metric::TotalAreaBurned, key, None);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    fn two_zone_config(data_dir: &Path) -> PipelineConfig {
        let mut catalog = Catalog::alaska();
        catalog.spatial_groups = vec![SpatialGroup {
            prefix: "Zones".to_string(),
            statewide: "AllFMZs".to_string(),
            statewide_label: "Statewide".to_string(),
            regions: ["TokArea", "DeltaArea"]
                .iter()
                .map(|c| Entry {
                    code: (*c).to_string(),
                    label: (*c).to_string(),
                })
                .collect(),
        }];
        catalog.treatments.truncate(1);
        catalog.scenarios.truncate(1);
        catalog.models.truncate(2);
        PipelineConfig {
            data_dir: data_dir.to_path_buf(),
            historical_years: YearRange::new(2000, 2000),
            future_years: YearRange::new(2014, 2015),
            cost_years: YearRange::new(2000, 2015),
            catalog,
            ..PipelineConfig::default()
        }
    }

    fn write_two_zone_tree(config: &PipelineConfig) {
        for (r, region) in ["TokArea", "DeltaArea"].iter().enumerate() {
            write_area(
                config,
                &config.historical_key(region),
                &format!("year,a,b\n2000,{},{}\n", r, r + 2),
            );
            for (m, model) in ["CCSM4", "GFDL-CM3"].iter().enumerate() {
                let key = SeriesKey::new("gcm_tx0", "rcp45", *model, *region);
                write_area(config, &key, &format!("year,a,b\n2014,{m},{m}\n2015,1,3\n"));
            }
        }
    }

    #[test]
    fn test_compute_area_small_tree() {
        let dir = tempfile::tempdir().unwrap();
        let config = two_zone_config(dir.path());
        write_two_zone_tree(&config);

        let tables = compute_area(&config).unwrap();
        let get = |t: &str, s: &str, m: &str, r: &str, y: i32| {
            tables.annual.get(&SeriesKey::new(t, s, m, r)).and_then(|x| x.get(y))
        };
        // Historical TokArea mean(0, 2) = 1, DeltaArea mean(1, 3) = 2
        assert_eq!(get("cru_tx0", "historical", "", "AllFMZs", 2000), Some(3.0));
        // Model average of CCSM4 (0) and GFDL-CM3 (1)
        assert_eq!(get("gcm_tx0", "rcp45", MODEL_AVG, "TokArea", 2014), Some(0.5));
        // Statewide of model average covers both zones
        assert_eq!(get("gcm_tx0", "rcp45", MODEL_AVG, "AllFMZs", 2014), Some(1.0));
        assert_eq!(get("gcm_tx0", "rcp45", "CCSM4", "AllFMZs", 2015), Some(4.0));
        // Decadal bucket 2010 holds 2014 and 2015
        let decadal = tables
            .decadal
            .get(&SeriesKey::new("gcm_tx0", "rcp45", "CCSM4", "TokArea"))
            .unwrap();
        assert_eq!(decadal.get(2010), Some(1.0));
    }

    #[test]
    fn test_missing_area_file_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let config = two_zone_config(dir.path());
        match compute_area(&config) {
            Err(Error::MissingSource { metric, .. }) => assert_eq!(metric, "total_area_burned"),
            other => panic!("expected MissingSource, got {other:?}"),
        }
    }

    #[test]
    fn test_file_short_of_range_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let config = two_zone_config(dir.path());
        write_two_zone_tree(&config);
        // Future file holding historical years only
        let key = SeriesKey::new("gcm_tx0", "rcp45", "GFDL-CM3", "DeltaArea");
        write_area(&config, &key, "year,a,b\n1950,1,1\n1951,2,2\n");

        match compute_area(&config) {
            Err(Error::MissingYears { key: short, first, missing, .. }) => {
                assert_eq!(short, key);
                assert_eq!(first, 2014);
                assert_eq!(missing, 2);
            }
            other => panic!("expected MissingYears, got {other:?}"),
        }
    }
}
