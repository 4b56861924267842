//! Synthetic ALFRESCO output tree shared by the integration tests
#![allow(dead_code)]

use std::fs;
use std::path::Path;

use jfsp_core::catalog::FMO_SPATIAL_PREFIX;
use jfsp_core::loader::{Metric, SourceLayout};
use jfsp_core::veg::{BLACK_SPRUCE, DECIDUOUS, WHITE_SPRUCE};
use jfsp_core::{Catalog, Entry, PipelineConfig, SeriesKey, SpatialGroup, YearRange};

pub const ZONE_PREFIX: &str = "FireManagementZones";
pub const ZONES: [&str; 2] = ["TokArea", "DeltaArea"];
pub const TREATMENT: &str = "gcm_tx0";
pub const SCENARIO: &str = "rcp85";
/// Option file left out for this model to exercise the skip path
pub const MODEL_WITHOUT_LIMITED: &str = "CCSM4";

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Two zones, one treatment, one scenario, all five models, short year ranges.
pub fn config(data_dir: &Path, out_dir: &Path) -> PipelineConfig {
    let mut catalog = Catalog::alaska();
    catalog.spatial_groups = vec![SpatialGroup {
        prefix: ZONE_PREFIX.to_string(),
        statewide: "AllFMZs".to_string(),
        statewide_label: "Statewide".to_string(),
        regions: ZONES
            .iter()
            .map(|z| Entry {
                code: (*z).to_string(),
                label: (*z).to_string(),
            })
            .collect(),
    }];
    catalog.treatments.retain(|t| t.code == TREATMENT);
    catalog.scenarios.retain(|s| s.code == SCENARIO);

    PipelineConfig {
        data_dir: data_dir.to_path_buf(),
        out_dir: out_dir.to_path_buf(),
        historical_years: YearRange::new(2010, 2013),
        future_years: YearRange::new(2014, 2025),
        cost_years: YearRange::new(2010, 2025),
        rolling_window: 3,
        catalog,
        ..PipelineConfig::default()
    }
}

/// Mean area (km²) written for a zone (1-based), model index and year.
pub fn area_value(zone: usize, model: usize, year: i32) -> f64 {
    ((model + 1) * zone) as f64 + f64::from(year - 2010)
}

fn write_replicates(path: &Path, years: YearRange, value: impl Fn(i32) -> [f64; 3]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut body = String::from("year,rep0,rep1,rep2\n");
    for year in years.iter() {
        let [a, b, c] = value(year);
        body.push_str(&format!("{year},{a},{b},{c}\n"));
    }
    fs::write(path, body).unwrap();
}

/// Write every area, vegetation and FMO option file the config expects.
pub fn write_tree(config: &PipelineConfig) {
    let layout = SourceLayout::new(config);
    let catalog = &config.catalog;

    for (z, zone) in ZONES.iter().enumerate() {
        let zone_index = z + 1;

        let hist = config.historical_key(zone);
        write_zone_files(&layout, config, &hist, zone_index, 0);

        for (m, model) in catalog.model_codes().enumerate() {
            let key = SeriesKey::new(TREATMENT, SCENARIO, model, *zone);
            write_zone_files(&layout, config, &key, zone_index, m);
        }
    }

    let hist_keys = catalog.option_codes().map(|o| config.historical_key(o));
    let future_keys = catalog.model_codes().flat_map(|model| {
        catalog
            .option_codes()
            .map(move |o| SeriesKey::new(TREATMENT, SCENARIO, model, o))
    });
    for (i, key) in hist_keys.chain(future_keys).enumerate() {
        if key.model == MODEL_WITHOUT_LIMITED && key.region == "L" {
            continue;
        }
        let path = layout.path(FMO_SPATIAL_PREFIX, Metric::TotalAreaBurned, &key, None);
        let base = (i % 4 + 1) as f64;
        write_replicates(&path, config.years_for(&key), |_| [base, base, base]);
    }
}

fn write_zone_files(
    layout: &SourceLayout<'_>,
    config: &PipelineConfig,
    key: &SeriesKey,
    zone: usize,
    model: usize,
) {
    let years = config.years_for(key);
    let path = layout.path(ZONE_PREFIX, Metric::TotalAreaBurned, key, None);
    write_replicates(&path, years, |y| {
        let v = area_value(zone, model, y);
        [v - 1.0, v, v + 1.0]
    });

    for (forest, base) in [(DECIDUOUS, 100.0), (BLACK_SPRUCE, 10.0), (WHITE_SPRUCE, 20.0)] {
        let path = layout.path(ZONE_PREFIX, Metric::VegCounts, key, Some(forest));
        let offset = zone as f64;
        write_replicates(&path, years, |_| [base + offset, base + offset, base + offset + 3.0]);
    }
}
