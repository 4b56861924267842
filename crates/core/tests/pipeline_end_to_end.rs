//! End-to-end preprocessing over a synthetic ALFRESCO tree
mod common;

use std::fs;

use approx::assert_relative_eq;
use jfsp_core::aggregate::decadal_means;
use jfsp_core::loader::{Metric, SourceLayout};
use jfsp_core::{Error, Preprocessor, RunOptions, SeriesKey, Snapshot, MODEL_AVG, TOTAL_OPTION};

use common::{area_value, MODEL_WITHOUT_LIMITED, SCENARIO, TREATMENT, ZONES, ZONE_PREFIX};

fn build(seed: u64) -> (tempfile::TempDir, Snapshot) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::config(&dir.path().join("data"), &dir.path().join("out"));
    config.seed = seed;
    common::write_tree(&config);
    let snapshot = Preprocessor::new(config, RunOptions::default())
        .unwrap()
        .build()
        .unwrap();
    (dir, snapshot)
}

#[test]
fn test_area_means_and_statewide_sums() {
    let (_dir, snapshot) = build(1);
    let annual = &snapshot.area.annual;

    let tok = annual
        .get(&SeriesKey::new(TREATMENT, SCENARIO, "GFDL-CM3", "TokArea"))
        .unwrap();
    assert_relative_eq!(tok.get(2020).unwrap(), area_value(1, 1, 2020));
    assert_eq!(tok.span(), Some((2014, 2025)));

    for model in ["CCSM4", "MRI-CGCM3", MODEL_AVG] {
        let statewide = annual
            .get(&SeriesKey::new(TREATMENT, SCENARIO, model, "AllFMZs"))
            .unwrap();
        for (year, total) in statewide.iter() {
            let parts: f64 = ZONES
                .iter()
                .map(|z| {
                    annual
                        .get(&SeriesKey::new(TREATMENT, SCENARIO, model, *z))
                        .and_then(|s| s.get(year))
                        .unwrap()
                })
                .sum();
            assert_eq!(total, parts);
        }
    }

    let hist = annual
        .get(&SeriesKey::new("cru_tx0", "historical", "", "AllFMZs"))
        .unwrap();
    assert_eq!(hist.span(), Some((2010, 2013)));
    assert_relative_eq!(hist.get(2010).unwrap(), 3.0);
}

#[test]
fn test_model_average_of_five_models() {
    let (_dir, snapshot) = build(1);
    let annual = &snapshot.area.annual;
    let avg = annual
        .get(&SeriesKey::new(TREATMENT, SCENARIO, MODEL_AVG, "DeltaArea"))
        .unwrap();
    for year in 2014..=2025 {
        let expected = (0..5).map(|m| area_value(2, m, year)).sum::<f64>() / 5.0;
        assert_relative_eq!(avg.get(year).unwrap(), expected, epsilon = 1e-9);
    }
    // No average for history
    assert!(annual
        .get(&SeriesKey::new("cru_tx0", "historical", MODEL_AVG, "DeltaArea"))
        .is_none());
}

#[test]
fn test_decadal_equals_mean_of_annual() {
    let (_dir, snapshot) = build(1);
    for (key, decadal) in snapshot.area.decadal.iter() {
        let annual = snapshot.area.annual.get(key).unwrap();
        assert_eq!(decadal, &decadal_means(annual));
    }
    let key = SeriesKey::new(TREATMENT, SCENARIO, "CCSM4", "TokArea");
    let decadal = snapshot.area.decadal.get(&key).unwrap();
    // 2020..=2025 only
    let expected = (2020..=2025).map(|y| area_value(1, 0, y)).sum::<f64>() / 6.0;
    assert_relative_eq!(decadal.get(2020).unwrap(), expected);
}

#[test]
fn test_vegetation_medians() {
    let (_dir, snapshot) = build(1);
    let key = SeriesKey::new(TREATMENT, SCENARIO, "GISS-E2-R", "TokArea");
    // Medians: deciduous 101, black 11 + white 21
    assert_eq!(snapshot.veg.deciduous.get(&key).unwrap().get(2015), Some(101.0));
    assert_eq!(snapshot.veg.coniferous.get(&key).unwrap().get(2015), Some(32.0));
    let statewide = key.with_region("AllFMZs");
    assert_eq!(snapshot.veg.coniferous.get(&statewide).unwrap().get(2015), Some(66.0));
}

#[test]
fn test_costs_totals_and_skipped_option() {
    let (_dir, snapshot) = build(1);
    let costs = &snapshot.costs;

    let missing = SeriesKey::new(TREATMENT, SCENARIO, MODEL_WITHOUT_LIMITED, "L");
    assert!(costs.area.get(&missing).is_none());

    for model in ["CCSM4", "IPSL-CM5A-LR", MODEL_AVG] {
        let total = SeriesKey::new(TREATMENT, SCENARIO, model, TOTAL_OPTION);
        let total_cost = costs.cost.get(&total).unwrap();
        for (year, value) in total_cost.iter() {
            let parts: f64 = ["C", "F", "M", "L"]
                .iter()
                .filter_map(|o| costs.cost.get(&total.with_region(*o)))
                .filter_map(|s| s.get(year))
                .sum();
            assert_eq!(value, parts);
            assert_eq!(value.fract(), 0.0);
        }
    }

    // Model average cost is recomputed from averaged area
    let avg = SeriesKey::new(TREATMENT, SCENARIO, MODEL_AVG, "F");
    let area = costs.area.get(&avg).unwrap();
    let cost = costs.cost.get(&avg).unwrap();
    let factors = &jfsp_core::Catalog::alaska().cost_factors;
    let estimator = jfsp_core::CostEstimator::new(factors, &snapshot.year_map);
    assert_eq!(cost, &estimator.series_cost("F", area).unwrap());
}

#[test]
fn test_same_seed_is_bit_identical() {
    let (_a, first) = build(17);
    let (_b, second) = build(17);
    assert_eq!(first, second);

    let (_c, other) = build(18);
    assert_ne!(
        first.year_map.iter().collect::<Vec<_>>(),
        other.year_map.iter().collect::<Vec<_>>()
    );
}

#[test]
fn test_run_writes_exports() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let config = common::config(&dir.path().join("data"), &out);
    common::write_tree(&config);
    let (snapshot, written) = Preprocessor::new(config, RunOptions::default())
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(written.len(), 5);

    let loaded = Snapshot::load(out.join("snapshot.json")).unwrap();
    assert_eq!(loaded, snapshot);

    let map = fs::read_to_string(out.join("random_year_map.csv")).unwrap();
    assert_eq!(map.lines().count(), 1 + 16);
    let area = fs::read_to_string(out.join("total_area_burned.csv")).unwrap();
    assert!(area.starts_with("year,treatment,scenario,model,region,area\n"));
}

#[test]
fn test_skip_stages() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::config(&dir.path().join("data"), &dir.path().join("out"));
    common::write_tree(&config);
    let options = RunOptions {
        skip_veg: true,
        skip_costs: true,
    };
    let (snapshot, written) = Preprocessor::new(config, options).unwrap().run().unwrap();
    assert_eq!(snapshot.veg.row_count(), 0);
    assert_eq!(snapshot.costs.row_count(), 0);
    assert_eq!(written.len(), 3);
}

#[test]
fn test_missing_area_file_names_key() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::config(&dir.path().join("data"), &dir.path().join("out"));
    common::write_tree(&config);
    let key = SeriesKey::new(TREATMENT, SCENARIO, "MRI-CGCM3", "DeltaArea");
    let path = SourceLayout::new(&config).path(ZONE_PREFIX, Metric::TotalAreaBurned, &key, None);
    fs::remove_file(&path).unwrap();

    match Preprocessor::new(config, RunOptions::default()).unwrap().build() {
        Err(Error::MissingSource { key: missing, .. }) => assert_eq!(missing, key),
        other => panic!("expected MissingSource, got {other:?}"),
    }
}

#[test]
fn test_missing_both_spruce_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::config(&dir.path().join("data"), &dir.path().join("out"));
    common::write_tree(&config);
    let key = SeriesKey::new(TREATMENT, SCENARIO, "CCSM4", "TokArea");
    let layout = SourceLayout::new(&config);
    for forest in ["BlackSpruce", "WhiteSpruce"] {
        fs::remove_file(layout.path(ZONE_PREFIX, Metric::VegCounts, &key, Some(forest))).unwrap();
    }
    assert!(matches!(
        Preprocessor::new(config, RunOptions::default()).unwrap().build(),
        Err(Error::MissingConifer { .. })
    ));
}
