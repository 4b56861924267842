//! Dashboard queries over a snapshot loaded from disk
mod common;

use jfsp_core::units::SquareKilometers;
use jfsp_core::{Dashboard, Error, Interval, Preprocessor, RunOptions, SeriesRequest, MODEL_AVG};

use common::{area_value, SCENARIO, TREATMENT};

fn dashboard() -> (tempfile::TempDir, Dashboard) {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let config = common::config(&dir.path().join("data"), &out);
    let catalog = config.catalog.clone();
    common::write_tree(&config);
    Preprocessor::new(config, RunOptions::default())
        .unwrap()
        .run()
        .unwrap();
    let dashboard = Dashboard::load(out.join("snapshot.json"), catalog).unwrap();
    (dir, dashboard)
}

fn request(models: &[&str]) -> SeriesRequest {
    SeriesRequest {
        scenarios: vec![SCENARIO.to_string()],
        models: models.iter().map(|m| (*m).to_string()).collect(),
        treatments: vec![TREATMENT.to_string()],
        ..SeriesRequest::for_region("TokArea")
    }
}

#[test]
fn test_area_traces_in_acres() {
    let (_dir, dash) = dashboard();
    assert_eq!(dash.default_rolling_window(), 3);

    let traces = dash.generate_series(&request(&["CCSM4", MODEL_AVG])).unwrap();
    // Bar and rolling trace per model
    assert_eq!(traces.len(), 4);
    assert_eq!(traces[0].label, "No change (TX0), RCP 8.5, CCSM4");
    assert_eq!(traces[1].label, "3yr rolling No change (TX0), RCP 8.5, CCSM4");
    assert_eq!(traces[2].label, "No change (TX0), RCP 8.5, 5-Model Average");

    let expected = *SquareKilometers::new(area_value(1, 0, 2014)).to_acres();
    assert_eq!(traces[0].x[0], 2014);
    assert_eq!(traces[0].y[0], expected);
    assert!(traces[1].y[0].is_nan());
    assert!(traces[1].y[1].is_finite());
}

#[test]
fn test_historical_traces_come_last() {
    let (_dir, dash) = dashboard();
    let request = SeriesRequest {
        show_historical: true,
        ..request(&["GFDL-CM3"])
    };
    let traces = dash.generate_series(&request).unwrap();
    assert_eq!(traces.len(), 4);
    assert_eq!(traces[2].label, "Historical");
    assert_eq!(traces[2].x, vec![2010, 2011, 2012, 2013]);

    let decadal = SeriesRequest {
        interval: Interval::Decadal,
        ..request
    };
    let traces = dash.generate_series(&decadal).unwrap();
    assert_eq!(traces.len(), 2);
    assert_eq!(traces[0].x, vec![2010, 2020]);
    assert_eq!(traces[1].x, vec![2010]);
}

#[test]
fn test_statewide_variability() {
    let (_dir, dash) = dashboard();
    let request = SeriesRequest {
        region: "AllFMZs".to_string(),
        ..request(&[MODEL_AVG])
    };
    let traces = dash.variability_series(&request).unwrap();
    assert_eq!(traces.len(), 1);
    // Windows touching 2014 or 2025 are undefined
    let finite: Vec<f64> = traces[0].y.iter().copied().filter(|v| v.is_finite()).collect();
    assert_eq!(finite.len(), 10);
}

#[test]
fn test_veg_ratio_and_costs() {
    let (_dir, dash) = dashboard();
    let traces = dash.veg_ratio_series(&request(&["IPSL-CM5A-LR"])).unwrap();
    assert_eq!(traces[0].y[0], 32.0 / 101.0);

    let costs = dash.cost_series(&request(&["MRI-CGCM3"]), "M").unwrap();
    assert_eq!(costs.len(), 1);
    assert!(costs[0].label.ends_with(", Modified"));
    assert!(costs[0].y.iter().all(|c| c.fract() == 0.0));

    assert!(matches!(
        dash.cost_series(&request(&["MRI-CGCM3"]), "X"),
        Err(Error::UnknownCostOption(_))
    ));
}

#[test]
fn test_unknown_region_not_found() {
    let (_dir, dash) = dashboard();
    let request = SeriesRequest {
        region: "Atlantis".to_string(),
        ..request(&["CCSM4"])
    };
    assert!(matches!(
        dash.generate_series(&request),
        Err(Error::SeriesNotFound { .. })
    ));
    assert_eq!(dash.catalog().region_label("TokArea"), "TokArea");
}
