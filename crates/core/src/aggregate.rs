//! Grouped aggregation over annual series
//!
//! Everything here is a pure function of its inputs:
//! - cross-replicate mean / median per year
//! - centered rolling mean / standard deviation
//! - decadal bucket means
//! - unweighted multi-model averages
//! - sums of sibling regions (statewide totals, cost option totals)
//!
//! Rolling windows are evaluated on the year index, not on positions, so a
//! gap in the years behaves like a boundary: any window touching a missing
//! or non-finite year is `NaN`.

use std::collections::BTreeMap;

use crate::catalog::{SpatialGroup, MODEL_AVG};
use crate::table::{AnnualSeries, SeriesKey, SeriesTable};

/// Arithmetic mean of replicate values, `NaN` when empty.
#[must_use]
pub fn replicate_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median of replicate values (mean of the two middle values for an even
/// count), `NaN` when empty.
#[must_use]
pub fn replicate_median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// First and last year of the centered window of size `window` for `year`.
///
/// Alignment matches a trailing window shifted forward by `(window - 1) / 2`,
/// so odd windows are symmetric and even windows lean one year back.
#[must_use]
pub fn centered_window(year: i32, window: usize) -> (i32, i32) {
    let window = window.max(1) as i32;
    let offset = (window - 1) / 2;
    let last = year + offset;
    (last - window + 1, last)
}

/// Values of the full window around `year`, or `None` when any year is
/// missing or non-finite.
fn window_values(series: &AnnualSeries, year: i32, window: usize) -> Option<Vec<f64>> {
    let (first, last) = centered_window(year, window);
    (first..=last)
        .map(|y| series.get(y).filter(|v| v.is_finite()))
        .collect()
}

/// Centered rolling mean over `window` years.
#[must_use]
pub fn rolling_mean(series: &AnnualSeries, window: usize) -> AnnualSeries {
    series
        .years()
        .map(|year| {
            let value = window_values(series, year, window)
                .map_or(f64::NAN, |values| replicate_mean(&values));
            (year, value)
        })
        .collect()
}

/// Centered rolling sample standard deviation (n - 1) over `window` years.
///
/// A window of one year has no spread estimate and is always `NaN`.
#[must_use]
pub fn rolling_std(series: &AnnualSeries, window: usize) -> AnnualSeries {
    series
        .years()
        .map(|year| {
            let value = match window_values(series, year, window) {
                Some(values) if values.len() > 1 => sample_std(&values),
                _ => f64::NAN,
            };
            (year, value)
        })
        .collect()
}

fn sample_std(values: &[f64]) -> f64 {
    let mean = replicate_mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Decade bucket of a year (`year // 10 * 10`, flooring negative years).
#[inline]
#[must_use]
pub fn decade_of(year: i32) -> i32 {
    year.div_euclid(10) * 10
}

/// Mean of each decade bucket, keyed by the decade's first year.
///
/// Partial decades average however many years they contain.
#[must_use]
pub fn decadal_means(series: &AnnualSeries) -> AnnualSeries {
    let mut buckets: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for (year, value) in series.iter() {
        buckets.entry(decade_of(year)).or_default().push(value);
    }
    buckets
        .into_iter()
        .map(|(decade, values)| (decade, replicate_mean(&values)))
        .collect()
}

/// Unweighted per-year mean across member series.
///
/// A year is averaged over the members that have it.
pub fn model_average<'a>(members: impl IntoIterator<Item = &'a AnnualSeries>) -> AnnualSeries {
    let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for series in members {
        for (year, value) in series.iter() {
            by_year.entry(year).or_default().push(value);
        }
    }
    by_year
        .into_iter()
        .map(|(year, values)| (year, replicate_mean(&values)))
        .collect()
}

/// Per-year sum across member series.
pub fn region_sum<'a>(members: impl IntoIterator<Item = &'a AnnualSeries>) -> AnnualSeries {
    let mut by_year: BTreeMap<i32, f64> = BTreeMap::new();
    for series in members {
        for (year, value) in series.iter() {
            *by_year.entry(year).or_insert(0.0) += value;
        }
    }
    by_year.into_iter().collect()
}

/// Model-average rows for every `(treatment, scenario, region)` that has at
/// least one of `models`.
///
/// Only the listed models contribute; existing average or historical rows
/// are ignored.
#[must_use]
pub fn model_averages(table: &SeriesTable, models: &[&str]) -> SeriesTable {
    let mut groups: BTreeMap<SeriesKey, Vec<&AnnualSeries>> = BTreeMap::new();
    for (key, series) in table.select(|k| models.contains(&k.model.as_str())) {
        groups.entry(key.with_model(MODEL_AVG)).or_default().push(series);
    }
    groups
        .into_iter()
        .map(|(key, members)| (key, model_average(members)))
        .collect()
}

/// Sum the `members` regions of every `(treatment, scenario, model)` into a
/// row with region `target`.
#[must_use]
pub fn sum_regions(table: &SeriesTable, members: &[&str], target: &str) -> SeriesTable {
    let mut groups: BTreeMap<SeriesKey, Vec<&AnnualSeries>> = BTreeMap::new();
    for (key, series) in table.select(|k| members.contains(&k.region.as_str())) {
        groups.entry(key.with_region(target)).or_default().push(series);
    }
    groups
        .into_iter()
        .map(|(key, members)| (key, region_sum(members)))
        .collect()
}

/// Statewide totals of one spatial group: the sum of its member regions for
/// each `(treatment, scenario, model)`.
#[must_use]
pub fn statewide_sums(table: &SeriesTable, group: &SpatialGroup) -> SeriesTable {
    let members: Vec<&str> = group.region_codes().collect();
    sum_regions(table, &members, &group.statewide)
}

/// Decadal means of every series in a table.
#[must_use]
pub fn decadal_table(table: &SeriesTable) -> SeriesTable {
    table
        .iter()
        .map(|(key, series)| (key.clone(), decadal_means(series)))
        .collect()
}
