//! Tidy, flat tables keyed by `(treatment, scenario, model, region, year)`
//!
//! Each table maps a [`SeriesKey`] to a year-indexed series. Iterating a
//! table yields one flat row per `(key, year)`, which is the shape written to
//! the snapshot and the CSV exports.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Key columns shared by every tidy table.
///
/// Historical rows use the historical treatment, the `historical` scenario
/// and an empty model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey {
    /// Fire management treatment (`gcm_tx0`, `cru_tx0`, ...)
    pub treatment: String,
    /// Climate scenario (`rcp45`, ..., `historical`)
    pub scenario: String,
    /// Climate model, `5modelavg`, or empty for historical
    pub model: String,
    /// Region, statewide aggregate, or FMO option code for cost tables
    pub region: String,
}

impl SeriesKey {
    /// Create a key from its four columns.
    pub fn new(
        treatment: impl Into<String>,
        scenario: impl Into<String>,
        model: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            treatment: treatment.into(),
            scenario: scenario.into(),
            model: model.into(),
            region: region.into(),
        }
    }

    /// Same key with a different model.
    #[must_use]
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }

    /// Same key with a different region.
    #[must_use]
    pub fn with_region(&self, region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            ..self.clone()
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(region={}, treatment={}, scenario={}, model={})",
            self.region,
            self.treatment,
            if self.scenario.is_empty() { "-" } else { self.scenario.as_str() },
            if self.model.is_empty() { "-" } else { self.model.as_str() },
        )
    }
}

/// Year-indexed series of values with a strictly increasing year index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnnualSeries(BTreeMap<i32, f64>);

impl AnnualSeries {
    /// Empty series.
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Set the value for a year, replacing any previous value.
    pub fn insert(&mut self, year: i32, value: f64) {
        self.0.insert(year, value);
    }

    /// Value for a year, if present.
    #[must_use]
    pub fn get(&self, year: i32) -> Option<f64> {
        self.0.get(&year).copied()
    }

    /// Number of years.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the series has no years.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `(year, value)` pairs in year order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.0.iter().map(|(&y, &v)| (y, v))
    }

    /// Years in order.
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.0.keys().copied()
    }

    /// Values in year order.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.values().copied()
    }

    /// First and last year, if any.
    #[must_use]
    pub fn span(&self) -> Option<(i32, i32)> {
        let first = self.0.keys().next()?;
        let last = self.0.keys().next_back()?;
        Some((*first, *last))
    }

    /// Apply `f` to every value, keeping the year index.
    #[must_use]
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        self.iter().map(|(y, v)| (y, f(v))).collect()
    }

    /// Split into parallel year and value vectors.
    #[must_use]
    pub fn to_columns(&self) -> (Vec<i32>, Vec<f64>) {
        self.iter().unzip()
    }
}

impl FromIterator<(i32, f64)> for AnnualSeries {
    fn from_iter<I: IntoIterator<Item = (i32, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Flat row view of a [`SeriesTable`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Row<'a> {
    /// Year index
    pub year: i32,
    /// Key columns
    pub key: &'a SeriesKey,
    /// Value column
    pub value: f64,
}

/// Tidy table with one value column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeriesTable {
    series: BTreeMap<SeriesKey, AnnualSeries>,
}

impl SeriesTable {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) the series for a key.
    pub fn insert(&mut self, key: SeriesKey, series: AnnualSeries) {
        self.series.insert(key, series);
    }

    /// Series for a key.
    #[must_use]
    pub fn get(&self, key: &SeriesKey) -> Option<&AnnualSeries> {
        self.series.get(key)
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.series.len()
    }

    /// Total number of flat rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.series.values().map(AnnualSeries::len).sum()
    }

    /// Keys with their series, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&SeriesKey, &AnnualSeries)> {
        self.series.iter()
    }

    /// Flat rows ordered by key then year.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.series.iter().flat_map(|(key, series)| {
            series.iter().map(move |(year, value)| Row { year, key, value })
        })
    }

    /// Series whose key satisfies `predicate`.
    pub fn select<'a>(
        &'a self,
        predicate: impl Fn(&SeriesKey) -> bool + 'a,
    ) -> impl Iterator<Item = (&'a SeriesKey, &'a AnnualSeries)> + 'a {
        self.series.iter().filter(move |(key, _)| predicate(key))
    }

    /// Move every series of `other` into this table.
    pub fn extend(&mut self, other: SeriesTable) {
        self.series.extend(other.series);
    }
}

impl FromIterator<(SeriesKey, AnnualSeries)> for SeriesTable {
    fn from_iter<I: IntoIterator<Item = (SeriesKey, AnnualSeries)>>(iter: I) -> Self {
        Self {
            series: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for SeriesTable {
    type Item = (SeriesKey, AnnualSeries);
    type IntoIter = std::collections::btree_map::IntoIter<SeriesKey, AnnualSeries>;

    fn into_iter(self) -> Self::IntoIter {
        self.series.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(region: &str) -> SeriesKey {
        SeriesKey::new("gcm_tx0", "rcp60", "CCSM4", region)
    }

    #[test]
    fn test_series_is_year_ordered() {
        let series: AnnualSeries = [(2016, 3.0), (2014, 1.0), (2015, 2.0)].into_iter().collect();
        assert_eq!(series.years().collect::<Vec<_>>(), vec![2014, 2015, 2016]);
        assert_eq!(series.span(), Some((2014, 2016)));
        assert_eq!(series.get(2015), Some(2.0));
        assert_eq!(series.get(2017), None);
    }

    #[test]
    fn test_rows_flatten_key_then_year() {
        let mut table = SeriesTable::new();
        table.insert(key("TokArea"), [(2014, 1.0), (2015, 2.0)].into_iter().collect());
        table.insert(key("DeltaArea"), [(2014, 5.0)].into_iter().collect());

        let rows: Vec<_> = table.rows().map(|r| (r.key.region.as_str(), r.year, r.value)).collect();
        assert_eq!(
            rows,
            vec![("DeltaArea", 2014, 5.0), ("TokArea", 2014, 1.0), ("TokArea", 2015, 2.0)]
        );
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.key_count(), 2);
    }

    #[test]
    fn test_select_filters_by_key() {
        let mut table = SeriesTable::new();
        table.insert(key("TokArea"), AnnualSeries::new());
        table.insert(key("TokArea").with_model("GFDL-CM3"), AnnualSeries::new());

        let models: Vec<_> = table
            .select(|k| k.model == "GFDL-CM3")
            .map(|(k, _)| k.model.clone())
            .collect();
        assert_eq!(models, vec!["GFDL-CM3".to_string()]);
    }

    #[test]
    fn test_key_display_marks_empty_columns() {
        let k = SeriesKey::new("cru_tx0", "historical", "", "TokArea");
        assert_eq!(
            k.to_string(),
            "(region=TokArea, treatment=cru_tx0, scenario=historical, model=-)"
        );
    }
}
