//! Columnar snapshot of every preprocessed table
//!
//! The snapshot is one JSON document holding each tidy table as a set of
//! equally long column vectors, plus the seed and default rolling window the
//! run used. It is written once by the preprocessor and loaded read-only by
//! the dashboard; loading rebuilds the keyed tables without recomputing any
//! aggregate.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::area::{write_area_csv, AreaTables};
use crate::cost::{write_costs_csv, CostTable, YearMap};
use crate::error::{Error, Result};
use crate::table::{AnnualSeries, SeriesKey, SeriesTable};
use crate::veg::{write_veg_csv, VegTable};

/// Format version written to and required from snapshot files.
pub const SNAPSHOT_VERSION: u32 = 1;

/// File name of the snapshot inside the output directory.
pub const SNAPSHOT_FILE: &str = "snapshot.json";

/// Preprocessed tables in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Seed of the cost year map
    pub seed: u64,
    /// Rolling window offered by default
    pub rolling_window: usize,
    /// Annual and decadal total area burned
    pub area: AreaTables,
    /// Vegetation counts (empty when skipped)
    pub veg: VegTable,
    /// Area and cost per FMO option (empty when skipped)
    pub costs: CostTable,
    /// Year to historical cost year mapping
    pub year_map: YearMap,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct KeyColumns {
    year: Vec<i32>,
    treatment: Vec<String>,
    scenario: Vec<String>,
    model: Vec<String>,
    region: Vec<String>,
}

impl KeyColumns {
    fn push(&mut self, year: i32, key: &SeriesKey) {
        self.year.push(year);
        self.treatment.push(key.treatment.clone());
        self.scenario.push(key.scenario.clone());
        self.model.push(key.model.clone());
        self.region.push(key.region.clone());
    }

    fn len(&self) -> usize {
        self.year.len()
    }

    fn check(&self, table: &'static str) -> Result<()> {
        let expected = self.len();
        check_len(table, "treatment", self.treatment.len(), expected)?;
        check_len(table, "scenario", self.scenario.len(), expected)?;
        check_len(table, "model", self.model.len(), expected)?;
        check_len(table, "region", self.region.len(), expected)
    }

    fn key(&self, row: usize) -> SeriesKey {
        SeriesKey::new(
            &self.treatment[row],
            &self.scenario[row],
            &self.model[row],
            &self.region[row],
        )
    }
}

fn check_len(table: &'static str, column: &'static str, found: usize, expected: usize) -> Result<()> {
    if found == expected {
        Ok(())
    } else {
        Err(Error::RaggedColumns {
            table,
            column,
            found,
            expected,
        })
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ValueColumns {
    #[serde(flatten)]
    keys: KeyColumns,
    value: Vec<f64>,
}

impl ValueColumns {
    fn from_table(table: &SeriesTable) -> Self {
        let mut columns = Self::default();
        for row in table.rows() {
            columns.keys.push(row.year, row.key);
            columns.value.push(row.value);
        }
        columns
    }

    fn into_table(self, name: &'static str) -> Result<SeriesTable> {
        self.keys.check(name)?;
        check_len(name, "value", self.value.len(), self.keys.len())?;
        let mut table: BTreeMap<SeriesKey, AnnualSeries> = BTreeMap::new();
        for (row, value) in self.value.into_iter().enumerate() {
            table
                .entry(self.keys.key(row))
                .or_default()
                .insert(self.keys.year[row], value);
        }
        Ok(table.into_iter().collect())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct VegColumns {
    #[serde(flatten)]
    keys: KeyColumns,
    deciduous: Vec<Option<f64>>,
    coniferous: Vec<Option<f64>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CostColumns {
    year: Vec<i32>,
    treatment: Vec<String>,
    scenario: Vec<String>,
    model: Vec<String>,
    option: Vec<String>,
    area: Vec<f64>,
    cost: Vec<f64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct YearMapColumns {
    year: Vec<i32>,
    mapped_year: Vec<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    version: u32,
    seed: u64,
    rolling_window: usize,
    total_area_burned: ValueColumns,
    decadal_area: ValueColumns,
    veg_counts: VegColumns,
    costs: CostColumns,
    year_map: YearMapColumns,
}

impl Snapshot {
    /// Write the snapshot as JSON.
    ///
    /// # Errors
    /// Returns error if the file cannot be created or serialization fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(fs::File::create(path)?);
        serde_json::to_writer(&mut writer, &self.to_document())?;
        writer.flush()?;
        info!("Wrote snapshot {}", path.display());
        Ok(())
    }

    /// Load a snapshot written by [`Snapshot::save`].
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed, has another format
    /// version, or holds ragged columns.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(fs::File::open(path)?);
        let document: Document = serde_json::from_reader(reader)?;
        let snapshot = Self::from_document(document)?;
        info!(
            "Loaded snapshot {} ({} area rows, {} cost rows)",
            path.display(),
            snapshot.area.annual.row_count(),
            snapshot.costs.row_count()
        );
        Ok(snapshot)
    }

    /// Write the snapshot and the CSV exports into `out_dir`.
    ///
    /// Empty vegetation or cost tables are not exported.
    ///
    /// # Errors
    /// Returns error if any file cannot be written.
    pub fn write_all<P: AsRef<Path>>(&self, out_dir: P) -> Result<Vec<PathBuf>> {
        let out_dir = out_dir.as_ref();
        fs::create_dir_all(out_dir)?;
        let mut written = Vec::new();

        let path = out_dir.join(SNAPSHOT_FILE);
        self.save(&path)?;
        written.push(path);

        let path = out_dir.join("total_area_burned.csv");
        write_area_csv(&self.area.annual, &path)?;
        written.push(path);

        if self.veg.row_count() > 0 {
            let path = out_dir.join("veg_counts.csv");
            write_veg_csv(&self.veg, &path)?;
            written.push(path);
        }

        if self.costs.row_count() > 0 {
            let path = out_dir.join("costs.csv");
            write_costs_csv(&self.costs, &path)?;
            written.push(path);
        }

        let path = out_dir.join("random_year_map.csv");
        self.year_map.write_csv(&path)?;
        written.push(path);

        info!("Wrote {} files to {}", written.len(), out_dir.display());
        Ok(written)
    }

    fn to_document(&self) -> Document {
        let mut veg_counts = VegColumns::default();
        for r in self.veg.records() {
            veg_counts.keys.push(r.year, r.key);
            veg_counts.deciduous.push(r.deciduous);
            veg_counts.coniferous.push(r.coniferous);
        }

        let mut costs = CostColumns::default();
        for r in self.costs.records() {
            costs.year.push(r.year);
            costs.treatment.push(r.treatment.to_string());
            costs.scenario.push(r.scenario.to_string());
            costs.model.push(r.model.to_string());
            costs.option.push(r.option.to_string());
            costs.area.push(r.area);
            costs.cost.push(r.cost);
        }

        let (year, mapped_year): (Vec<i32>, Vec<i32>) = self.year_map.iter().unzip();

        Document {
            version: SNAPSHOT_VERSION,
            seed: self.seed,
            rolling_window: self.rolling_window,
            total_area_burned: ValueColumns::from_table(&self.area.annual),
            decadal_area: ValueColumns::from_table(&self.area.decadal),
            veg_counts,
            costs,
            year_map: YearMapColumns { year, mapped_year },
        }
    }

    fn from_document(document: Document) -> Result<Self> {
        if document.version != SNAPSHOT_VERSION {
            return Err(Error::SnapshotVersion {
                found: document.version,
                expected: SNAPSHOT_VERSION,
            });
        }

        let area = AreaTables {
            annual: document.total_area_burned.into_table("total_area_burned")?,
            decadal: document.decadal_area.into_table("decadal_area")?,
        };
        let veg = veg_from_columns(&document.veg_counts)?;
        let costs = costs_from_columns(document.costs)?;

        let map = document.year_map;
        check_len("year_map", "mapped_year", map.mapped_year.len(), map.year.len())?;
        let year_map = YearMap::from_pairs(document.seed, map.year.into_iter().zip(map.mapped_year));

        Ok(Self {
            seed: document.seed,
            rolling_window: document.rolling_window,
            area,
            veg,
            costs,
            year_map,
        })
    }
}

fn veg_from_columns(columns: &VegColumns) -> Result<VegTable> {
    const TABLE: &str = "veg_counts";
    columns.keys.check(TABLE)?;
    let rows = columns.keys.len();
    check_len(TABLE, "deciduous", columns.deciduous.len(), rows)?;
    check_len(TABLE, "coniferous", columns.coniferous.len(), rows)?;

    let mut deciduous = ValueColumns::default();
    let mut coniferous = ValueColumns::default();
    for row in 0..rows {
        let key = columns.keys.key(row);
        let year = columns.keys.year[row];
        for (value, target) in [
            (columns.deciduous[row], &mut deciduous),
            (columns.coniferous[row], &mut coniferous),
        ] {
            if let Some(v) = value {
                target.keys.push(year, &key);
                target.value.push(v);
            }
        }
    }
    Ok(VegTable {
        deciduous: deciduous.into_table(TABLE)?,
        coniferous: coniferous.into_table(TABLE)?,
    })
}

fn costs_from_columns(columns: CostColumns) -> Result<CostTable> {
    const TABLE: &str = "costs";
    let rows = columns.year.len();
    check_len(TABLE, "treatment", columns.treatment.len(), rows)?;
    check_len(TABLE, "scenario", columns.scenario.len(), rows)?;
    check_len(TABLE, "model", columns.model.len(), rows)?;
    check_len(TABLE, "option", columns.option.len(), rows)?;
    check_len(TABLE, "area", columns.area.len(), rows)?;
    check_len(TABLE, "cost", columns.cost.len(), rows)?;

    let mut area = ValueColumns::default();
    let mut cost = ValueColumns::default();
    for row in 0..rows {
        let key = SeriesKey::new(
            &columns.treatment[row],
            &columns.scenario[row],
            &columns.model[row],
            &columns.option[row],
        );
        area.keys.push(columns.year[row], &key);
        area.value.push(columns.area[row]);
        cost.keys.push(columns.year[row], &key);
        cost.value.push(columns.cost[row]);
    }
    Ok(CostTable {
        area: area.into_table(TABLE)?,
        cost: cost.into_table(TABLE)?,
    })
}
