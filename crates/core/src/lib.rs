//! JFSP wildfire dashboard core library
//!
//! Preprocesses ALFRESCO wildfire simulation outputs for Alaska into tidy
//! tables (total area burned, vegetation counts, suppression costs) sliced by
//! region, climate scenario, climate model and fire management treatment, and
//! serves read-only chart queries over the resulting snapshot.
//!
//! ## Pipeline
//!
//! - [`loader`] resolves and reads the per-key replicate CSV files
//! - [`aggregate`] reduces replicates and builds rolling, decadal,
//!   model-average and statewide series
//! - [`area`], [`veg`] and [`cost`] assemble the three tables
//! - [`snapshot`] persists them; [`query`] answers dashboard requests

// Lookup tables, configuration and errors
pub mod catalog;
pub mod config;
pub mod error;
pub mod units;

// Tables and aggregation
pub mod aggregate;
pub mod table;

// Source data and per-metric pipelines
pub mod area;
pub mod cost;
pub mod loader;
pub mod veg;

// Persistence, batch run and presentation
pub mod pipeline;
pub mod query;
pub mod snapshot;

pub use catalog::{Catalog, Entry, SpatialGroup, MODEL_AVG, TOTAL_OPTION};
pub use config::{PipelineConfig, YearRange};
pub use error::{Error, Result};
pub use table::{AnnualSeries, SeriesKey, SeriesTable};

pub use area::{compute_area, AreaTables};
pub use cost::{compute_costs, map_year, CostEstimator, CostFactors, CostTable, YearMap};
pub use veg::{compute_veg, VegTable};

pub use pipeline::{Preprocessor, RunOptions};
pub use query::{Dashboard, Interval, SeriesRequest, Trace};
pub use snapshot::Snapshot;
