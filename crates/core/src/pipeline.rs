//! Preprocessing run: CSV tree to snapshot
//!
//! Stages run in a fixed order (year map, area, vegetation, costs) and each
//! one logs its row counts. Any stage error aborts the run before anything
//! is written.

use std::path::PathBuf;
use std::time::Instant;

use tracing::info;

use crate::area::compute_area;
use crate::config::PipelineConfig;
use crate::cost::{compute_costs, CostTable, YearMap};
use crate::error::Result;
use crate::snapshot::Snapshot;
use crate::veg::{compute_veg, VegTable};

/// Stages that can be left out of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOptions {
    /// Skip vegetation counts
    pub skip_veg: bool,
    /// Skip cost estimates
    pub skip_costs: bool,
}

/// Batch preprocessor over one configuration.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    config: PipelineConfig,
    options: RunOptions,
}

impl Preprocessor {
    /// Validate `config` and prepare a run.
    ///
    /// # Errors
    /// Returns a configuration error when validation fails.
    pub fn new(config: PipelineConfig, options: RunOptions) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, options })
    }

    /// Read and aggregate every table.
    ///
    /// # Errors
    /// Returns the first stage error.
    pub fn build(&self) -> Result<Snapshot> {
        let config = &self.config;
        let started = Instant::now();
        info!(
            "Preprocessing {} (seed {}, rolling window {})",
            config.data_dir.display(),
            config.seed,
            config.rolling_window
        );

        let year_map = YearMap::generate(config.seed, config.cost_years);
        info!(
            "Mapped {} years onto historical cost years (seed {})",
            year_map.len(),
            year_map.seed()
        );

        let area = compute_area(config)?;

        let veg = if self.options.skip_veg {
            info!("Skipping vegetation counts");
            VegTable::default()
        } else {
            compute_veg(config)?
        };

        let costs = if self.options.skip_costs {
            info!("Skipping cost estimates");
            CostTable::default()
        } else {
            compute_costs(config, &year_map)?
        };

        info!("Preprocessing finished in {:.2?}", started.elapsed());
        Ok(Snapshot {
            seed: config.seed,
            rolling_window: config.rolling_window,
            area,
            veg,
            costs,
            year_map,
        })
    }

    /// Build the snapshot and write it with the CSV exports to `out_dir`.
    ///
    /// # Errors
    /// Returns the first stage or write error.
    pub fn run(&self) -> Result<(Snapshot, Vec<PathBuf>)> {
        let snapshot = self.build()?;
        let written = snapshot.write_all(&self.config.out_dir)?;
        Ok((snapshot, written))
    }
}
