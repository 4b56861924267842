use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use jfsp_core::{Preprocessor, Result, RunOptions};
use tracing::{error, info};

/// Preprocess ALFRESCO outputs into the dashboard snapshot
#[derive(Parser, Debug)]
#[command(name = "jfsp-preprocess")]
#[command(about = "Aggregate ALFRESCO CSV outputs into the JFSP dashboard snapshot", long_about = None)]
struct Args {
    /// Root of the ALFRESCO output tree
    #[arg(short, long)]
    data_dir: PathBuf,

    /// Output directory for snapshot.json and the CSV exports
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed of the cost year map
    #[arg(short, long)]
    seed: Option<u64>,

    /// Default rolling window in years
    #[arg(short, long)]
    rolling_window: Option<usize>,

    /// Skip vegetation counts
    #[arg(long)]
    skip_veg: bool,

    /// Skip cost estimates
    #[arg(long)]
    skip_costs: bool,
}

fn run(args: Args) -> Result<()> {
    let mut config = jfsp_cli::load_config(args.config.as_deref())?;
    config.data_dir = args.data_dir;
    if let Some(out) = args.out {
        config.out_dir = out;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(window) = args.rolling_window {
        config.rolling_window = window;
    }

    let options = RunOptions {
        skip_veg: args.skip_veg,
        skip_costs: args.skip_costs,
    };
    let (snapshot, written) = Preprocessor::new(config, options)?.run()?;
    info!(
        "Snapshot holds {} area, {} vegetation and {} cost rows",
        snapshot.area.annual.row_count(),
        snapshot.veg.row_count(),
        snapshot.costs.row_count()
    );
    for path in written {
        info!("  {}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    jfsp_cli::init_logging();
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Preprocessing failed: {e}");
            ExitCode::FAILURE
        }
    }
}
