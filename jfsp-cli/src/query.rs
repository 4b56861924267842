use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use jfsp_core::{Dashboard, Interval, Result, SeriesRequest, TOTAL_OPTION};
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Metric {
    /// Total area burned in acres
    Area,
    /// Coniferous to deciduous ratio
    Veg,
    /// Rolling standard deviation of area burned
    Variability,
    /// Suppression cost
    Cost,
}

/// Query the dashboard snapshot and print chart traces as JSON
#[derive(Parser, Debug)]
#[command(name = "jfsp-query")]
#[command(about = "Emit JFSP dashboard chart traces as JSON", long_about = None)]
struct Args {
    /// Snapshot written by jfsp-preprocess
    #[arg(short, long)]
    snapshot: PathBuf,

    /// TOML configuration file supplying the catalog
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Region or statewide aggregate code
    #[arg(short, long)]
    region: String,

    /// Scenario codes
    #[arg(long = "scenario")]
    scenarios: Vec<String>,

    /// Model codes (5modelavg for the model average)
    #[arg(long = "model")]
    models: Vec<String>,

    /// Treatment codes
    #[arg(long = "treatment")]
    treatments: Vec<String>,

    /// Decadal instead of annual values
    #[arg(long)]
    decadal: bool,

    /// Append the historical series
    #[arg(long)]
    historical: bool,

    /// Rolling window in years (1-40)
    #[arg(short = 'w', long)]
    rolling_window: Option<usize>,

    /// Chart to produce
    #[arg(short, long, value_enum, default_value_t = Metric::Area)]
    metric: Metric,

    /// FMO option code for cost charts (C, F, M, L or total)
    #[arg(short, long, default_value = TOTAL_OPTION)]
    option: String,

    /// Pretty-print the JSON
    #[arg(long)]
    pretty: bool,
}

fn run(args: Args) -> Result<String> {
    let catalog = jfsp_cli::load_config(args.config.as_deref())?.catalog;
    let dashboard = Dashboard::load(&args.snapshot, catalog)?;
    let request = SeriesRequest {
        region: args.region,
        scenarios: args.scenarios,
        models: args.models,
        treatments: args.treatments,
        interval: if args.decadal {
            Interval::Decadal
        } else {
            Interval::Annual
        },
        rolling_window: args.rolling_window,
        show_historical: args.historical,
    };

    let traces = match args.metric {
        Metric::Area => dashboard.generate_series(&request)?,
        Metric::Veg => dashboard.veg_ratio_series(&request)?,
        Metric::Variability => dashboard.variability_series(&request)?,
        Metric::Cost => dashboard.cost_series(&request, &args.option)?,
    };
    let json = if args.pretty {
        serde_json::to_string_pretty(&traces)?
    } else {
        serde_json::to_string(&traces)?
    };
    Ok(json)
}

fn main() -> ExitCode {
    jfsp_cli::init_logging();
    match run(Args::parse()) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Query failed: {e}");
            ExitCode::FAILURE
        }
    }
}
