//! Shared setup of the `jfsp-preprocess` and `jfsp-query` binaries.

use std::path::Path;

use jfsp_core::{PipelineConfig, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Install the log subscriber.
///
/// `RUST_LOG` overrides the default `info` filter. Logs go to stderr so
/// stdout stays free for JSON output.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Configuration from an optional TOML file, defaults otherwise.
///
/// # Errors
/// Returns error if the file cannot be read or is invalid.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::load(path),
        None => Ok(PipelineConfig::default()),
    }
}
