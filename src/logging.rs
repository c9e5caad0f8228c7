//! File-backed logger. The terminal belongs to the UI, so log lines go to a file.

use anyhow::{Context, Result};
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::fs::OpenOptions;
use std::path::Path;

/// Append log lines to `path` at `level`; `RUST_LOG` refines the filter.
pub fn init(path: &Path, level: LevelFilter) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .target(Target::Pipe(Box::new(file)))
        .try_init()
        .context("logger already installed")?;
    log::info!("logging to {} at {level}", path.display());
    Ok(())
}
