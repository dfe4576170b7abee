// Command handlers module
pub mod config;
pub mod snapshot;
pub mod watch;

use anyhow::{Context, Result};
use clap::ArgMatches;

use crate::core::config::ImpactMonitorConfig;
use crate::core::impact_monitor::ImpactCategory;

// Re-exports for cleaner imports
pub use snapshot::execute as snapshot;
pub use watch::execute as watch;

/// Category selected with `--category`, overall impact by default
pub(crate) fn category_arg(matches: &ArgMatches) -> Result<ImpactCategory> {
    match matches.get_one::<String>("category") {
        Some(value) => value
            .parse::<ImpactCategory>()
            .map_err(|e| anyhow::anyhow!(e)),
        None => Ok(ImpactCategory::OverallImpact),
    }
}

/// Saved configuration with the command line overrides applied
pub(crate) fn config_with_overrides(matches: &ArgMatches) -> Result<ImpactMonitorConfig> {
    let mut config = ImpactMonitorConfig::load().context("Failed to load configuration")?;

    if let Some(&interval) = matches.get_one::<u64>("interval") {
        config.sample_interval_ms = interval;
    }
    if matches.get_flag("include-system") {
        config.track_system_processes = true;
    }

    Ok(config.sanitized())
}
