use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;

use crate::core::config::ImpactMonitorConfig;

/// Show the active configuration or where it lives
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let path = ImpactMonitorConfig::get_config_path()?;

    if matches.get_flag("path") {
        println!("{}", path.display());
        return Ok(());
    }

    if matches.get_flag("init") {
        if path.exists() {
            println!(
                "{} {}",
                "Config already exists at".yellow(),
                path.display()
            );
            return Ok(());
        }
        ImpactMonitorConfig::default()
            .save_to(&path)
            .context("Failed to write default configuration")?;
        println!("{} {}", "Wrote default config to".green(), path.display());
        return Ok(());
    }

    let config = ImpactMonitorConfig::load().context("Failed to load configuration")?;
    println!("{} {}", "Config file:".bold(), path.display().to_string().dimmed());
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
