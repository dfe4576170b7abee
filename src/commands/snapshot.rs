//! Sample for a fixed duration, then print the ranking once.

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::*;
use std::time::Duration;

use super::{category_arg, config_with_overrides};
use crate::core::impact_monitor::ImpactMonitor;
use crate::platform::SysinfoCounterSource;
use crate::ui::print_impact_table;

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let category = category_arg(matches)?;
    let top = matches.get_one::<usize>("top").copied().unwrap_or(15);
    let duration = matches.get_one::<u64>("duration").copied().unwrap_or(10);
    let json_output = matches.get_flag("json");
    let include_system = matches.get_flag("include-system");
    let config = config_with_overrides(matches)?;

    let monitor = ImpactMonitor::with_config(SysinfoCounterSource::new(), config);

    // Baseline pass so the first timed pass already yields rates
    monitor.refresh();
    if !json_output {
        println!(
            "{}",
            format!("Sampling for {} seconds...", duration).cyan().bold()
        );
    }

    monitor
        .start(None)
        .context("Failed to start the impact monitor")?;
    std::thread::sleep(Duration::from_secs(duration.max(1)));
    monitor.stop();

    let processes = monitor.top_processes(category, top, include_system);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&processes)?);
        return Ok(());
    }

    print_impact_table(&processes, category, monitor.window_coverage());
    println!(
        "\n{}",
        format!(
            "{} passes over {} processes",
            monitor.total_passes(),
            monitor.tracked_count()
        )
        .dimmed()
    );
    if !monitor.has_battery() {
        println!(
            "{}",
            "No battery detected; battery scores are estimates".dimmed()
        );
    }

    Ok(())
}
