//! Live impact table, refreshed every sampling interval until Ctrl+C.

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::*;
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;

use super::{category_arg, config_with_overrides};
use crate::core::impact_monitor::{ImpactEvent, ImpactMonitor};
use crate::platform::SysinfoCounterSource;
use crate::ui::{clear_screen, print_impact_table};

const POLL_STEP: Duration = Duration::from_millis(100);
const ALERTS_SHOWN: usize = 5;

/// Most recent high-impact alerts, oldest dropped first
struct AlertLog {
    entries: VecDeque<String>,
}

impl AlertLog {
    fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(ALERTS_SHOWN),
        }
    }

    fn push(&mut self, alert: String) {
        if self.entries.len() == ALERTS_SHOWN {
            self.entries.pop_front();
        }
        self.entries.push_back(alert);
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn newest_first(&self) -> impl Iterator<Item = &String> {
        self.entries.iter().rev()
    }
}

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let category = category_arg(matches)?;
    let top = matches.get_one::<usize>("top").copied().unwrap_or(15);
    let include_system = matches.get_flag("include-system");
    let config = config_with_overrides(matches)?;
    let interval = config.sample_interval();

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::Relaxed);
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    let monitor = ImpactMonitor::with_config(SysinfoCounterSource::new(), config);
    let mut events = monitor.subscribe();
    monitor
        .start(None)
        .context("Failed to start the impact monitor")?;

    println!("{}", "Collecting first samples...".cyan().bold());
    println!("{}", "Press Ctrl+C to stop".dimmed());

    let mut alerts = AlertLog::new();

    while running.load(Ordering::Relaxed) {
        let mut updated = false;
        loop {
            match events.try_recv() {
                Ok(ImpactEvent::DataUpdated) => updated = true,
                Ok(ImpactEvent::HighImpactDetected {
                    pid,
                    name,
                    category,
                    score,
                }) => {
                    alerts.push(format!(
                        "{} ({}) crossed {} at {:.1}",
                        name, pid, category, score
                    ));
                }
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    log::warn!("Display fell behind, {} events dropped", skipped);
                    updated = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        if updated {
            clear_screen(&mut io::stdout()).context("Failed to clear the terminal")?;
            let processes = monitor.top_processes(category, top, include_system);
            print_impact_table(&processes, category, monitor.window_coverage());

            if !alerts.is_empty() {
                println!();
                for alert in alerts.newest_first() {
                    println!("{} {}", "HIGH IMPACT".red().bold(), alert);
                }
            }
            println!(
                "\n{}",
                format!(
                    "{} tracked, pass #{}, every {} ms. Ctrl+C to stop",
                    monitor.tracked_count(),
                    monitor.total_passes(),
                    interval.as_millis()
                )
                .dimmed()
            );
        }

        std::thread::sleep(POLL_STEP);
    }

    monitor.stop();
    println!("\n{}", "Monitoring stopped".yellow());
    Ok(())
}
