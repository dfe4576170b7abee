use colored::*;

use super::formatters::{format_bytes, format_rate, format_score};
use crate::core::impact_monitor::{ImpactCategory, ProcessImpact};

const NAME_WIDTH: usize = 24;

/// Print a ranked table of process impacts
pub fn print_impact_table(processes: &[ProcessImpact], category: ImpactCategory, coverage: f64) {
    println!(
        "\n{} {}",
        "PROCESS IMPACT".bold().bright_cyan(),
        format!("(by {}, window {:.0}% covered)", category, coverage * 100.0).dimmed()
    );
    println!("{}", "=".repeat(104));
    println!(
        "{:>7}  {:<width$} {:>7} {:>7} {:>10} {:>11} {:>11} {:>11} {:>7} {:>7}",
        "PID".bold(),
        "NAME".bold(),
        "CPU%".bold(),
        "PEAK%".bold(),
        "MEMORY".bold(),
        "READ".bold(),
        "WRITE".bold(),
        "NET".bold(),
        "BATT".bold(),
        "SCORE".bold(),
        width = NAME_WIDTH
    );
    println!("{}", "-".repeat(104));

    if processes.is_empty() {
        println!("{}", "  No processes sampled yet".dimmed());
        return;
    }

    for process in processes {
        let name = truncate_name(&process.name);
        let name = if process.is_system_process {
            name.dimmed()
        } else {
            name.normal()
        };

        println!(
            "{:>7}  {:<width$} {:>7.1} {:>7.1} {:>10} {:>11} {:>11} {:>11} {:>7} {:>7}",
            process.pid,
            name,
            process.avg_cpu_percent,
            process.peak_cpu_percent,
            format_bytes(process.current_memory_bytes),
            format_rate(Some(process.avg_disk_read_rate)),
            format_rate(Some(process.avg_disk_write_rate)),
            format_rate(process.network.as_ref().map(|n| n.avg_rate)),
            format_score(process.battery_impact_score),
            format_score(process.overall_impact_score),
            width = NAME_WIDTH
        );
    }
}

fn truncate_name(name: &str) -> String {
    if name.chars().count() <= NAME_WIDTH {
        return name.to_string();
    }
    let mut truncated: String = name.chars().take(NAME_WIDTH - 3).collect();
    truncated.push_str("...");
    truncated
}
