use colored::*;
use humansize::{format_size, DECIMAL};

/// Format a byte count in human-readable form (kB, MB, GB)
pub fn format_bytes(bytes: u64) -> String {
    format_size(bytes, DECIMAL)
}

/// Format a bytes-per-second rate, `-` when the metric is unavailable
pub fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(rate) if rate.is_finite() && rate > 0.0 => {
            format!("{}/s", format_size(rate.round() as u64, DECIMAL))
        }
        Some(_) => "0 B/s".to_string(),
        None => "-".to_string(),
    }
}

/// Format a 0-100 score colored by severity
pub fn format_score(score: f64) -> ColoredString {
    let text = format!("{:>5.1}", score);
    if score >= 75.0 {
        text.red().bold()
    } else if score >= 40.0 {
        text.yellow()
    } else {
        text.green()
    }
}
