//! Impact scoring.
//!
//! Both scores are heuristics in `[0, 100]` computed only from a process's own
//! running averages. Every term is clamped before it is weighted.

use crate::core::config::ScoringConfig;

use super::types::ProcessImpact;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Inputs of the scoring formulas, in display units
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreInputs {
    pub avg_cpu_percent: f64,
    /// Average read + write rate in MB/s
    pub disk_mb_per_sec: f64,
    pub memory_gb: f64,
    pub network_mb_per_sec: f64,
    pub cpu_spike_count: u32,
}

impl ScoreInputs {
    pub fn from_impact(impact: &ProcessImpact) -> Self {
        Self {
            avg_cpu_percent: impact.avg_cpu_percent,
            disk_mb_per_sec: impact.avg_disk_rate() / BYTES_PER_MB,
            memory_gb: impact.current_memory_bytes as f64 / BYTES_PER_GB,
            network_mb_per_sec: impact.avg_network_rate() / BYTES_PER_MB,
            cpu_spike_count: impact.cpu_spike_count,
        }
    }

    /// Inputs from raw rates in bytes/sec and a working set in bytes
    pub fn from_rates(
        cpu_percent: f64,
        disk_bytes_per_sec: f64,
        memory_bytes: u64,
        network_bytes_per_sec: f64,
    ) -> Self {
        Self {
            avg_cpu_percent: cpu_percent,
            disk_mb_per_sec: disk_bytes_per_sec / BYTES_PER_MB,
            memory_gb: memory_bytes as f64 / BYTES_PER_GB,
            network_mb_per_sec: network_bytes_per_sec / BYTES_PER_MB,
            cpu_spike_count: 0,
        }
    }
}

fn term(value: f64, multiplier: f64) -> f64 {
    let scaled = value * multiplier;
    if scaled.is_nan() {
        0.0
    } else {
        scaled.clamp(0.0, 100.0)
    }
}

/// Weighted battery drain estimate.
///
/// CPU wakeups dominate, then disk, network radio and memory residency. Frequent
/// spikes add a flat bonus.
pub fn battery_impact_score(inputs: &ScoreInputs, config: &ScoringConfig) -> f64 {
    let cpu = term(inputs.avg_cpu_percent, config.battery_cpu_multiplier);
    let disk = term(inputs.disk_mb_per_sec, config.battery_disk_multiplier);
    let memory = term(inputs.memory_gb, config.battery_memory_multiplier);
    let network = term(inputs.network_mb_per_sec, config.battery_network_multiplier);

    let mut score = cpu * config.battery_cpu_weight
        + disk * config.battery_disk_weight
        + memory * config.battery_memory_weight
        + network * config.battery_network_weight;

    if inputs.cpu_spike_count > config.spike_bonus_min_count {
        score += config.spike_bonus;
    }

    score.clamp(0.0, 100.0)
}

/// Unweighted mean of the CPU, memory, disk and network terms
pub fn overall_impact_score(inputs: &ScoreInputs, config: &ScoringConfig) -> f64 {
    let cpu = term(inputs.avg_cpu_percent, 1.0);
    let memory = term(inputs.memory_gb, config.overall_memory_multiplier);
    let disk = term(inputs.disk_mb_per_sec, config.overall_disk_multiplier);
    let network = term(inputs.network_mb_per_sec, config.overall_network_multiplier);

    ((cpu + memory + disk + network) / 4.0).clamp(0.0, 100.0)
}

/// Recompute both scores of `impact` from its current averages
pub fn apply_scores(impact: &mut ProcessImpact, config: &ScoringConfig) {
    let inputs = ScoreInputs::from_impact(impact);
    impact.battery_impact_score = battery_impact_score(&inputs, config);
    impact.overall_impact_score = overall_impact_score(&inputs, config);
}
