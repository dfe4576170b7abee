use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MIN_SAMPLE_INTERVAL_MS: u64 = 100;
pub const MIN_HISTORY_WINDOW_MINUTES: u32 = 1;

/// Weights and normalisation constants for the impact scores.
///
/// Every term is clamped to `[0, 100]` before it is weighted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub battery_cpu_multiplier: f64,
    pub battery_cpu_weight: f64,
    pub battery_disk_multiplier: f64, // per MB/s
    pub battery_disk_weight: f64,
    pub battery_memory_multiplier: f64, // per GB
    pub battery_memory_weight: f64,
    pub battery_network_multiplier: f64, // per MB/s
    pub battery_network_weight: f64,
    /// Spike count above which the bonus applies (strictly greater)
    pub spike_bonus_min_count: u32,
    pub spike_bonus: f64,

    pub overall_memory_multiplier: f64, // per GB
    pub overall_disk_multiplier: f64,   // per MB/s
    pub overall_network_multiplier: f64, // per MB/s
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            battery_cpu_multiplier: 2.0,
            battery_cpu_weight: 0.40,
            battery_disk_multiplier: 10.0,
            battery_disk_weight: 0.25,
            battery_memory_multiplier: 20.0,
            battery_memory_weight: 0.15,
            battery_network_multiplier: 100.0,
            battery_network_weight: 0.20,
            spike_bonus_min_count: 10,
            spike_bonus: 10.0,
            overall_memory_multiplier: 25.0,
            overall_disk_multiplier: 2.0,
            overall_network_multiplier: 10.0,
        }
    }
}

/// Configuration for the impact monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactMonitorConfig {
    pub sample_interval_ms: u64,
    pub history_window_minutes: u32,
    /// Soft cap on tracked entities
    pub max_tracked_processes: usize,
    /// Counter reads allowed per pass; processes past the budget keep their last values
    pub max_processes_per_pass: usize,
    pub cpu_spike_threshold_percent: f64,
    pub track_system_processes: bool,
    pub track_background_processes: bool,
    /// How long a vanished process is kept before it is purged
    pub grace_period_secs: u64,
    pub high_impact_threshold: f64,
    pub scoring: ScoringConfig,
}

impl Default for ImpactMonitorConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 2000,
            history_window_minutes: 5,
            max_tracked_processes: 100,
            max_processes_per_pass: 256,
            cpu_spike_threshold_percent: 50.0,
            track_system_processes: false,
            track_background_processes: true,
            grace_period_secs: 60,
            high_impact_threshold: 75.0,
            scoring: ScoringConfig::default(),
        }
    }
}

impl ImpactMonitorConfig {
    /// Clamp out-of-range values to their documented minimums instead of failing.
    pub fn sanitized(mut self) -> Self {
        if self.sample_interval_ms < MIN_SAMPLE_INTERVAL_MS {
            log::warn!(
                "sample_interval_ms {} below minimum, using {}",
                self.sample_interval_ms,
                MIN_SAMPLE_INTERVAL_MS
            );
            self.sample_interval_ms = MIN_SAMPLE_INTERVAL_MS;
        }
        self.history_window_minutes = self
            .history_window_minutes
            .max(MIN_HISTORY_WINDOW_MINUTES);
        self.max_tracked_processes = self.max_tracked_processes.max(1);
        self.max_processes_per_pass = self.max_processes_per_pass.max(1);
        self.cpu_spike_threshold_percent = clamp_percent(self.cpu_spike_threshold_percent);
        self.high_impact_threshold = clamp_percent(self.high_impact_threshold);
        self
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms.max(MIN_SAMPLE_INTERVAL_MS))
    }

    pub fn history_window(&self) -> Duration {
        Duration::from_secs(u64::from(self.history_window_minutes.max(MIN_HISTORY_WINDOW_MINUTES)) * 60)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    /// Upper bound on retained samples per process: `ceil(window / interval)`.
    pub fn max_samples_per_process(&self) -> usize {
        let window_ms = self.history_window().as_millis() as u64;
        let interval_ms = self.sample_interval().as_millis() as u64;
        window_ms.div_ceil(interval_ms).max(1) as usize
    }

    /// Load from the default config location, falling back to defaults.
    pub fn load() -> Result<Self> {
        let path = Self::get_config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let data = fs::read(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if data.is_empty() {
            return Ok(Self::default());
        }

        let config = serde_json::from_slice::<Self>(&data).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable config {:?}: {}", path, e);
            Self::default()
        });

        Ok(config.sanitized())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let data =
            serde_json::to_vec_pretty(self).with_context(|| "Failed to serialize config")?;

        fs::write(path, data)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().with_context(|| "Could not determine config directory")?;

        Ok(config_dir.join("impactmon").join("config.json"))
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
