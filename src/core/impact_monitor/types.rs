use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// One reading of a process taken during a sampling pass.
///
/// Disk and network values are rates over the interval since the previous
/// reading, in bytes per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSample {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f64,
    pub memory_bytes: u64,
    pub disk_read_rate: f64,
    pub disk_write_rate: f64,
    pub network_sent_rate: Option<f64>,
    pub network_recv_rate: Option<f64>,
    pub gpu_percent: Option<f64>,
}

impl ProcessSample {
    pub fn network_rate(&self) -> Option<f64> {
        match (self.network_sent_rate, self.network_recv_rate) {
            (None, None) => None,
            (sent, recv) => Some(sent.unwrap_or(0.0) + recv.unwrap_or(0.0)),
        }
    }
}

/// Network usage, present only when the counter source reports per-process traffic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkImpact {
    pub total_sent_bytes: u64,
    pub total_recv_bytes: u64,
    pub avg_rate: f64,
    pub peak_rate: f64,
}

/// GPU usage, present only when the counter source reports per-process GPU load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpuImpact {
    pub avg_percent: f64,
    pub peak_percent: f64,
}

/// Aggregated impact of a single process over the retention window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessImpact {
    pub pid: u32,
    pub parent_pid: Option<u32>,
    pub name: String,
    pub executable_path: Option<PathBuf>,
    pub description: Option<String>,

    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub running: bool,

    // CPU
    pub avg_cpu_percent: f64,
    pub peak_cpu_percent: f64,
    pub total_cpu_time: Duration,
    pub cpu_spike_count: u32,

    // Memory
    pub current_memory_bytes: u64,
    pub peak_memory_bytes: u64,
    pub avg_memory_bytes: u64,
    /// Newest minus oldest retained memory reading
    pub memory_growth_bytes: i64,

    // Disk (rates in bytes/sec)
    pub total_disk_read_bytes: u64,
    pub total_disk_write_bytes: u64,
    pub avg_disk_read_rate: f64,
    pub avg_disk_write_rate: f64,
    pub peak_disk_read_rate: f64,
    pub peak_disk_write_rate: f64,

    pub network: Option<NetworkImpact>,
    pub gpu: Option<GpuImpact>,

    pub battery_impact_score: f64,
    pub overall_impact_score: f64,

    pub is_system_process: bool,
    pub is_background: bool,

    /// Retained samples, oldest first. Empty on every snapshot handed out in bulk.
    #[serde(skip)]
    pub samples: VecDeque<ProcessSample>,
}

impl ProcessImpact {
    pub fn new(pid: u32, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            pid,
            parent_pid: None,
            name: name.into(),
            executable_path: None,
            description: None,
            first_seen: now,
            last_seen: now,
            running: true,
            avg_cpu_percent: 0.0,
            peak_cpu_percent: 0.0,
            total_cpu_time: Duration::ZERO,
            cpu_spike_count: 0,
            current_memory_bytes: 0,
            peak_memory_bytes: 0,
            avg_memory_bytes: 0,
            memory_growth_bytes: 0,
            total_disk_read_bytes: 0,
            total_disk_write_bytes: 0,
            avg_disk_read_rate: 0.0,
            avg_disk_write_rate: 0.0,
            peak_disk_read_rate: 0.0,
            peak_disk_write_rate: 0.0,
            network: None,
            gpu: None,
            battery_impact_score: 0.0,
            overall_impact_score: 0.0,
            is_system_process: false,
            is_background: false,
            samples: VecDeque::new(),
        }
    }

    /// Copy of this entity without its sample history.
    pub fn snapshot(&self) -> Self {
        Self {
            pid: self.pid,
            parent_pid: self.parent_pid,
            name: self.name.clone(),
            executable_path: self.executable_path.clone(),
            description: self.description.clone(),
            first_seen: self.first_seen,
            last_seen: self.last_seen,
            running: self.running,
            avg_cpu_percent: self.avg_cpu_percent,
            peak_cpu_percent: self.peak_cpu_percent,
            total_cpu_time: self.total_cpu_time,
            cpu_spike_count: self.cpu_spike_count,
            current_memory_bytes: self.current_memory_bytes,
            peak_memory_bytes: self.peak_memory_bytes,
            avg_memory_bytes: self.avg_memory_bytes,
            memory_growth_bytes: self.memory_growth_bytes,
            total_disk_read_bytes: self.total_disk_read_bytes,
            total_disk_write_bytes: self.total_disk_write_bytes,
            avg_disk_read_rate: self.avg_disk_read_rate,
            avg_disk_write_rate: self.avg_disk_write_rate,
            peak_disk_read_rate: self.peak_disk_read_rate,
            peak_disk_write_rate: self.peak_disk_write_rate,
            network: self.network.clone(),
            gpu: self.gpu.clone(),
            battery_impact_score: self.battery_impact_score,
            overall_impact_score: self.overall_impact_score,
            is_system_process: self.is_system_process,
            is_background: self.is_background,
            samples: VecDeque::new(),
        }
    }

    /// Combined average disk throughput in bytes/sec
    pub fn avg_disk_rate(&self) -> f64 {
        self.avg_disk_read_rate + self.avg_disk_write_rate
    }

    /// Average network throughput in bytes/sec, 0 when unsupported
    pub fn avg_network_rate(&self) -> f64 {
        self.network.as_ref().map_or(0.0, |n| n.avg_rate)
    }

    pub fn avg_gpu_percent(&self) -> f64 {
        self.gpu.as_ref().map_or(0.0, |g| g.avg_percent)
    }
}

/// Category used to rank processes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImpactCategory {
    CpuUsage,
    MemoryUsage,
    DiskIo,
    DiskRead,
    DiskWrite,
    NetworkUsage,
    GpuUsage,
    BatteryDrain,
    OverallImpact,
}

impl ImpactCategory {
    pub const ALL: [ImpactCategory; 9] = [
        ImpactCategory::CpuUsage,
        ImpactCategory::MemoryUsage,
        ImpactCategory::DiskIo,
        ImpactCategory::DiskRead,
        ImpactCategory::DiskWrite,
        ImpactCategory::NetworkUsage,
        ImpactCategory::GpuUsage,
        ImpactCategory::BatteryDrain,
        ImpactCategory::OverallImpact,
    ];

    /// The value this category ranks by
    pub fn metric(self, impact: &ProcessImpact) -> f64 {
        match self {
            ImpactCategory::CpuUsage => impact.avg_cpu_percent,
            ImpactCategory::MemoryUsage => impact.current_memory_bytes as f64,
            ImpactCategory::DiskIo => impact.avg_disk_rate(),
            ImpactCategory::DiskRead => impact.avg_disk_read_rate,
            ImpactCategory::DiskWrite => impact.avg_disk_write_rate,
            ImpactCategory::NetworkUsage => impact.avg_network_rate(),
            ImpactCategory::GpuUsage => impact.avg_gpu_percent(),
            ImpactCategory::BatteryDrain => impact.battery_impact_score,
            ImpactCategory::OverallImpact => impact.overall_impact_score,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ImpactCategory::CpuUsage => "cpu",
            ImpactCategory::MemoryUsage => "memory",
            ImpactCategory::DiskIo => "disk",
            ImpactCategory::DiskRead => "disk-read",
            ImpactCategory::DiskWrite => "disk-write",
            ImpactCategory::NetworkUsage => "network",
            ImpactCategory::GpuUsage => "gpu",
            ImpactCategory::BatteryDrain => "battery",
            ImpactCategory::OverallImpact => "overall",
        }
    }
}

impl fmt::Display for ImpactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ImpactCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        ImpactCategory::ALL
            .into_iter()
            .find(|c| c.label() == lower)
            .ok_or_else(|| {
                let names: Vec<_> = ImpactCategory::ALL.iter().map(|c| c.label()).collect();
                format!("unknown category '{}', expected one of: {}", s, names.join(", "))
            })
    }
}
