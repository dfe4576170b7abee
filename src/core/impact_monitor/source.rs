use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

/// A live process as reported by enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub parent_pid: Option<u32>,
    pub name: String,
    pub executable_path: Option<PathBuf>,
    pub description: Option<String>,
    /// No visible window
    pub is_background: bool,
}

impl ProcessEntry {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            parent_pid: None,
            name: name.into(),
            executable_path: None,
            description: None,
            is_background: false,
        }
    }
}

/// Raw cumulative counters of one process
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCounters {
    pub cpu_kernel: Duration,
    pub cpu_user: Duration,
    pub working_set_bytes: u64,
    pub disk_read_bytes: u64,
    pub disk_write_bytes: u64,
    pub network_sent_bytes: Option<u64>,
    pub network_recv_bytes: Option<u64>,
    pub gpu_percent: Option<f64>,
}

impl RawCounters {
    pub fn cpu_time(&self) -> Duration {
        self.cpu_kernel + self.cpu_user
    }
}

/// Global CPU time and processor count for normalising process CPU deltas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemTotals {
    /// Cumulative per-processor CPU time
    pub total_cpu_time: Duration,
    pub processor_count: usize,
}

/// Optional metrics the source is able to provide
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceCapabilities {
    pub per_process_network: bool,
    pub per_process_gpu: bool,
    pub battery: bool,
}

/// Supplier of raw OS-level process and system counters.
///
/// Implementations live in the platform layer. A failing `read_counters`
/// only affects the process it was called for.
pub trait CounterSource: Send {
    /// List the processes alive right now
    fn enumerate_processes(&mut self) -> Result<Vec<ProcessEntry>>;

    /// Read cumulative counters for one process
    fn read_counters(&mut self, pid: u32) -> Result<RawCounters>;

    /// Read global CPU time and processor count
    fn system_totals(&mut self) -> Result<SystemTotals>;

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::default()
    }
}

const SYSTEM_PROCESS_NAMES: &[&str] = &[
    // Windows
    "System",
    "Registry",
    "smss.exe",
    "csrss.exe",
    "wininit.exe",
    "services.exe",
    "lsass.exe",
    "svchost.exe",
    "dwm.exe",
    "fontdrvhost.exe",
    "winlogon.exe",
    "LogonUI.exe",
    "sihost.exe",
    "taskhostw.exe",
    "explorer.exe",
    "ShellExperienceHost.exe",
    "SearchHost.exe",
    "StartMenuExperienceHost.exe",
    "RuntimeBroker.exe",
    "dllhost.exe",
    "conhost.exe",
    "SecurityHealthService.exe",
    "MsMpEng.exe",
    "NisSrv.exe",
    "SearchIndexer.exe",
    "spoolsv.exe",
    "WmiPrvSE.exe",
    "audiodg.exe",
    // Unix
    "init",
    "systemd",
    "kthreadd",
    "launchd",
    "kernel_task",
    "WindowServer",
];

const SYSTEM_PATH_FRAGMENTS: &[&str] = &["\\windows\\", "\\system32\\", "/system/library/"];

/// Whether a process belongs to the operating system, by well-known name or install path
pub fn is_system_process(name: &str, executable_path: Option<&Path>) -> bool {
    if SYSTEM_PROCESS_NAMES
        .iter()
        .any(|known| known.eq_ignore_ascii_case(name))
    {
        return true;
    }

    executable_path
        .map(|path| path.to_string_lossy().to_lowercase())
        .is_some_and(|path| SYSTEM_PATH_FRAGMENTS.iter().any(|f| path.contains(f)))
}
