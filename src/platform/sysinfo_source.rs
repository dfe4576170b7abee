//! Counter source backed by `sysinfo`.
//!
//! sysinfo exposes cumulative CPU time per process but no global tick counter,
//! so system CPU time is the wall time elapsed since the source was created.
//! That is per-processor time, which is what the CPU delta formula expects.

use std::ffi::OsString;
use std::time::{Duration, Instant};
use sysinfo::{
    CpuRefreshKind, Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System, UpdateKind,
};

use crate::core::impact_monitor::{
    CounterSource, ProcessEntry, RawCounters, SourceCapabilities, SystemTotals,
};
use crate::error::{ImpactError, Result};

pub struct SysinfoCounterSource {
    system: System,
    created: Instant,
    has_battery: bool,
}

impl SysinfoCounterSource {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing().with_cpu(CpuRefreshKind::nothing());
        let system = System::new_with_specifics(refresh_kind);

        Self {
            system,
            created: Instant::now(),
            has_battery: detect_battery(),
        }
    }
}

impl Default for SysinfoCounterSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterSource for SysinfoCounterSource {
    fn enumerate_processes(&mut self) -> Result<Vec<ProcessEntry>> {
        // One refresh per pass; read_counters serves from it
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing()
                .with_cpu()
                .with_memory()
                .with_disk_usage()
                .with_exe(UpdateKind::OnlyIfNotSet)
                .with_cmd(UpdateKind::OnlyIfNotSet),
        );

        let entries = self
            .system
            .processes()
            .values()
            .filter(|proc| proc.thread_kind().is_none())
            .map(|proc| ProcessEntry {
                pid: proc.pid().as_u32(),
                parent_pid: proc.parent().map(|p| p.as_u32()),
                name: proc.name().to_string_lossy().to_string(),
                executable_path: proc.exe().map(|p| p.to_path_buf()),
                description: command_line(proc.cmd()),
                // sysinfo has no window or session state, so every process counts as foreground
                is_background: false,
            })
            .collect();

        Ok(entries)
    }

    fn read_counters(&mut self, pid: u32) -> Result<RawCounters> {
        let proc = self
            .system
            .process(Pid::from_u32(pid))
            .ok_or_else(|| ImpactError::process_unavailable(pid))?;

        let disk = proc.disk_usage();

        Ok(RawCounters {
            cpu_kernel: Duration::ZERO,
            cpu_user: Duration::from_millis(proc.accumulated_cpu_time()),
            working_set_bytes: proc.memory(),
            disk_read_bytes: disk.total_read_bytes,
            disk_write_bytes: disk.total_written_bytes,
            network_sent_bytes: None,
            network_recv_bytes: None,
            gpu_percent: None,
        })
    }

    fn system_totals(&mut self) -> Result<SystemTotals> {
        let processor_count = self.system.cpus().len();
        if processor_count == 0 {
            return Err(ImpactError::system_counters("no processors reported"));
        }

        Ok(SystemTotals {
            total_cpu_time: self.created.elapsed(),
            processor_count,
        })
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities {
            per_process_network: false,
            per_process_gpu: false,
            battery: self.has_battery,
        }
    }
}

fn command_line(cmd: &[OsString]) -> Option<String> {
    if cmd.is_empty() {
        return None;
    }
    let joined = cmd
        .iter()
        .map(|arg| arg.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ");
    Some(joined)
}

fn detect_battery() -> bool {
    let manager = match battery::Manager::new() {
        Ok(manager) => manager,
        Err(e) => {
            log::debug!("Battery detection unavailable: {}", e);
            return false;
        }
    };

    match manager.batteries() {
        Ok(mut batteries) => batteries.next().is_some_and(|b| b.is_ok()),
        Err(e) => {
            log::debug!("Failed to enumerate batteries: {}", e);
            false
        }
    }
}
