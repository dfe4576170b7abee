//! Delta engine.
//!
//! Turns monotonically increasing raw counters into per-interval CPU
//! percentages and byte rates by remembering the previous reading of every
//! process.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;

use super::source::{RawCounters, SystemTotals};

/// Last raw reading of a process, kept only to compute the next delta
#[derive(Debug, Clone, PartialEq)]
pub struct PreviousCounters {
    pub timestamp: DateTime<Utc>,
    /// Process CPU time and the system CPU time read in the same pass.
    /// Left untouched by passes where system totals were unavailable.
    pub cpu: Option<(Duration, Duration)>,
    pub disk_read_bytes: u64,
    pub disk_write_bytes: u64,
    pub network_sent_bytes: Option<u64>,
    pub network_recv_bytes: Option<u64>,
}

/// Deltas of one process for the interval ending at the current pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntervalDelta {
    /// `None` when system totals could not be read this pass
    pub cpu_percent: Option<f64>,
    pub disk_read_bytes: u64,
    pub disk_write_bytes: u64,
    pub disk_read_rate: f64,
    pub disk_write_rate: f64,
    pub network_sent_bytes: Option<u64>,
    pub network_recv_bytes: Option<u64>,
    pub network_sent_rate: Option<f64>,
    pub network_recv_rate: Option<f64>,
}

#[derive(Debug, Default)]
pub struct DeltaEngine {
    previous: HashMap<u32, PreviousCounters>,
}

impl DeltaEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the interval delta for `pid` and remember `counters` for the next pass.
    ///
    /// `totals` is `None` when the system-wide counters failed this pass; CPU is
    /// then skipped for every process while disk and network still update.
    pub fn compute(
        &mut self,
        pid: u32,
        counters: &RawCounters,
        totals: Option<SystemTotals>,
        now: DateTime<Utc>,
    ) -> IntervalDelta {
        let previous = self.previous.get(&pid);
        let mut delta = IntervalDelta {
            cpu_percent: totals.map(|t| cpu_percent(previous, counters, t)),
            ..Default::default()
        };

        if let Some(prev) = previous {
            let elapsed_secs = (now - prev.timestamp)
                .to_std()
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0);

            delta.disk_read_bytes = counters.disk_read_bytes.saturating_sub(prev.disk_read_bytes);
            delta.disk_write_bytes = counters
                .disk_write_bytes
                .saturating_sub(prev.disk_write_bytes);
            delta.network_sent_bytes =
                counter_delta(counters.network_sent_bytes, prev.network_sent_bytes);
            delta.network_recv_bytes =
                counter_delta(counters.network_recv_bytes, prev.network_recv_bytes);

            if elapsed_secs > 0.0 {
                delta.disk_read_rate = delta.disk_read_bytes as f64 / elapsed_secs;
                delta.disk_write_rate = delta.disk_write_bytes as f64 / elapsed_secs;
                delta.network_sent_rate = delta.network_sent_bytes.map(|b| b as f64 / elapsed_secs);
                delta.network_recv_rate = delta.network_recv_bytes.map(|b| b as f64 / elapsed_secs);
            }
        }

        // First observation: network is supported but there is no interval yet
        if delta.network_sent_rate.is_none() && counters.network_sent_bytes.is_some() {
            delta.network_sent_rate = Some(0.0);
        }
        if delta.network_recv_rate.is_none() && counters.network_recv_bytes.is_some() {
            delta.network_recv_rate = Some(0.0);
        }

        let kept_cpu = previous.and_then(|p| p.cpu);
        self.previous.insert(
            pid,
            PreviousCounters {
                timestamp: now,
                cpu: match totals {
                    Some(t) => Some((counters.cpu_time(), t.total_cpu_time)),
                    None => kept_cpu,
                },
                disk_read_bytes: counters.disk_read_bytes,
                disk_write_bytes: counters.disk_write_bytes,
                network_sent_bytes: counters.network_sent_bytes,
                network_recv_bytes: counters.network_recv_bytes,
            },
        );

        delta
    }

    pub fn previous(&self, pid: u32) -> Option<&PreviousCounters> {
        self.previous.get(&pid)
    }

    /// Drop the bookkeeping of a purged process
    pub fn forget(&mut self, pid: u32) {
        self.previous.remove(&pid);
    }

    pub fn clear(&mut self) {
        self.previous.clear();
    }

    /// Keep only the bookkeeping of pids accepted by `keep`
    pub fn retain(&mut self, mut keep: impl FnMut(u32) -> bool) {
        self.previous.retain(|&pid, _| keep(pid));
    }

    pub fn len(&self) -> usize {
        self.previous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }
}

/// `100 * processDelta / (systemDelta * processorCount)`, clamped to `[0, 100]`.
/// Zero on the first observation of a process.
fn cpu_percent(
    previous: Option<&PreviousCounters>,
    counters: &RawCounters,
    totals: SystemTotals,
) -> f64 {
    let Some((prev_process, prev_system)) = previous.and_then(|p| p.cpu) else {
        return 0.0;
    };

    let process_delta = counters.cpu_time().saturating_sub(prev_process);
    let system_delta = totals.total_cpu_time.saturating_sub(prev_system);
    let processors = totals.processor_count.max(1) as f64;

    if system_delta.is_zero() {
        return 0.0;
    }

    let percent =
        100.0 * process_delta.as_secs_f64() / (system_delta.as_secs_f64() * processors);
    percent.clamp(0.0, 100.0)
}

fn counter_delta(current: Option<u64>, previous: Option<u64>) -> Option<u64> {
    match (current, previous) {
        (Some(cur), Some(prev)) => Some(cur.saturating_sub(prev)),
        _ => None,
    }
}
