//! Time-series store.
//!
//! Owns every tracked `ProcessImpact` together with the delta bookkeeping and
//! is the only place where either is mutated. `apply_pass` is the single write
//! path; callers hold the store's write lock while it runs.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use crate::core::config::ImpactMonitorConfig;

use super::delta::{DeltaEngine, IntervalDelta};
use super::lifecycle::{ImpactEvent, LifecycleSnapshot};
use super::scoring::{apply_scores, overall_impact_score, ScoreInputs};
use super::source::{ProcessEntry, RawCounters, SystemTotals};
use super::types::{GpuImpact, NetworkImpact, ProcessImpact, ProcessSample};

/// One enumerated process and the outcome of reading its counters
#[derive(Debug, Clone)]
pub struct ProcessReading {
    pub entry: ProcessEntry,
    pub is_system: bool,
    /// `None` when the read failed or the pass budget was exhausted
    pub counters: Option<RawCounters>,
}

/// Everything read from the counter source for one pass
#[derive(Debug, Clone, Default)]
pub struct PassReadings {
    /// `None` when the system-wide counters could not be read
    pub totals: Option<SystemTotals>,
    pub processes: Vec<ProcessReading>,
}

/// Summary of an applied pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    pub sampled: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub purged: usize,
    pub events: Vec<ImpactEvent>,
}

#[derive(Debug, Default)]
pub struct ImpactStore {
    processes: BTreeMap<u32, ProcessImpact>,
    deltas: DeltaEngine,
}

impl ImpactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn processes(&self) -> &BTreeMap<u32, ProcessImpact> {
        &self.processes
    }

    pub fn get(&self, pid: u32) -> Option<&ProcessImpact> {
        self.processes.get(&pid)
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn has_bookkeeping(&self, pid: u32) -> bool {
        self.deltas.previous(pid).is_some()
    }

    pub fn clear(&mut self) {
        self.processes.clear();
        self.deltas.clear();
    }

    /// Apply one pass of readings taken at `now`.
    pub fn apply_pass(
        &mut self,
        readings: PassReadings,
        config: &ImpactMonitorConfig,
        now: DateTime<Utc>,
    ) -> PassReport {
        let lifecycle = LifecycleSnapshot::capture(&self.processes);
        let mut report = PassReport::default();

        // Running is decided by this pass's enumeration alone
        let listed: HashSet<u32> = readings.processes.iter().map(|r| r.entry.pid).collect();
        for impact in self.processes.values_mut() {
            impact.running = listed.contains(&impact.pid);
        }

        for reading in readings.processes {
            match self.record(reading, readings.totals, config, now) {
                RecordOutcome::Sampled => report.sampled += 1,
                RecordOutcome::Stale => report.skipped += 1,
                RecordOutcome::Rejected => report.rejected += 1,
            }
        }

        // Bookkeeping of listed but untracked processes lets them compete for a slot next pass
        let processes = &self.processes;
        self.deltas
            .retain(|pid| listed.contains(&pid) || processes.contains_key(&pid));

        self.prune_samples(now, config.history_window(), config.max_samples_per_process());
        self.recompute_aggregates();
        self.recalculate_scores(config);

        report.events = lifecycle.diff(&self.processes, config.high_impact_threshold);
        report.purged = self.purge_expired(now, config.grace_period());
        report.events.push(ImpactEvent::DataUpdated);

        log::trace!(
            "Pass applied: {} sampled, {} stale, {} rejected, {} purged, {} tracked",
            report.sampled,
            report.skipped,
            report.rejected,
            report.purged,
            self.processes.len()
        );

        report
    }

    fn record(
        &mut self,
        reading: ProcessReading,
        totals: Option<SystemTotals>,
        config: &ImpactMonitorConfig,
        now: DateTime<Utc>,
    ) -> RecordOutcome {
        let ProcessReading {
            entry,
            is_system,
            counters,
        } = reading;
        let pid = entry.pid;

        let Some(counters) = counters else {
            // Listed but unreadable: still alive, keep the last known values
            return RecordOutcome::Stale;
        };

        let delta = self.deltas.compute(pid, &counters, totals, now);
        if !self.processes.contains_key(&pid) {
            let score = provisional_score(&counters, &delta, config);
            if !self.make_room(config.max_tracked_processes, score) {
                log::debug!(
                    "Not tracking {} ({}): {} more impactful processes already tracked",
                    entry.name,
                    pid,
                    self.processes.len()
                );
                return RecordOutcome::Rejected;
            }

            let mut impact = ProcessImpact::new(pid, entry.name.clone(), now);
            // Ranks the newcomer against later admissions in this pass
            impact.overall_impact_score = score;
            self.processes.insert(pid, impact);
        }

        let impact = self
            .processes
            .entry(pid)
            .or_insert_with(|| ProcessImpact::new(pid, entry.name.clone(), now));

        impact.name = entry.name;
        impact.parent_pid = entry.parent_pid;
        if entry.executable_path.is_some() {
            impact.executable_path = entry.executable_path;
        }
        if entry.description.is_some() {
            impact.description = entry.description;
        }
        impact.is_system_process = is_system;
        impact.is_background = entry.is_background;
        impact.running = true;
        impact.last_seen = now;

        update_with_sample(impact, &counters, &delta, config.cpu_spike_threshold_percent, now);

        RecordOutcome::Sampled
    }

    /// Free a slot for a newcomer scoring `score`.
    ///
    /// The longest-gone ended process goes first. Otherwise the least impactful
    /// running process is replaced if it scores strictly lower, oldest first on
    /// equal scores. Replaced processes keep their delta bookkeeping while listed.
    fn make_room(&mut self, cap: usize, score: f64) -> bool {
        while self.processes.len() >= cap {
            let oldest_ended = self
                .processes
                .values()
                .filter(|p| !p.running)
                .min_by_key(|p| p.last_seen)
                .map(|p| p.pid);

            if let Some(pid) = oldest_ended {
                self.remove(pid);
                continue;
            }

            let least_impactful = self
                .processes
                .values()
                .min_by(|a, b| {
                    a.overall_impact_score
                        .partial_cmp(&b.overall_impact_score)
                        .unwrap_or(Ordering::Equal)
                        .then_with(|| a.first_seen.cmp(&b.first_seen))
                        .then_with(|| a.pid.cmp(&b.pid))
                })
                .filter(|p| p.overall_impact_score < score)
                .map(|p| p.pid);

            match least_impactful {
                Some(pid) => {
                    if let Some(evicted) = self.processes.remove(&pid) {
                        log::debug!(
                            "Tracking cap reached, replacing {} ({})",
                            evicted.name,
                            pid
                        );
                    }
                }
                None => return false,
            }
        }
        true
    }

    /// Evict samples older than the window, then cap each sequence at `max_samples`.
    pub fn prune_samples(&mut self, now: DateTime<Utc>, window: Duration, max_samples: usize) {
        let cutoff = chrono::Duration::from_std(window)
            .ok()
            .and_then(|w| now.checked_sub_signed(w));

        for impact in self.processes.values_mut() {
            while impact
                .samples
                .front()
                .zip(cutoff)
                .is_some_and(|(s, cutoff)| s.timestamp < cutoff)
            {
                impact.samples.pop_front();
            }
            while impact.samples.len() > max_samples {
                impact.samples.pop_front();
            }
        }
    }

    /// Recompute window averages over the retained samples of every entity
    pub fn recompute_aggregates(&mut self) {
        for impact in self.processes.values_mut() {
            recompute_averages(impact);
        }
    }

    pub fn recalculate_scores(&mut self, config: &ImpactMonitorConfig) {
        for impact in self.processes.values_mut() {
            apply_scores(impact, &config.scoring);
        }
    }

    /// Remove ended processes whose last sighting is older than `grace`.
    /// Returns how many were purged.
    pub fn purge_expired(&mut self, now: DateTime<Utc>, grace: Duration) -> usize {
        let grace = chrono::Duration::from_std(grace).unwrap_or(chrono::Duration::MAX);
        let expired: Vec<u32> = self
            .processes
            .values()
            .filter(|p| !p.running && now - p.last_seen > grace)
            .map(|p| p.pid)
            .collect();

        for &pid in &expired {
            self.remove(pid);
        }
        expired.len()
    }

    fn remove(&mut self, pid: u32) {
        if let Some(impact) = self.processes.remove(&pid) {
            log::debug!("Purged {} ({})", impact.name, pid);
        }
        self.deltas.forget(pid);
    }
}

enum RecordOutcome {
    Sampled,
    Stale,
    Rejected,
}

/// Overall score of a single interval, used to rank a process that is not tracked yet
fn provisional_score(
    counters: &RawCounters,
    delta: &IntervalDelta,
    config: &ImpactMonitorConfig,
) -> f64 {
    let network_rate = match (delta.network_sent_rate, delta.network_recv_rate) {
        (None, None) => 0.0,
        (sent, recv) => sent.unwrap_or(0.0) + recv.unwrap_or(0.0),
    };
    let inputs = ScoreInputs::from_rates(
        delta.cpu_percent.unwrap_or(0.0),
        delta.disk_read_rate + delta.disk_write_rate,
        counters.working_set_bytes,
        network_rate,
    );
    overall_impact_score(&inputs, &config.scoring)
}

fn update_with_sample(
    impact: &mut ProcessImpact,
    counters: &RawCounters,
    delta: &IntervalDelta,
    spike_threshold: f64,
    now: DateTime<Utc>,
) {
    // Without system totals the last known CPU value is carried forward
    let cpu_percent = match delta.cpu_percent {
        Some(percent) => {
            impact.peak_cpu_percent = impact.peak_cpu_percent.max(percent);
            if percent > spike_threshold {
                impact.cpu_spike_count += 1;
            }
            percent
        }
        None => impact.samples.back().map_or(0.0, |s| s.cpu_percent),
    };

    impact.total_cpu_time = counters.cpu_time();

    impact.current_memory_bytes = counters.working_set_bytes;
    impact.peak_memory_bytes = impact.peak_memory_bytes.max(counters.working_set_bytes);

    impact.total_disk_read_bytes += delta.disk_read_bytes;
    impact.total_disk_write_bytes += delta.disk_write_bytes;
    impact.peak_disk_read_rate = impact.peak_disk_read_rate.max(delta.disk_read_rate);
    impact.peak_disk_write_rate = impact.peak_disk_write_rate.max(delta.disk_write_rate);

    let sample = ProcessSample {
        timestamp: now,
        cpu_percent,
        memory_bytes: counters.working_set_bytes,
        disk_read_rate: delta.disk_read_rate,
        disk_write_rate: delta.disk_write_rate,
        network_sent_rate: delta.network_sent_rate,
        network_recv_rate: delta.network_recv_rate,
        gpu_percent: counters.gpu_percent,
    };

    if let Some(rate) = sample.network_rate() {
        let network = impact.network.get_or_insert_with(NetworkImpact::default);
        network.total_sent_bytes += delta.network_sent_bytes.unwrap_or(0);
        network.total_recv_bytes += delta.network_recv_bytes.unwrap_or(0);
        network.peak_rate = network.peak_rate.max(rate);
    }

    if let Some(gpu_percent) = sample.gpu_percent {
        let gpu = impact.gpu.get_or_insert_with(GpuImpact::default);
        gpu.peak_percent = gpu.peak_percent.max(gpu_percent);
    }

    // Keep the sequence time-ascending even if the clock steps back
    if impact.samples.back().is_some_and(|last| last.timestamp > now) {
        impact.samples.clear();
    }
    impact.samples.push_back(sample);
}

fn recompute_averages(impact: &mut ProcessImpact) {
    let count = impact.samples.len();
    if count == 0 {
        impact.avg_cpu_percent = 0.0;
        impact.avg_memory_bytes = 0;
        impact.avg_disk_read_rate = 0.0;
        impact.avg_disk_write_rate = 0.0;
        impact.memory_growth_bytes = 0;
        if let Some(network) = impact.network.as_mut() {
            network.avg_rate = 0.0;
        }
        if let Some(gpu) = impact.gpu.as_mut() {
            gpu.avg_percent = 0.0;
        }
        return;
    }

    let n = count as f64;
    let mut cpu_sum = 0.0;
    let mut memory_sum: u128 = 0;
    let mut read_sum = 0.0;
    let mut write_sum = 0.0;
    let mut network_sum = 0.0;
    let mut gpu_sum = 0.0;

    for sample in &impact.samples {
        cpu_sum += sample.cpu_percent;
        memory_sum += u128::from(sample.memory_bytes);
        read_sum += sample.disk_read_rate;
        write_sum += sample.disk_write_rate;
        network_sum += sample.network_rate().unwrap_or(0.0);
        gpu_sum += sample.gpu_percent.unwrap_or(0.0);
    }

    impact.avg_cpu_percent = cpu_sum / n;
    impact.avg_memory_bytes = (memory_sum / count as u128) as u64;
    impact.avg_disk_read_rate = read_sum / n;
    impact.avg_disk_write_rate = write_sum / n;

    if let Some(network) = impact.network.as_mut() {
        network.avg_rate = network_sum / n;
    }
    if let Some(gpu) = impact.gpu.as_mut() {
        gpu.avg_percent = gpu_sum / n;
    }

    if let (Some(first), Some(last)) = (impact.samples.front(), impact.samples.back()) {
        impact.memory_growth_bytes = last.memory_bytes as i64 - first.memory_bytes as i64;
    }
}
