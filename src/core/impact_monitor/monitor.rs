//! Thread-safe owner of the impact store.
//!
//! The sampler is the only writer. Every read takes the shared lock and copies
//! out what it returns, so callers never hold references into the live store.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::core::config::ImpactMonitorConfig;
use crate::error::Result;

use super::lifecycle::ImpactEvent;
use super::query::{running_snapshots, sort_by_category, top_by_category};
use super::scheduler::SamplerRuntime;
use super::source::{is_system_process, CounterSource, ProcessEntry, SourceCapabilities};
use super::store::{ImpactStore, PassReadings, PassReport, ProcessReading};
use super::types::{ImpactCategory, ProcessImpact, ProcessSample};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Result of asking for a sampling pass
#[derive(Debug, Clone, PartialEq)]
pub enum PassOutcome {
    Completed(PassReport),
    /// Another pass was still running
    Skipped,
}

/// State shared between the monitor handle and the background sampler
pub(crate) struct MonitorShared {
    config: RwLock<ImpactMonitorConfig>,
    store: RwLock<ImpactStore>,
    source: Mutex<Box<dyn CounterSource>>,
    capabilities: SourceCapabilities,
    events: broadcast::Sender<ImpactEvent>,
    pass_in_progress: AtomicBool,
    total_passes: AtomicU64,
    started_at: RwLock<Option<DateTime<Utc>>>,
    analysis_window_secs: AtomicU64,
    budget_cursor: AtomicUsize,
}

/// Clears the in-progress flag even if the pass unwinds
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl MonitorShared {
    /// Run one pass unless another one is in flight.
    pub(crate) fn run_pass(&self, now: DateTime<Utc>) -> PassOutcome {
        if self
            .pass_in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::warn!("Sampling pass still in progress, skipping this one");
            return PassOutcome::Skipped;
        }
        let _guard = PassGuard(&self.pass_in_progress);

        let config = self.config.read().clone();
        let readings = self.gather(&config);

        let report = {
            let mut store = self.store.write();
            store.apply_pass(readings, &config, now)
        };

        self.started_at.write().get_or_insert(now);
        self.total_passes.fetch_add(1, Ordering::Relaxed);
        self.publish(&report.events);

        PassOutcome::Completed(report)
    }

    /// Read everything the pass needs from the counter source without holding the store lock.
    fn gather(&self, config: &ImpactMonitorConfig) -> PassReadings {
        let mut source = self.source.lock();

        let entries = match source.enumerate_processes() {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Process enumeration failed: {}", e);
                Vec::new()
            }
        };

        let totals = match source.system_totals() {
            Ok(totals) => Some(totals),
            Err(e) => {
                log::warn!("System CPU totals unavailable, skipping CPU deltas: {}", e);
                None
            }
        };

        let eligible: Vec<(ProcessEntry, bool)> = entries
            .into_iter()
            // Idle pseudo-process
            .filter(|entry| entry.pid != 0)
            .map(|entry| {
                let is_system = is_system_process(&entry.name, entry.executable_path.as_deref());
                (entry, is_system)
            })
            .filter(|(entry, is_system)| {
                (config.track_system_processes || !is_system)
                    && (config.track_background_processes || !entry.is_background)
            })
            .collect();

        // The budget window rotates so every listed process is read within ceil(n / budget) passes
        let count = eligible.len();
        let budget = config.max_processes_per_pass.min(count);
        let start = if budget < count {
            self.budget_cursor.fetch_add(budget, Ordering::Relaxed) % count
        } else {
            0
        };

        let mut processes = Vec::with_capacity(count);
        for (index, (entry, is_system)) in eligible.into_iter().enumerate() {
            let in_budget = (index + count - start) % count < budget;

            let counters = if in_budget {
                match source.read_counters(entry.pid) {
                    Ok(counters) => Some(counters),
                    Err(e) if e.is_per_process() => {
                        log::debug!("Skipping {} ({}) this pass: {}", entry.name, entry.pid, e);
                        None
                    }
                    Err(e) => {
                        log::warn!("Reading counters of {} ({}) failed: {}", entry.name, entry.pid, e);
                        None
                    }
                }
            } else {
                None
            };

            processes.push(ProcessReading {
                entry,
                is_system,
                counters,
            });
        }

        PassReadings { totals, processes }
    }

    fn publish(&self, events: &[ImpactEvent]) {
        for event in events {
            // Fails only when nobody is subscribed
            let _ = self.events.send(event.clone());
        }
    }
}

/// Real-time per-process resource impact monitor
pub struct ImpactMonitor {
    shared: Arc<MonitorShared>,
    sampler: Mutex<Option<SamplerRuntime>>,
}

impl ImpactMonitor {
    /// Create a monitor with the default configuration
    pub fn new<S: CounterSource + 'static>(source: S) -> Self {
        Self::with_config(source, ImpactMonitorConfig::default())
    }

    pub fn with_config<S: CounterSource + 'static>(source: S, config: ImpactMonitorConfig) -> Self {
        let config = config.sanitized();
        let capabilities = source.capabilities();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            shared: Arc::new(MonitorShared {
                analysis_window_secs: AtomicU64::new(config.history_window().as_secs()),
                config: RwLock::new(config),
                store: RwLock::new(ImpactStore::new()),
                source: Mutex::new(Box::new(source)),
                capabilities,
                events,
                pass_in_progress: AtomicBool::new(false),
                total_passes: AtomicU64::new(0),
                started_at: RwLock::new(None),
                budget_cursor: AtomicUsize::new(0),
            }),
            sampler: Mutex::new(None),
        }
    }

    /// Start background sampling. `interval_ms` overrides the configured cadence.
    pub fn start(&self, interval_ms: Option<u64>) -> Result<()> {
        let mut sampler = self.sampler.lock();
        if sampler.is_some() {
            return Ok(());
        }

        let interval = {
            let mut config = self.shared.config.write();
            if let Some(ms) = interval_ms.filter(|&ms| ms > 0) {
                *config = ImpactMonitorConfig {
                    sample_interval_ms: ms,
                    ..config.clone()
                }
                .sanitized();
            }
            config.sample_interval()
        };

        *self.shared.started_at.write() = Some(Utc::now());
        *sampler = Some(SamplerRuntime::spawn(Arc::clone(&self.shared), interval)?);

        log::info!("Impact monitor started ({} ms interval)", interval.as_millis());
        Ok(())
    }

    /// Stop future ticks. A pass already running completes.
    pub fn stop(&self) {
        if let Some(sampler) = self.sampler.lock().take() {
            sampler.shutdown();
            log::info!("Impact monitor stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.sampler.lock().is_some()
    }

    /// Run one pass now
    pub fn refresh(&self) -> PassOutcome {
        self.refresh_at(Utc::now())
    }

    /// Run one pass stamped with `now`
    pub fn refresh_at(&self, now: DateTime<Utc>) -> PassOutcome {
        self.shared.run_pass(now)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ImpactEvent> {
        self.shared.events.subscribe()
    }

    // Query surface

    /// Running processes without their sample history
    pub fn all_processes(&self, include_system: bool) -> Vec<ProcessImpact> {
        let store = self.shared.store.read();
        running_snapshots(store.processes().values(), include_system)
    }

    pub fn top_processes(
        &self,
        category: ImpactCategory,
        count: usize,
        include_system: bool,
    ) -> Vec<ProcessImpact> {
        top_by_category(self.all_processes(include_system), category, count)
    }

    pub fn sorted_processes(
        &self,
        category: ImpactCategory,
        ascending: bool,
        include_system: bool,
    ) -> Vec<ProcessImpact> {
        let mut processes = self.all_processes(include_system);
        sort_by_category(&mut processes, category, ascending);
        processes
    }

    /// Snapshot of one tracked process, running or not, without history
    pub fn process_impact(&self, pid: u32) -> Option<ProcessImpact> {
        self.shared.store.read().get(pid).map(ProcessImpact::snapshot)
    }

    /// Full retained history of one process, oldest first
    pub fn process_history(&self, pid: u32) -> Vec<ProcessSample> {
        self.shared
            .store
            .read()
            .get(pid)
            .map(|p| p.samples.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn tracked_count(&self) -> usize {
        self.shared.store.read().len()
    }

    /// Fraction of the analysis window elapsed since start, in `[0, 1]`
    pub fn window_coverage(&self) -> f64 {
        self.window_coverage_at(Utc::now())
    }

    pub fn window_coverage_at(&self, now: DateTime<Utc>) -> f64 {
        let Some(started) = *self.shared.started_at.read() else {
            return 0.0;
        };

        let elapsed = (now - started).num_milliseconds();
        if elapsed <= 0 {
            return 0.0;
        }

        let window_ms = self.analysis_window().as_millis() as f64;
        (elapsed as f64 / window_ms).min(1.0)
    }

    pub fn analysis_window(&self) -> Duration {
        Duration::from_secs(self.shared.analysis_window_secs.load(Ordering::Relaxed).max(1))
    }

    /// Set the analysis window; history retention follows in whole minutes (at least one)
    pub fn set_analysis_window(&self, seconds: u64) {
        let seconds = seconds.max(1);
        self.shared
            .analysis_window_secs
            .store(seconds, Ordering::Relaxed);

        let mut config = self.shared.config.write();
        config.history_window_minutes = u32::try_from(seconds / 60).unwrap_or(u32::MAX).max(1);
    }

    pub fn total_passes(&self) -> u64 {
        self.shared.total_passes.load(Ordering::Relaxed)
    }

    pub fn capabilities(&self) -> SourceCapabilities {
        self.shared.capabilities
    }

    pub fn has_battery(&self) -> bool {
        self.shared.capabilities.battery
    }

    pub fn config(&self) -> ImpactMonitorConfig {
        self.shared.config.read().clone()
    }

    /// Replace the configuration; takes effect on the next pass.
    /// A new sampling interval applies after a restart.
    pub fn update_config(&self, config: ImpactMonitorConfig) {
        let config = config.sanitized();
        self.shared
            .analysis_window_secs
            .store(config.history_window().as_secs(), Ordering::Relaxed);
        *self.shared.config.write() = config;
    }

    /// Drop every tracked process and all delta bookkeeping
    pub fn clear_history(&self) {
        self.shared.store.write().clear();
    }

    /// Recompute scores from the current averages, e.g. after changing weights
    pub fn recalculate_impacts(&self) {
        let config = self.shared.config.read().clone();
        self.shared.store.write().recalculate_scores(&config);
        self.shared.publish(&[ImpactEvent::DataUpdated]);
    }
}

impl Drop for ImpactMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
