//! Background sampler.
//!
//! A dedicated Tokio runtime drives one pass per tick. The pass runs on the
//! blocking pool and is awaited, so passes never overlap; ticks missed while a
//! pass runs are skipped rather than queued.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::error::{ImpactError, Result};

use super::monitor::{MonitorShared, PassOutcome};

/// Wrapper around the Tokio runtime running the sampler task
pub(crate) struct SamplerRuntime {
    shutdown_tx: broadcast::Sender<()>,
    runtime: tokio::runtime::Runtime,
}

impl SamplerRuntime {
    pub(crate) fn spawn(shared: Arc<MonitorShared>, period: Duration) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_time()
            .thread_name("impact-sampler")
            .build()
            .map_err(|e| ImpactError::runtime(format!("failed to build sampler runtime: {}", e)))?;

        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
        runtime.spawn(sampler_task(shared, period, shutdown_rx));

        Ok(Self {
            shutdown_tx,
            runtime,
        })
    }

    /// Signal the task and release the runtime without blocking the caller.
    /// A pass already on the blocking pool runs to completion.
    pub(crate) fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        self.runtime.shutdown_background();
    }
}

async fn sampler_task(
    shared: Arc<MonitorShared>,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    log::debug!("Sampler task started");

    // First pass after one full interval
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let pass_shared = Arc::clone(&shared);
                match tokio::task::spawn_blocking(move || pass_shared.run_pass(Utc::now())).await {
                    Ok(PassOutcome::Completed(report)) => {
                        log::trace!("Pass completed with {} events", report.events.len());
                    }
                    Ok(PassOutcome::Skipped) => {}
                    Err(e) => {
                        log::error!("Sampling pass failed: {}", e);
                    }
                }
            }
            _ = shutdown.recv() => {
                log::debug!("Sampler task shutting down");
                break;
            }
        }
    }
}
