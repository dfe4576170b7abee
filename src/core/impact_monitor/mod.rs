//! Per-process resource impact monitoring.
//!
//! A background sampler reads raw counters from a `CounterSource`, turns them
//! into per-interval rates, keeps a bounded time series per process and
//! derives battery and overall impact scores. Readers query copies of the
//! result through `ImpactMonitor`.

mod delta;
mod lifecycle;
mod monitor;
mod query;
mod scheduler;
pub mod scoring;
mod source;
mod store;
mod types;

pub use delta::{DeltaEngine, IntervalDelta, PreviousCounters};
pub use lifecycle::{ImpactEvent, SCORED_CATEGORIES};
pub use monitor::{ImpactMonitor, PassOutcome};
pub use scoring::{battery_impact_score, overall_impact_score, ScoreInputs};
pub use source::{
    is_system_process, CounterSource, ProcessEntry, RawCounters, SourceCapabilities,
    SystemTotals,
};
pub use store::{ImpactStore, PassReadings, PassReport, ProcessReading};
pub use types::{GpuImpact, ImpactCategory, NetworkImpact, ProcessImpact, ProcessSample};
