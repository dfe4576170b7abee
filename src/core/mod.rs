// Core business logic module

pub mod config;
pub mod impact_monitor;

// Re-export commonly used items
pub use config::{ImpactMonitorConfig, ScoringConfig};
pub use impact_monitor::{ImpactCategory, ImpactEvent, ImpactMonitor, ProcessImpact};
