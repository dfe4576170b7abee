// impactmon Library - Public API

// Re-export error types
pub mod error;
pub use error::{ImpactError, Result};

// Module declarations
pub mod commands;
pub mod core;
pub mod platform;
pub mod ui;

// Re-export commonly used types
pub use core::config::ImpactMonitorConfig;
pub use core::impact_monitor::{ImpactCategory, ImpactEvent, ImpactMonitor, ProcessImpact};
pub use platform::SysinfoCounterSource;

// Initialize logging
pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}
