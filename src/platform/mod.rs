// Platform-specific code module

pub mod sysinfo_source;

// Re-exports for cleaner imports
pub use sysinfo_source::SysinfoCounterSource;
