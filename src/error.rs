use thiserror::Error;

/// Custom error type for the impact monitor
#[derive(Error, Debug)]
pub enum ImpactError {
    #[error("Process {pid} is no longer available")]
    ProcessUnavailable { pid: u32 },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Counter source error: {0}")]
    CounterSource(String),

    #[error("System counters unavailable: {0}")]
    SystemCounters(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Result type alias for the impact monitor
pub type Result<T> = std::result::Result<T, ImpactError>;

impl ImpactError {
    /// Create a process unavailable error
    pub fn process_unavailable(pid: u32) -> Self {
        ImpactError::ProcessUnavailable { pid }
    }

    /// Create a permission denied error
    pub fn permission_denied<S: Into<String>>(msg: S) -> Self {
        ImpactError::PermissionDenied(msg.into())
    }

    pub fn counter_source<S: Into<String>>(msg: S) -> Self {
        ImpactError::CounterSource(msg.into())
    }

    pub fn system_counters<S: Into<String>>(msg: S) -> Self {
        ImpactError::SystemCounters(msg.into())
    }

    pub fn runtime<S: Into<String>>(msg: S) -> Self {
        ImpactError::Runtime(msg.into())
    }

    /// Whether this error only concerns a single process and should not abort a pass
    pub fn is_per_process(&self) -> bool {
        matches!(
            self,
            ImpactError::ProcessUnavailable { .. } | ImpactError::PermissionDenied(_)
        )
    }
}
