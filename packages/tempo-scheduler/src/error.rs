use thiserror::Error;

/// Why a scheduled task did not complete. Logged by the scheduler, never returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("task panicked: {0}")]
    Panicked(String),
    #[error("task failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("burst budget must be greater than zero")]
    ZeroBurstBudget,
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,
    #[error("invalid scheduler config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("no task scheduler is installed on this thread")]
    NoScheduler,
    #[error("chunked processing was dropped before it completed")]
    Abandoned,
}
