use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning knobs for a [`TaskScheduler`](crate::TaskScheduler).
///
/// Missing fields fall back to their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Wall-clock time one burst may spend running tasks.
    pub burst_budget_ms: u64,
    /// Upper bound on how long an idle-callback yield may be starved.
    pub idle_timeout_ms: u64,
    /// Items per chunk for `process_in_chunks`.
    pub chunk_size: usize,
    pub debounce_delay_ms: u64,
    pub throttle_limit_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            burst_budget_ms: 5,
            idle_timeout_ms: 16,
            chunk_size: 10,
            debounce_delay_ms: 100,
            throttle_limit_ms: 100,
        }
    }
}

impl SchedulerConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.burst_budget_ms == 0 {
            return Err(ConfigError::ZeroBurstBudget);
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        Ok(())
    }

    pub fn burst_budget(&self) -> Duration {
        Duration::from_millis(self.burst_budget_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_delay_ms)
    }

    pub fn throttle_limit(&self) -> Duration {
        Duration::from_millis(self.throttle_limit_ms)
    }
}
