//! Cooperative, time-sliced task scheduling on top of [`tempo_host`].
//!
//! [`TaskScheduler`] runs closures in FIFO order in short bursts and hands
//! control back to the host loop between bursts, so a large backlog never
//! stalls the loop. The helpers in [`chunked`] and [`rate_limit`] build on
//! it for walking large collections and for debouncing or throttling
//! callbacks.

pub mod chunked;
pub mod config;
pub mod context;
pub mod error;
mod queue;
pub mod rate_limit;
pub mod scheduler;
mod task;
pub mod yielding;

pub use chunked::{ChunkReport, Completion, process_in_chunks};
pub use config::SchedulerConfig;
pub use error::{ConfigError, SchedulerError, TaskError};
pub use rate_limit::{Debounced, Throttled, debounce_task, throttle_task};
pub use scheduler::{SchedulerStats, TaskScheduler};
pub use yielding::{IdleYield, MessageYield, PostTaskYield, YieldStrategy, select_strategy};

pub use tempo_host::{EventLoop, Task};
