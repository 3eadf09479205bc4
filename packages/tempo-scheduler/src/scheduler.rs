use crate::chunked::{self, Completion};
use crate::config::SchedulerConfig;
use crate::error::{ConfigError, TaskError};
use crate::queue::TaskQueue;
use crate::rate_limit;
use crate::task::{Job, guarded};
use crate::yielding::{YieldStrategy, select_strategy};

use serde::Serialize;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use tempo_host::{EventLoop, Task, WeakEventLoop};

/// Counters describing what a scheduler has done so far.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub tasks_run: u64,
    pub tasks_failed: u64,
    pub bursts: u64,
    pub yields: u64,
}

struct Shared {
    host: WeakEventLoop,
    config: SchedulerConfig,
    strategy: Rc<dyn YieldStrategy>,
    queue: TaskQueue,
    draining: Cell<bool>,
    stats: Cell<SchedulerStats>,
}

/// FIFO task scheduler that drains its queue in time-boxed bursts.
///
/// Cloning yields another handle to the same queue, which is how one
/// scheduler is shared across an application. The scheduler is tied to
/// the thread that owns its [`EventLoop`].
///
/// While work is queued, the host loop owns the scheduler through its
/// pending continuation, so dropping every handle does not lose tasks.
/// The scheduler only holds the loop weakly: dropping the loop drops the
/// queued work with it.
#[derive(Clone)]
pub struct TaskScheduler {
    shared: Rc<Shared>,
}

impl TaskScheduler {
    pub fn new(host: &EventLoop) -> Self {
        let config = SchedulerConfig::default();
        let strategy = select_strategy(host, &config);
        Self::build(host, config, strategy)
    }

    pub fn with_config(host: &EventLoop, config: SchedulerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let strategy = select_strategy(host, &config);
        Ok(Self::build(host, config, strategy))
    }

    /// Uses `strategy` instead of detecting one from the host.
    pub fn with_strategy(
        host: &EventLoop,
        config: SchedulerConfig,
        strategy: Rc<dyn YieldStrategy>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(host, config, strategy))
    }

    fn build(host: &EventLoop, config: SchedulerConfig, strategy: Rc<dyn YieldStrategy>) -> Self {
        tracing::info!(
            "TaskScheduler created: strategy={} burst_budget={}ms",
            strategy.name(),
            config.burst_budget_ms
        );
        Self {
            shared: Rc::new(Shared {
                host: host.downgrade(),
                config,
                strategy,
                queue: TaskQueue::new(),
                draining: Cell::new(false),
                stats: Cell::new(SchedulerStats::default()),
            }),
        }
    }

    /// Appends `task` to the queue. The task never runs inside this call.
    pub fn schedule<F>(&self, task: F)
    where
        F: FnOnce() + 'static,
    {
        self.enqueue(Box::new(move || {
            task();
            Ok(())
        }));
    }

    /// Like [`schedule`](TaskScheduler::schedule), but an `Err` is logged and
    /// counted the same way a panic is.
    pub fn schedule_fallible<F, E>(&self, task: F)
    where
        F: FnOnce() -> Result<(), E> + 'static,
        E: fmt::Display,
    {
        self.enqueue(Box::new(move || {
            task().map_err(|err| TaskError::Failed(err.to_string()))
        }));
    }

    /// Applies `processor` to every item, `config().chunk_size` items per
    /// scheduled task.
    pub fn process_in_chunks<T, I, F>(&self, items: I, processor: F) -> Completion
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'static,
        T: 'static,
        F: FnMut(T) + 'static,
    {
        chunked::process_in_chunks(self, items, processor, self.shared.config.chunk_size)
    }

    /// [`rate_limit::debounce_task`] with the configured delay.
    pub fn debounce_task<F>(&self, f: F) -> impl Fn() + use<F>
    where
        F: Fn() + 'static,
    {
        rate_limit::debounce_task(self, f, self.shared.config.debounce_delay())
    }

    /// [`rate_limit::throttle_task`] with the configured limit.
    pub fn throttle_task<F>(&self, f: F) -> impl Fn() + use<F>
    where
        F: Fn() + 'static,
    {
        rate_limit::throttle_task(self, f, self.shared.config.throttle_limit())
    }

    /// The loop this scheduler submits to, unless it has been dropped.
    pub fn host(&self) -> Option<EventLoop> {
        self.shared.host.upgrade()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    pub fn strategy_name(&self) -> &'static str {
        self.shared.strategy.name()
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    /// True when no drain loop is active and nothing is queued.
    pub fn is_idle(&self) -> bool {
        !self.shared.draining.get() && self.shared.queue.is_empty()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.shared.stats.get()
    }

    fn enqueue(&self, job: Job) {
        let Some(host) = self.shared.host.upgrade() else {
            tracing::warn!("host loop dropped, discarding scheduled task");
            return;
        };
        self.shared.queue.push(job);

        if !self.shared.draining.replace(true) {
            tracing::debug!("drain loop started");
            host.queue_microtask(self.continuation());
        }
    }

    /// The next burst, as a task for the host loop.
    fn continuation(&self) -> Task {
        let burst = Continuation(Some(self.clone()));
        Box::new(move || burst.run())
    }

    /// One burst of the drain loop.
    ///
    /// Only tasks queued when the burst starts are eligible; anything they
    /// enqueue waits for a later burst. The budget is checked between
    /// tasks, so a slow task can overrun it but never gets preempted.
    fn run_tasks(&self) {
        let shared = &self.shared;
        // Bursts only run from inside a turn of the loop.
        let Some(host) = shared.host.upgrade() else {
            return;
        };
        let budget = shared.config.burst_budget();
        let start = host.now();
        let eligible = shared.queue.len();

        let mut ran = 0;
        while ran < eligible && host.now().saturating_sub(start) < budget {
            let Some(job) = shared.queue.pop() else {
                break;
            };
            ran += 1;
            self.execute(job);
        }

        let remaining = shared.queue.len();
        self.update_stats(|stats| stats.bursts += 1);
        tracing::trace!(
            "burst ran {} tasks in {:?}, {} remaining",
            ran,
            host.now().saturating_sub(start),
            remaining
        );

        if remaining == 0 {
            shared.draining.set(false);
            tracing::debug!("drain loop idle");
            return;
        }

        self.update_stats(|stats| stats.yields += 1);
        shared.strategy.yield_then(self.continuation());
    }

    fn execute(&self, job: Job) {
        let outcome = guarded(job);
        self.update_stats(|stats| {
            stats.tasks_run += 1;
            if outcome.is_err() {
                stats.tasks_failed += 1;
            }
        });
        if let Err(err) = outcome {
            tracing::warn!("scheduled task did not complete: {}", err);
        }
    }

    fn update_stats(&self, f: impl FnOnce(&mut SchedulerStats)) {
        let mut stats = self.shared.stats.get();
        f(&mut stats);
        self.shared.stats.set(stats);
    }
}

/// A pending burst owned by the host loop. It holds a handle, so the
/// scheduler lives at least until its queue is empty.
///
/// Dropped without running means the loop went away. The queue is cleared
/// then, so tasks that captured a handle cannot keep the scheduler alive.
struct Continuation(Option<TaskScheduler>);

impl Continuation {
    fn run(mut self) {
        if let Some(scheduler) = self.0.take() {
            scheduler.run_tasks();
        }
    }
}

impl Drop for Continuation {
    fn drop(&mut self) {
        if let Some(scheduler) = self.0.take() {
            let discarded = scheduler.shared.queue.clear();
            scheduler.shared.draining.set(false);
            tracing::warn!("host loop dropped with {} tasks queued", discarded);
        }
    }
}

impl fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("strategy", &self.strategy_name())
            .field("pending", &self.pending())
            .field("draining", &self.shared.draining.get())
            .field("stats", &self.stats())
            .finish()
    }
}
