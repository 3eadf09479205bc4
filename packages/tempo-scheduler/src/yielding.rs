//! Ways of handing control back to the host loop between bursts.
//!
//! A strategy is chosen once, when the scheduler is built, from the
//! facilities the [`EventLoop`] advertises. The message-post strategy needs
//! nothing beyond the loop itself and is always available.
//!
//! Strategies hold weak host handles: a yield after the loop is gone has
//! nowhere to resume, and `resume` is dropped with it.

use crate::config::SchedulerConfig;
use std::rc::Rc;
use std::time::Duration;
use tempo_host::{EventLoop, Priority, Rejected, Task, WeakEventLoop};

/// Gives the host loop a chance to run other pending work, then resumes.
///
/// `resume` must never be invoked from inside `yield_then`; it always runs
/// on a later turn of the loop.
pub trait YieldStrategy {
    fn name(&self) -> &'static str;

    fn yield_then(&self, resume: Task);
}

/// Resumes through the host's prioritized task queue at user-blocking priority.
pub struct PostTaskYield {
    host: WeakEventLoop,
}

impl PostTaskYield {
    pub fn detect(host: &EventLoop) -> Option<Self> {
        host.capabilities().post_task.then(|| Self {
            host: host.downgrade(),
        })
    }
}

impl YieldStrategy for PostTaskYield {
    fn name(&self) -> &'static str {
        "post_task"
    }

    fn yield_then(&self, resume: Task) {
        let Some(host) = self.host.upgrade() else {
            return host_gone(self.name());
        };
        if let Err(rejected) = host.post_task(Priority::UserBlocking, resume) {
            fall_back(&host, rejected);
        }
    }
}

/// Resumes from an idle callback, bounded by a timeout so constant load
/// cannot starve the scheduler.
pub struct IdleYield {
    host: WeakEventLoop,
    timeout: Duration,
}

impl IdleYield {
    pub fn detect(host: &EventLoop, timeout: Duration) -> Option<Self> {
        host.capabilities().idle_callback.then(|| Self {
            host: host.downgrade(),
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl YieldStrategy for IdleYield {
    fn name(&self) -> &'static str {
        "idle_callback"
    }

    fn yield_then(&self, resume: Task) {
        let Some(host) = self.host.upgrade() else {
            return host_gone(self.name());
        };
        if let Err(rejected) = host.request_idle_callback(resume, self.timeout) {
            fall_back(&host, rejected);
        }
    }
}

/// Resumes by posting a message to the loop itself.
pub struct MessageYield {
    host: WeakEventLoop,
}

impl MessageYield {
    pub fn new(host: &EventLoop) -> Self {
        Self {
            host: host.downgrade(),
        }
    }
}

impl YieldStrategy for MessageYield {
    fn name(&self) -> &'static str {
        "message"
    }

    fn yield_then(&self, resume: Task) {
        match self.host.upgrade() {
            Some(host) => host.post_message(resume),
            None => host_gone(self.name()),
        }
    }
}

fn fall_back(host: &EventLoop, rejected: Rejected) {
    tracing::debug!("{}, resuming through a message post", rejected.error);
    host.post_message(rejected.task);
}

fn host_gone(strategy: &str) {
    tracing::debug!("{} yield after the host loop was dropped", strategy);
}

/// Picks the best strategy the host supports: post-task, then idle
/// callback, then message post.
pub fn select_strategy(host: &EventLoop, config: &SchedulerConfig) -> Rc<dyn YieldStrategy> {
    if let Some(strategy) = PostTaskYield::detect(host) {
        return Rc::new(strategy);
    }
    if let Some(strategy) = IdleYield::detect(host, config.idle_timeout()) {
        return Rc::new(strategy);
    }
    Rc::new(MessageYield::new(host))
}
