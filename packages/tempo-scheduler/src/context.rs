//! Per-thread "current scheduler", for code that cannot take a handle as a
//! parameter.
//!
//! Nothing is installed implicitly: a scheduler becomes current only
//! inside [`enter`], and the previous one is restored afterwards.

use crate::error::SchedulerError;
use crate::scheduler::TaskScheduler;
use std::cell::RefCell;

thread_local! {
    static CURRENT: RefCell<Option<TaskScheduler>> = const { RefCell::new(None) };
}

struct Restore(Option<TaskScheduler>);

impl Drop for Restore {
    fn drop(&mut self) {
        let previous = self.0.take();
        let _ = CURRENT.try_with(|current| current.replace(previous));
    }
}

/// Makes `scheduler` current for the duration of `f`.
pub fn enter<R>(scheduler: &TaskScheduler, f: impl FnOnce() -> R) -> R {
    let previous = CURRENT.with(|current| current.replace(Some(scheduler.clone())));
    let _restore = Restore(previous);
    f()
}

pub fn current() -> Result<TaskScheduler, SchedulerError> {
    CURRENT
        .with(|current| current.borrow().clone())
        .ok_or(SchedulerError::NoScheduler)
}

/// Schedules `task` on the current scheduler.
pub fn schedule<F>(task: F) -> Result<(), SchedulerError>
where
    F: FnOnce() + 'static,
{
    current()?.schedule(task);
    Ok(())
}
