//! Debounce and throttle wrappers that submit through a [`TaskScheduler`].
//!
//! Both use host timers for their windows; the wrapped function itself
//! always runs as a scheduled task, never directly from the caller.

use crate::scheduler::TaskScheduler;

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use tempo_host::TimerId;

struct DebounceInner<A> {
    scheduler: TaskScheduler,
    f: Rc<dyn Fn(A)>,
    delay: Duration,
    timer: Cell<Option<TimerId>>,
}

/// Runs `f` once calls stop arriving for `delay`, with the arguments of
/// the last call.
pub struct Debounced<A> {
    inner: Rc<DebounceInner<A>>,
}

impl<A> Clone for Debounced<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: 'static> Debounced<A> {
    pub fn new<F>(scheduler: &TaskScheduler, delay: Duration, f: F) -> Self
    where
        F: Fn(A) + 'static,
    {
        Self {
            inner: Rc::new(DebounceInner {
                scheduler: scheduler.clone(),
                f: Rc::new(f),
                delay,
                timer: Cell::new(None),
            }),
        }
    }

    /// Restarts the quiet window. Earlier arguments are discarded.
    pub fn call(&self, args: A) {
        let Some(host) = self.inner.scheduler.host() else {
            tracing::debug!("debounced call after the host loop was dropped");
            return;
        };
        if let Some(previous) = self.inner.timer.take() {
            host.clear_timeout(previous);
        }

        let inner = self.inner.clone();
        let id = host.set_timeout(
            self.inner.delay,
            Box::new(move || {
                inner.timer.set(None);
                let f = inner.f.clone();
                inner.scheduler.schedule(move || f(args));
            }),
        );
        self.inner.timer.set(Some(id));
    }

    /// Drops the pending trigger, if any. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        match (self.inner.timer.take(), self.inner.scheduler.host()) {
            (Some(id), Some(host)) => host.clear_timeout(id),
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.inner.timer.get().is_some()
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }
}

struct ThrottleInner<A> {
    scheduler: TaskScheduler,
    f: Rc<dyn Fn(A)>,
    limit: Duration,
    cooling_down: Cell<bool>,
}

/// Runs `f` at most once per `limit`. Calls during the cooldown are
/// dropped; there is no trailing call.
pub struct Throttled<A> {
    inner: Rc<ThrottleInner<A>>,
}

impl<A> Clone for Throttled<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: 'static> Throttled<A> {
    pub fn new<F>(scheduler: &TaskScheduler, limit: Duration, f: F) -> Self
    where
        F: Fn(A) + 'static,
    {
        Self {
            inner: Rc::new(ThrottleInner {
                scheduler: scheduler.clone(),
                f: Rc::new(f),
                limit,
                cooling_down: Cell::new(false),
            }),
        }
    }

    /// Submits `f(args)` unless a cooldown is running. Returns whether the
    /// call was accepted.
    pub fn call(&self, args: A) -> bool {
        let Some(host) = self.inner.scheduler.host() else {
            tracing::debug!("throttled call after the host loop was dropped");
            return false;
        };
        if self.inner.cooling_down.replace(true) {
            tracing::trace!("throttled call dropped");
            return false;
        }

        let f = self.inner.f.clone();
        self.inner.scheduler.schedule(move || f(args));

        let inner = self.inner.clone();
        host.set_timeout(
            self.inner.limit,
            Box::new(move || inner.cooling_down.set(false)),
        );
        true
    }

    pub fn is_cooling_down(&self) -> bool {
        self.inner.cooling_down.get()
    }

    pub fn limit(&self) -> Duration {
        self.inner.limit
    }
}

/// Zero-argument debounce: the returned trigger runs `f` through
/// `scheduler` once it has not been called for `delay`.
pub fn debounce_task<F>(scheduler: &TaskScheduler, f: F, delay: Duration) -> impl Fn() + use<F>
where
    F: Fn() + 'static,
{
    let debounced = Debounced::new(scheduler, delay, move |()| f());
    move || debounced.call(())
}

/// Zero-argument throttle: the returned trigger runs `f` through
/// `scheduler` at most once per `limit`.
pub fn throttle_task<F>(scheduler: &TaskScheduler, f: F, limit: Duration) -> impl Fn() + use<F>
where
    F: Fn() + 'static,
{
    let throttled = Throttled::new(scheduler, limit, move |()| f());
    move || {
        throttled.call(());
    }
}
