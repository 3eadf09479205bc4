//! A single-threaded event loop modelled on the browser host.
//!
//! The loop owns a microtask queue, a prioritized post-task queue, a plain
//! message queue, timers and idle callbacks. Schedulers built on top of it
//! hand work back to the loop instead of running it to completion.

pub mod clock;
pub mod event_loop;
mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use event_loop::{
    Capabilities, EventLoop, EventLoopBuilder, HostError, Priority, Rejected, TimerId,
    WeakEventLoop,
};

/// A zero-argument unit of work owned by whichever queue holds it.
pub type Task = Box<dyn FnOnce() + 'static>;
