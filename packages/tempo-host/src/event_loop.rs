use crate::Task;
use crate::clock::{Clock, SystemClock};
use crate::timer::TimerEntry;

use slotmap::{SlotMap, new_key_type};
use std::cell::{Cell, RefCell};
use std::collections::{BinaryHeap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;
use thiserror::Error;

new_key_type! {
    pub struct TimerId;
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HostError {
    #[error("host facility `{0}` is not available")]
    Unsupported(&'static str),
}

/// A submission the host refused. The task is handed back untouched so the
/// caller can route it elsewhere.
pub struct Rejected {
    pub error: HostError,
    pub task: Task,
}

impl fmt::Debug for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected").field("error", &self.error).finish()
    }
}

/// Priority of work submitted through [`EventLoop::post_task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    UserBlocking,
    UserVisible,
    Background,
}

impl Priority {
    fn index(self) -> usize {
        match self {
            Priority::UserBlocking => 0,
            Priority::UserVisible => 1,
            Priority::Background => 2,
        }
    }
}

/// Optional scheduling facilities a host may expose.
///
/// Microtasks, messages and timers are always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub post_task: bool,
    pub idle_callback: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            post_task: true,
            idle_callback: true,
        }
    }
}

struct IdleCallback {
    /// Point at which the callback runs even if the loop never goes idle.
    deadline: Duration,
    task: Task,
}

#[derive(Default)]
struct Queues {
    microtasks: VecDeque<Task>,
    prioritized: [VecDeque<Task>; 3],
    messages: VecDeque<Task>,
    idle: VecDeque<IdleCallback>,
    timers: SlotMap<TimerId, Task>,
    timer_heap: BinaryHeap<TimerEntry>,
    timer_seq: u64,
}

impl Queues {
    /// Drops heap entries whose timer was cleared.
    fn prune_cancelled(&mut self) {
        while let Some(top) = self.timer_heap.peek() {
            if self.timers.contains_key(top.id) {
                break;
            }
            self.timer_heap.pop();
        }
    }

    fn next_deadline(&mut self) -> Option<Duration> {
        self.prune_cancelled();
        self.timer_heap.peek().map(|entry| entry.deadline)
    }

    fn pop_due_timer(&mut self, now: Duration) -> Option<Task> {
        match self.next_deadline() {
            Some(deadline) if deadline <= now => {
                let entry = self.timer_heap.pop()?;
                self.timers.remove(entry.id)
            }
            _ => None,
        }
    }

    fn pop_expired_idle(&mut self, now: Duration) -> Option<Task> {
        let position = self.idle.iter().position(|cb| cb.deadline <= now)?;
        self.idle.remove(position).map(|cb| cb.task)
    }

    fn is_empty(&self) -> bool {
        self.microtasks.is_empty()
            && self.prioritized.iter().all(VecDeque::is_empty)
            && self.messages.is_empty()
            && self.idle.is_empty()
            && self.timers.is_empty()
    }
}

enum Next {
    Ready(Task),
    Wait(Duration),
    Empty,
}

struct Inner {
    clock: Rc<dyn Clock>,
    capabilities: Capabilities,
    queues: RefCell<Queues>,
    macrotasks_run: Cell<u64>,
}

/// Handle to a single-threaded event loop.
///
/// Clones share the same queues. Nothing runs until the owner drives the
/// loop with [`turn`](EventLoop::turn) or one of the `run_*` methods.
#[derive(Clone)]
pub struct EventLoop {
    inner: Rc<Inner>,
}

/// Handle that does not keep the loop alive.
///
/// Dropping the last [`EventLoop`] drops every queued task, including the
/// ones that hold a `WeakEventLoop`.
#[derive(Clone)]
pub struct WeakEventLoop {
    inner: Weak<Inner>,
}

impl WeakEventLoop {
    pub fn upgrade(&self) -> Option<EventLoop> {
        self.inner.upgrade().map(|inner| EventLoop { inner })
    }
}

pub struct EventLoopBuilder {
    clock: Option<Rc<dyn Clock>>,
    capabilities: Capabilities,
}

impl EventLoopBuilder {
    pub fn clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Whether the prioritized post-task queue is exposed.
    pub fn post_task(mut self, enabled: bool) -> Self {
        self.capabilities.post_task = enabled;
        self
    }

    /// Whether idle callbacks are exposed.
    pub fn idle_callback(mut self, enabled: bool) -> Self {
        self.capabilities.idle_callback = enabled;
        self
    }

    pub fn build(self) -> EventLoop {
        let clock = self
            .clock
            .unwrap_or_else(|| Rc::new(SystemClock::new()) as Rc<dyn Clock>);

        EventLoop {
            inner: Rc::new(Inner {
                clock,
                capabilities: self.capabilities,
                queues: RefCell::new(Queues::default()),
                macrotasks_run: Cell::new(0),
            }),
        }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    /// A loop on the system clock with every facility available.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> EventLoopBuilder {
        EventLoopBuilder {
            clock: None,
            capabilities: Capabilities::default(),
        }
    }

    pub fn downgrade(&self) -> WeakEventLoop {
        WeakEventLoop {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.inner.capabilities
    }

    pub fn now(&self) -> Duration {
        self.inner.clock.now()
    }

    /// Total number of macrotasks executed so far.
    pub fn macrotasks_run(&self) -> u64 {
        self.inner.macrotasks_run.get()
    }

    /// Whether any work (including future timers) is still registered.
    pub fn pending(&self) -> bool {
        !self.inner.queues.borrow().is_empty()
    }

    /// Runs `task` at the next microtask checkpoint, ahead of any macrotask.
    pub fn queue_microtask(&self, task: Task) {
        self.inner.queues.borrow_mut().microtasks.push_back(task);
    }

    pub fn post_task(&self, priority: Priority, task: Task) -> Result<(), Rejected> {
        if !self.inner.capabilities.post_task {
            return Err(Rejected {
                error: HostError::Unsupported("post_task"),
                task,
            });
        }
        self.inner.queues.borrow_mut().prioritized[priority.index()].push_back(task);
        Ok(())
    }

    /// Runs `task` once the loop has nothing else to do, or once `timeout`
    /// has elapsed, whichever comes first.
    pub fn request_idle_callback(&self, task: Task, timeout: Duration) -> Result<(), Rejected> {
        if !self.inner.capabilities.idle_callback {
            return Err(Rejected {
                error: HostError::Unsupported("request_idle_callback"),
                task,
            });
        }
        let deadline = self.now() + timeout;
        self.inner
            .queues
            .borrow_mut()
            .idle
            .push_back(IdleCallback { deadline, task });
        Ok(())
    }

    pub fn post_message(&self, task: Task) {
        self.inner.queues.borrow_mut().messages.push_back(task);
    }

    pub fn set_timeout(&self, delay: Duration, task: Task) -> TimerId {
        let deadline = self.now() + delay;
        let mut queues = self.inner.queues.borrow_mut();
        let id = queues.timers.insert(task);
        let seq = queues.timer_seq;
        queues.timer_seq += 1;
        queues.timer_heap.push(TimerEntry { deadline, seq, id });
        id
    }

    /// Cancels a timer. Returns `false` if it already fired or was cleared.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        self.inner.queues.borrow_mut().timers.remove(id).is_some()
    }

    /// Runs one unit of work.
    ///
    /// Pending microtasks are drained first. Otherwise a single macrotask
    /// is picked (due timer, post-task, expired idle callback, message,
    /// idle callback) and followed by a microtask checkpoint. If only
    /// future timers remain, the loop waits for the earliest one.
    /// Returns `false` once nothing is left.
    pub fn turn(&self) -> bool {
        self.step(None)
    }

    /// Turns until every queue and timer is exhausted.
    /// Returns the number of turns taken.
    pub fn run_until_idle(&self) -> usize {
        let mut turns = 0;
        while self.step(None) {
            turns += 1;
        }
        turns
    }

    /// Like [`run_until_idle`](EventLoop::run_until_idle), but never waits
    /// for a timer due after `deadline`.
    pub fn run_until(&self, deadline: Duration) -> usize {
        let mut turns = 0;
        while self.step(Some(deadline)) {
            turns += 1;
        }
        turns
    }

    fn step(&self, limit: Option<Duration>) -> bool {
        if self.has_microtasks() {
            self.run_microtasks();
            return true;
        }

        loop {
            match self.next_macrotask() {
                Next::Ready(task) => {
                    task();
                    self.inner
                        .macrotasks_run
                        .set(self.inner.macrotasks_run.get() + 1);
                    self.run_microtasks();
                    return true;
                }
                Next::Wait(deadline) => {
                    if limit.is_some_and(|limit| deadline > limit) {
                        return false;
                    }
                    tracing::trace!("event loop waiting for timer at {:?}", deadline);
                    self.inner.clock.sleep_until(deadline);
                }
                Next::Empty => return false,
            }
        }
    }

    fn next_macrotask(&self) -> Next {
        let now = self.now();
        let mut queues = self.inner.queues.borrow_mut();

        if let Some(task) = queues.pop_due_timer(now) {
            return Next::Ready(task);
        }
        for queue in queues.prioritized.iter_mut() {
            if let Some(task) = queue.pop_front() {
                return Next::Ready(task);
            }
        }
        if let Some(task) = queues.pop_expired_idle(now) {
            return Next::Ready(task);
        }
        if let Some(task) = queues.messages.pop_front() {
            return Next::Ready(task);
        }
        if let Some(cb) = queues.idle.pop_front() {
            return Next::Ready(cb.task);
        }

        match queues.next_deadline() {
            Some(deadline) => Next::Wait(deadline),
            None => Next::Empty,
        }
    }

    fn has_microtasks(&self) -> bool {
        !self.inner.queues.borrow().microtasks.is_empty()
    }

    fn run_microtasks(&self) {
        loop {
            // The borrow must end before the task runs; tasks may enqueue more.
            let next = self.inner.queues.borrow_mut().microtasks.pop_front();
            match next {
                Some(task) => task(),
                None => break,
            }
        }
    }
}
