#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tempo_host::{EventLoop, ManualClock, Task};
use tempo_scheduler::{MessageYield, SchedulerConfig, TaskScheduler, YieldStrategy};

/// Counts yields before forwarding them to a message post.
pub struct SpyYield {
    inner: MessageYield,
    pub calls: Rc<Cell<usize>>,
}

impl YieldStrategy for SpyYield {
    fn name(&self) -> &'static str {
        "spy"
    }

    fn yield_then(&self, resume: Task) {
        self.calls.set(self.calls.get() + 1);
        self.inner.yield_then(resume);
    }
}

pub struct Harness {
    pub event_loop: EventLoop,
    pub clock: Rc<ManualClock>,
    pub scheduler: TaskScheduler,
    pub yields: Rc<Cell<usize>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        let clock = Rc::new(ManualClock::new());
        let event_loop = EventLoop::builder().clock(clock.clone()).build();
        let yields = Rc::new(Cell::new(0));
        let spy = SpyYield {
            inner: MessageYield::new(&event_loop),
            calls: yields.clone(),
        };
        let scheduler = TaskScheduler::with_strategy(&event_loop, config, Rc::new(spy)).unwrap();
        Self {
            event_loop,
            clock,
            scheduler,
            yields,
        }
    }

    /// Schedules a task that takes `cost` of (simulated) time.
    pub fn schedule_costly(&self, cost: Duration, log: &Rc<RefCell<Vec<usize>>>, id: usize) {
        let clock = self.clock.clone();
        let log = log.clone();
        self.scheduler.schedule(move || {
            clock.advance(cost);
            log.borrow_mut().push(id);
        });
    }
}
