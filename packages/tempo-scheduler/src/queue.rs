use crate::task::Job;
use std::cell::RefCell;
use std::collections::VecDeque;

/// FIFO of pending jobs.
/// The scheduler is single-threaded, so a RefCell<VecDeque> is enough.
#[derive(Default)]
pub(crate) struct TaskQueue {
    queue: RefCell<VecDeque<Job>>,
}

impl TaskQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, job: Job) {
        self.queue.borrow_mut().push_back(job);
    }

    /// Pops the head. The borrow ends before the caller runs the job, so
    /// jobs may push more work while they execute.
    pub(crate) fn pop(&self) -> Option<Job> {
        self.queue.borrow_mut().pop_front()
    }

    /// Empties the queue. The jobs are dropped after the borrow ends, since
    /// dropping one may release the last handle to something that borrows
    /// the queue again.
    pub(crate) fn clear(&self) -> usize {
        let jobs = std::mem::take(&mut *self.queue.borrow_mut());
        jobs.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}
