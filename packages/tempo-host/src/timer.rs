use crate::event_loop::TimerId;
use std::cmp::Ordering;
use std::time::Duration;

/// An entry in the timer heap.
///
/// The task itself lives in the loop's slot map under `id`; clearing a
/// timer removes the slot and leaves this entry behind to be skipped.
pub(crate) struct TimerEntry {
    pub(crate) deadline: Duration,
    /// Registration order, breaks ties between equal deadlines.
    pub(crate) seq: u64,
    pub(crate) id: TimerId,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Ord for TimerEntry {
    /// Reversed so that `BinaryHeap<TimerEntry>` pops the earliest deadline first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
