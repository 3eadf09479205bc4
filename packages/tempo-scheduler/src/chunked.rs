//! Walking a large collection a few items per scheduled task.

use crate::error::SchedulerError;
use crate::scheduler::TaskScheduler;
use crate::task::guarded;

use futures::channel::oneshot;
use std::future::Future;
use std::iter::Peekable;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Outcome of a finished [`process_in_chunks`] run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChunkReport {
    /// Items handed to the processor, including the ones that failed.
    pub processed: usize,
    /// Items whose processor call panicked.
    pub failed: usize,
    pub chunks: usize,
}

/// Completion signal for [`process_in_chunks`].
///
/// Resolves once every item has been processed. Can be awaited, or
/// checked with [`try_report`](Completion::try_report) after driving the
/// host loop.
pub struct Completion {
    rx: oneshot::Receiver<ChunkReport>,
    report: Option<ChunkReport>,
}

impl Completion {
    fn new(rx: oneshot::Receiver<ChunkReport>) -> Self {
        Self { rx, report: None }
    }

    pub fn try_report(&mut self) -> Option<ChunkReport> {
        if self.report.is_none() {
            if let Ok(Some(report)) = self.rx.try_recv() {
                self.report = Some(report);
            }
        }
        self.report
    }

    pub fn is_complete(&mut self) -> bool {
        self.try_report().is_some()
    }
}

impl Future for Completion {
    type Output = Result<ChunkReport, SchedulerError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(report) = this.report {
            return Poll::Ready(Ok(report));
        }

        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(report)) => {
                this.report = Some(report);
                Poll::Ready(Ok(report))
            }
            Poll::Ready(Err(_canceled)) => Poll::Ready(Err(SchedulerError::Abandoned)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Applies `processor` to `items` in order, `chunk_size` items per task
/// submitted to `scheduler`.
///
/// Each chunk runs synchronously inside one scheduled task; the next chunk
/// is scheduled when it finishes. A panic on one item is logged and
/// counted, and the rest of the chunk still runs. Empty input completes
/// immediately without scheduling anything. A `chunk_size` of zero is
/// treated as one.
pub fn process_in_chunks<T, I, F>(
    scheduler: &TaskScheduler,
    items: I,
    processor: F,
    chunk_size: usize,
) -> Completion
where
    I: IntoIterator<Item = T>,
    I::IntoIter: 'static,
    T: 'static,
    F: FnMut(T) + 'static,
{
    let (tx, rx) = oneshot::channel();
    let mut items = items.into_iter().peekable();

    if items.peek().is_none() {
        let _ = tx.send(ChunkReport::default());
        return Completion::new(rx);
    }

    ChunkRun {
        scheduler: scheduler.clone(),
        items,
        processor,
        chunk_size: chunk_size.max(1),
        report: ChunkReport::default(),
        done: tx,
    }
    .schedule_next();

    Completion::new(rx)
}

struct ChunkRun<It: Iterator, F> {
    scheduler: TaskScheduler,
    items: Peekable<It>,
    processor: F,
    chunk_size: usize,
    report: ChunkReport,
    done: oneshot::Sender<ChunkReport>,
}

impl<T, It, F> ChunkRun<It, F>
where
    It: Iterator<Item = T> + 'static,
    T: 'static,
    F: FnMut(T) + 'static,
{
    /// The queued chunk owns the run. If the host loop is dropped first,
    /// the sender goes with it and the completion reports abandonment.
    fn schedule_next(self) {
        let scheduler = self.scheduler.clone();
        scheduler.schedule(move || self.process_chunk());
    }

    fn process_chunk(mut self) {
        let chunk_size = self.chunk_size;
        for item in self.items.by_ref().take(chunk_size) {
            let index = self.report.processed;
            self.report.processed += 1;

            let processor = &mut self.processor;
            if let Err(err) = guarded(|| {
                processor(item);
                Ok(())
            }) {
                self.report.failed += 1;
                tracing::warn!("chunked item {} failed: {}", index, err);
            }
        }
        self.report.chunks += 1;

        if self.items.peek().is_some() {
            self.schedule_next();
            return;
        }

        tracing::debug!(
            "chunked processing finished: {} items in {} chunks, {} failed",
            self.report.processed,
            self.report.chunks,
            self.report.failed
        );
        // The receiver may already be gone; nobody is waiting then.
        let _ = self.done.send(self.report);
    }
}
