//! The reader side of a scan: drains a line source into the queue

use std::io;

use crate::queue::{BoundedQueue, PushError};
use crate::source::LineSource;

/// What the reader did before it stopped
#[derive(Debug, Default)]
pub struct ProducerOutcome {
    /// Lines pulled from the source
    pub lines_read: u64,
    /// Lines handed to the queue
    pub produced: u64,
    /// Empty lines that were not queued
    pub skipped_empty: u64,
    /// Stopped because the run was cancelled
    pub cancelled: bool,
    /// The source failed mid-stream
    pub error: Option<io::Error>,
}

/// Signals end of stream when the reader exits, however it exits
struct EndOfStream<'a, T>(&'a BoundedQueue<T>);

impl<T> Drop for EndOfStream<'_, T> {
    fn drop(&mut self) {
        self.0.signal_end_of_stream();
    }
}

/// Read `source` to the end, pushing every non-empty line into `queue`
///
/// Stops early on a read error or when the run is cancelled. End of
/// stream is signalled exactly once on every path so that workers
/// always get released.
pub fn produce<S>(mut source: S, queue: &BoundedQueue<String>) -> ProducerOutcome
where
    S: LineSource,
{
    let _eos = EndOfStream(queue);
    let mut outcome = ProducerOutcome::default();

    loop {
        if queue.is_cancelled() {
            outcome.cancelled = true;
            break;
        }

        let line = match source.next_line() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                tracing::warn!("Read failed after {} lines: {}", outcome.lines_read, e);
                outcome.error = Some(e);
                break;
            }
            None => break,
        };
        outcome.lines_read += 1;

        if line.is_empty() {
            outcome.skipped_empty += 1;
            continue;
        }

        match queue.push(line) {
            Ok(()) => outcome.produced += 1,
            Err(PushError::Cancelled) => {
                tracing::debug!("Dropped line {} on cancellation", outcome.lines_read);
                outcome.cancelled = true;
                break;
            }
            Err(PushError::Closed) => {
                tracing::warn!("Queue closed before the source was drained");
                break;
            }
        }
    }

    tracing::debug!(
        "Reader finished: {} read, {} queued, cancelled={}",
        outcome.lines_read,
        outcome.produced,
        outcome.cancelled
    );

    outcome
}
