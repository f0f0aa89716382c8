//! Run coordinator: one reader thread, a fixed pool of workers, and a
//! one-shot rendezvous where worker 0 aggregates the results

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Instant;

use crate::cancel::ShutdownHandle;
use crate::config::ScanConfig;
use crate::error::{LinehuntError, Result};
use crate::predicate::{Predicate, Substring};
use crate::producer::{produce, ProducerOutcome};
use crate::queue::BoundedQueue;
use crate::rendezvous::{Arrival, Rendezvous};
use crate::report::{ResultSink, ScanReport, Tally};
use crate::source::LineSource;
use crate::worker::{consume, ResultSlots};

/// Index of the worker that aggregates and reports
pub const AGGREGATOR: usize = 0;

/// A single scan run
///
/// Everything the run needs is allocated up front by [`Scan::new`];
/// running consumes the scan, so the queue and rendezvous are never
/// reused.
pub struct Scan {
    config: ScanConfig,
    queue: Arc<BoundedQueue<String>>,
    slots: ResultSlots,
    rendezvous: Rendezvous,
}

/// Shared state borrowed by every worker thread
struct WorkerCtx<'a, P: ?Sized, K: ?Sized> {
    queue: &'a BoundedQueue<String>,
    predicate: &'a P,
    slots: &'a ResultSlots,
    rendezvous: &'a Rendezvous,
    sink: &'a K,
    live: &'a AtomicUsize,
    aggregate: &'a OnceLock<Tally>,
}

impl Scan {
    /// Validate the config and allocate the queue, result slots and
    /// rendezvous for one run
    pub fn new(config: ScanConfig) -> Result<Self> {
        config.validate()?;

        let queue = Arc::new(BoundedQueue::with_capacity(config.capacity)?);
        let slots = ResultSlots::new(config.workers)?;
        let rendezvous = Rendezvous::new(config.workers);

        Ok(Self {
            config,
            queue,
            slots,
            rendezvous,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Handle for requesting shutdown from another thread or a signal
    /// handler
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle::new(Arc::clone(&self.queue))
    }

    /// Scan `source` for the configured term
    pub fn run<S, K>(self, source: S, sink: &K) -> Result<ScanReport>
    where
        S: LineSource + Send,
        K: ResultSink + ?Sized,
    {
        let predicate = if self.config.ignore_case {
            Substring::ignore_case(self.config.term.clone())
        } else {
            Substring::new(self.config.term.clone())
        };
        self.run_with(source, &predicate, sink)
    }

    /// Scan `source` with a custom predicate
    pub fn run_with<S, P, K>(self, source: S, predicate: &P, sink: &K) -> Result<ScanReport>
    where
        S: LineSource + Send,
        P: Predicate + ?Sized,
        K: ResultSink + ?Sized,
    {
        let start = Instant::now();
        let Scan {
            config,
            queue,
            slots,
            rendezvous,
        } = self;

        tracing::debug!(
            "Starting scan: capacity={}, workers={}, term={:?}",
            config.capacity,
            config.workers,
            config.term
        );

        let live = AtomicUsize::new(config.workers);
        let aggregate = OnceLock::new();
        let ctx = WorkerCtx {
            queue: &queue,
            predicate,
            slots: &slots,
            rendezvous: &rendezvous,
            sink,
            live: &live,
            aggregate: &aggregate,
        };

        let outcome = thread::scope(|s| -> Result<ProducerOutcome> {
            let ctx = &ctx;
            let mut workers = Vec::with_capacity(config.workers);

            for index in 0..config.workers {
                let spawned = thread::Builder::new()
                    .name(format!("linehunt-worker-{}", index))
                    .spawn_scoped(s, move || run_worker(index, ctx));

                match spawned {
                    Ok(handle) => workers.push(handle),
                    Err(e) => {
                        abandon(ctx.queue, ctx.rendezvous);
                        return Err(LinehuntError::resource_init(format!("worker {}", index), e));
                    }
                }
            }

            let queue = ctx.queue;
            let reader = thread::Builder::new()
                .name("linehunt-reader".to_string())
                .spawn_scoped(s, move || produce(source, queue));

            let reader = match reader {
                Ok(handle) => handle,
                Err(e) => {
                    abandon(ctx.queue, ctx.rendezvous);
                    return Err(LinehuntError::resource_init("reader", e));
                }
            };

            let outcome = reader.join().unwrap_or_else(|_| {
                tracing::error!("Reader thread panicked");
                ProducerOutcome {
                    error: Some(io::Error::new(io::ErrorKind::Other, "line source panicked")),
                    ..ProducerOutcome::default()
                }
            });
            tracing::debug!("Draining: end of stream reached, waiting for workers");

            for (index, handle) in workers.into_iter().enumerate() {
                if handle.join().is_err() {
                    tracing::error!("Worker {} thread panicked", index);
                }
            }

            Ok(outcome)
        })?;

        if let Some(error) = &outcome.error {
            sink.source_failed(error);
        }

        // The aggregator only misses this if its thread died inside the sink
        let tally = aggregate.into_inner().unwrap_or_else(|| slots.aggregate());
        let cancelled = queue.is_cancelled();

        tracing::debug!(
            "Scan done: {} matches, {} lines queued, cancelled={}",
            tally.total,
            outcome.produced,
            cancelled
        );

        Ok(ScanReport {
            tally,
            lines_read: outcome.lines_read,
            produced: outcome.produced,
            cancelled,
            source_error: outcome.error.map(|e| e.to_string()),
            elapsed_ms: start.elapsed().as_millis() as u64,
            finished_at: chrono::Utc::now(),
        })
    }
}

/// Body of each worker thread
fn run_worker<P, K>(index: usize, ctx: &WorkerCtx<'_, P, K>)
where
    P: Predicate + ?Sized,
    K: ResultSink + ?Sized,
{
    let tally = consume(index, ctx.queue, ctx.predicate);
    ctx.slots.record(tally);

    // If the last worker leaves an open, uncancelled stream, every worker
    // failed; cancel so the reader is not left blocked on a full queue.
    if ctx.live.fetch_sub(1, Ordering::AcqRel) == 1 && input_abandoned(ctx.queue) {
        tracing::warn!("All workers stopped before the input was drained");
        ctx.queue.cancel();
    }

    match ctx.rendezvous.wait() {
        Arrival::Complete if index == AGGREGATOR => {
            let tally = ctx.slots.aggregate();
            ctx.sink.report(&tally);
            if ctx.aggregate.set(tally).is_err() {
                tracing::error!("Aggregate already published; keeping the first one");
            }
        }
        Arrival::Complete => {}
        Arrival::Forfeited => {
            tracing::debug!("Worker {} released from forfeited rendezvous", index);
        }
    }
}

/// True when the stream is still open and nobody asked for shutdown
fn input_abandoned(queue: &BoundedQueue<String>) -> bool {
    !queue.is_end_of_stream() && !queue.is_cancelled()
}

/// Unwind a partially launched run so started threads can exit
fn abandon(queue: &BoundedQueue<String>, rendezvous: &Rendezvous) {
    queue.cancel();
    rendezvous.forfeit();
}
