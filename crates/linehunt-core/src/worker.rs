//! Consumer side of a scan: per-worker matching and result slots

use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

use crate::error::{LinehuntError, Result};
use crate::predicate::Predicate;
use crate::queue::BoundedQueue;
use crate::report::{Tally, WorkerTally};

/// Pop lines until the queue reports stop, counting predicate matches
///
/// A panicking predicate does not take the run down: the worker stops,
/// logs the failure and reports a zero count flagged as failed.
pub fn consume<P>(index: usize, queue: &BoundedQueue<String>, predicate: &P) -> WorkerTally
where
    P: Predicate + ?Sized,
{
    let mut matched = 0u64;
    let mut consumed = 0u64;

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        while let Some(line) = queue.pop() {
            if predicate.matches(&line) {
                matched += 1;
            }
            consumed += 1;
        }
    }));

    match result {
        Ok(()) => {
            tracing::debug!("Worker {} done: {} of {} lines matched", index, matched, consumed);
            WorkerTally {
                index,
                matched,
                consumed,
                failed: false,
            }
        }
        Err(_) => {
            tracing::error!("Worker {} failed after {} lines; its count is discarded", index, consumed);
            WorkerTally {
                index,
                matched: 0,
                consumed: 0,
                failed: true,
            }
        }
    }
}

/// Pre-sized result storage with one write-once slot per worker
///
/// Each worker writes only its own index. Slots are read after the
/// rendezvous, once every worker has written.
#[derive(Debug)]
pub struct ResultSlots {
    slots: Box<[OnceLock<WorkerTally>]>,
}

impl ResultSlots {
    pub fn new(workers: usize) -> Result<Self> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(workers).map_err(|e| {
            LinehuntError::resource_init(
                format!("result slots for {} workers", workers),
                std::io::Error::new(std::io::ErrorKind::OutOfMemory, e),
            )
        })?;
        slots.resize_with(workers, OnceLock::new);

        Ok(Self {
            slots: slots.into_boxed_slice(),
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Store a worker's tally in its own slot
    pub fn record(&self, tally: WorkerTally) {
        let index = tally.index;
        match self.slots.get(index) {
            Some(slot) => {
                if slot.set(tally).is_err() {
                    tracing::error!("Result slot {} written twice; keeping the first tally", index);
                }
            }
            None => {
                tracing::error!(
                    "Dropping tally for worker {}: only {} result slots",
                    index,
                    self.slots.len()
                );
            }
        }
    }

    pub fn get(&self, index: usize) -> Option<&WorkerTally> {
        self.slots.get(index).and_then(OnceLock::get)
    }

    /// Sum every slot. A slot that was never written counts as a failed
    /// worker with zero matches.
    pub fn aggregate(&self) -> Tally {
        let workers: Vec<WorkerTally> = self
            .slots
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.get().cloned().unwrap_or(WorkerTally {
                    index,
                    matched: 0,
                    consumed: 0,
                    failed: true,
                })
            })
            .collect();

        Tally {
            total: workers.iter().map(|w| w.matched).sum(),
            workers,
        }
    }
}
