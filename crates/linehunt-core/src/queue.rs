//! Bounded blocking queue between the line reader and the workers
//!
//! A fixed ring of slots guarded by one mutex, with two condition
//! variables on that mutex:
//! - `not_full`: signalled once per pop, waited on by the producer
//! - `not_empty`: signalled once per push, broadcast when the stream ends
//!
//! Cancellation broadcasts on both, so no thread stays parked once the
//! run is shutting down.

use parking_lot::{Condvar, Mutex};

use crate::cancel::CancelFlag;
use crate::error::{LinehuntError, Result};

/// Why a push did not enqueue its item
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PushError {
    #[error("queue cancelled")]
    Cancelled,
    #[error("queue closed")]
    Closed,
}

struct Ring<T> {
    slots: Box<[Option<T>]>,
    /// Next slot to read
    head: usize,
    /// Next slot to write
    tail: usize,
    count: usize,
    end_of_stream: bool,
}

impl<T> Ring<T> {
    fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }

    fn put(&mut self, item: T) {
        debug_assert!(self.slots[self.tail].is_none());
        self.slots[self.tail] = Some(item);
        self.tail = (self.tail + 1) % self.slots.len();
        self.count += 1;
    }

    fn take(&mut self) -> Option<T> {
        let item = self.slots[self.head].take();
        debug_assert!(item.is_some());
        self.head = (self.head + 1) % self.slots.len();
        self.count -= 1;
        item
    }
}

/// Fixed-capacity FIFO for one producer and any number of consumers
///
/// Items are owned by the queue between `push` and `pop`; whatever is
/// still queued when the queue is dropped is dropped with it.
pub struct BoundedQueue<T> {
    ring: Mutex<Ring<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    cancel: CancelFlag,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_cancel_flag(capacity, CancelFlag::new())
    }

    /// Create a queue observing an existing cancellation flag
    pub fn with_cancel_flag(capacity: usize, cancel: CancelFlag) -> Result<Self> {
        if capacity == 0 {
            return Err(LinehuntError::config("queue capacity must be at least 1"));
        }

        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity).map_err(|e| {
            LinehuntError::resource_init(
                format!("queue of {} slots", capacity),
                std::io::Error::new(std::io::ErrorKind::OutOfMemory, e),
            )
        })?;
        slots.resize_with(capacity, || None);
        let slots = slots.into_boxed_slice();

        Ok(Self {
            ring: Mutex::new(Ring {
                slots,
                head: 0,
                tail: 0,
                count: 0,
                end_of_stream: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            cancel,
        })
    }

    /// Enqueue an item, blocking while the queue is full
    ///
    /// The queue takes ownership of `item` whatever the outcome: if the
    /// run is cancelled while waiting, or the stream was already ended,
    /// the item is dropped here.
    pub fn push(&self, item: T) -> std::result::Result<(), PushError> {
        let mut ring = self.ring.lock();

        while ring.is_full() && !self.cancel.is_set() {
            self.not_full.wait(&mut ring);
        }

        if self.cancel.is_set() {
            return Err(PushError::Cancelled);
        }
        if ring.end_of_stream {
            return Err(PushError::Closed);
        }

        ring.put(item);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Dequeue the oldest item, blocking while the queue is empty
    ///
    /// Returns `None` once the stream has ended and the queue is drained,
    /// or as soon as the run is cancelled.
    pub fn pop(&self) -> Option<T> {
        let mut ring = self.ring.lock();

        while ring.count == 0 && !ring.end_of_stream && !self.cancel.is_set() {
            self.not_empty.wait(&mut ring);
        }

        if self.cancel.is_set() || ring.count == 0 {
            return None;
        }

        let item = ring.take();
        self.not_full.notify_one();
        item
    }

    /// Mark that no more items will be pushed and wake every consumer
    ///
    /// Returns true on the first call; later calls change nothing.
    pub fn signal_end_of_stream(&self) -> bool {
        let mut ring = self.ring.lock();
        if ring.end_of_stream {
            return false;
        }
        ring.end_of_stream = true;
        self.not_empty.notify_all();
        true
    }

    /// Set the cancellation flag and wake every blocked push and pop
    ///
    /// Returns true if this call performed the cancellation.
    pub fn cancel(&self) -> bool {
        let first = self.cancel.set();
        // Notify under the lock so a waiter between its flag check and its
        // wait cannot miss the wake-up.
        let _ring = self.ring.lock();
        self.not_full.notify_all();
        self.not_empty.notify_all();
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_set()
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.ring.lock().end_of_stream
    }

    pub fn len(&self) -> usize {
        self.ring.lock().count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.ring.lock().slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    const SHORT: Duration = Duration::from_millis(100);
    const LONG: Duration = Duration::from_secs(5);

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            BoundedQueue::<u32>::with_capacity(0),
            Err(LinehuntError::Config(_))
        ));
    }

    #[test]
    fn test_unallocatable_capacity_is_an_error() {
        assert!(matches!(
            BoundedQueue::<String>::with_capacity(usize::MAX / 2),
            Err(LinehuntError::ResourceInit { .. })
        ));
    }

    #[test]
    fn test_fifo_order() {
        let queue = BoundedQueue::with_capacity(4).unwrap();
        for i in 0..4 {
            queue.push(i).unwrap();
        }
        assert_eq!(queue.len(), 4);

        let popped: Vec<_> = (0..4).map(|_| queue.pop().unwrap()).collect();
        assert_eq!(popped, vec![0, 1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_fifo_across_wraparound() {
        let queue = BoundedQueue::with_capacity(3).unwrap();
        let mut out = Vec::new();
        for i in 0..10 {
            queue.push(i).unwrap();
            if i % 2 == 1 {
                out.push(queue.pop().unwrap());
                out.push(queue.pop().unwrap());
            }
        }
        assert_eq!(out, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_push_blocks_when_full() {
        let queue = Arc::new(BoundedQueue::<i32>::with_capacity(1).unwrap());
        queue.push(1).unwrap();

        let (tx, rx) = mpsc::channel();
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let result = queue.push(2);
                tx.send(result).unwrap();
            })
        };

        assert!(rx.recv_timeout(SHORT).is_err(), "push should block while full");

        assert_eq!(queue.pop(), Some(1));
        assert_eq!(rx.recv_timeout(LONG).unwrap(), Ok(()));
        assert_eq!(queue.pop(), Some(2));
        producer.join().unwrap();
    }

    #[test]
    fn test_pop_blocks_until_push() {
        let queue = Arc::new(BoundedQueue::<String>::with_capacity(2).unwrap());

        let (tx, rx) = mpsc::channel();
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || tx.send(queue.pop()).unwrap())
        };

        assert!(rx.recv_timeout(SHORT).is_err(), "pop should block while empty");

        queue.push("line".to_string()).unwrap();
        assert_eq!(rx.recv_timeout(LONG).unwrap(), Some("line".to_string()));
        consumer.join().unwrap();
    }

    #[test]
    fn test_end_of_stream_releases_all_consumers() {
        let queue = Arc::new(BoundedQueue::<u32>::with_capacity(2).unwrap());

        let (tx, rx) = mpsc::channel();
        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let tx = tx.clone();
                thread::spawn(move || tx.send(queue.pop()).unwrap())
            })
            .collect();

        assert!(rx.recv_timeout(SHORT).is_err());
        assert!(queue.signal_end_of_stream());

        for _ in 0..4 {
            assert_eq!(rx.recv_timeout(LONG).unwrap(), None);
        }
        for c in consumers {
            c.join().unwrap();
        }

        // Later pops return immediately
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_end_of_stream_drains_remaining_items() {
        let queue = BoundedQueue::with_capacity(3).unwrap();
        queue.push(1).unwrap();
        queue.push(2).unwrap();
        queue.signal_end_of_stream();

        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_end_of_stream_is_idempotent() {
        let queue = BoundedQueue::with_capacity(2).unwrap();
        queue.push(7).unwrap();

        assert!(queue.signal_end_of_stream());
        assert!(!queue.signal_end_of_stream());
        assert!(!queue.signal_end_of_stream());

        assert!(queue.is_end_of_stream());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop(), Some(7));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_push_after_end_of_stream_is_rejected() {
        let queue = BoundedQueue::with_capacity(2).unwrap();
        queue.signal_end_of_stream();
        assert_eq!(queue.push(1), Err(PushError::Closed));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_cancel_wakes_blocked_push() {
        let queue = Arc::new(BoundedQueue::<Arc<i32>>::with_capacity(1).unwrap());
        queue.push(Arc::new(0)).unwrap();

        let item = Arc::new(1);
        let weak = Arc::downgrade(&item);

        let (tx, rx) = mpsc::channel();
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || tx.send(queue.push(item)).unwrap())
        };

        assert!(rx.recv_timeout(SHORT).is_err());
        assert!(queue.cancel());

        assert_eq!(rx.recv_timeout(LONG).unwrap(), Err(PushError::Cancelled));
        producer.join().unwrap();

        // The rejected item was dropped, not leaked
        assert!(weak.upgrade().is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_cancel_wakes_blocked_pops() {
        let queue = Arc::new(BoundedQueue::<u32>::with_capacity(4).unwrap());

        let (tx, rx) = mpsc::channel();
        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let tx = tx.clone();
                thread::spawn(move || tx.send(queue.pop()).unwrap())
            })
            .collect();

        assert!(rx.recv_timeout(SHORT).is_err());
        queue.cancel();

        for _ in 0..3 {
            assert_eq!(rx.recv_timeout(LONG).unwrap(), None);
        }
        for c in consumers {
            c.join().unwrap();
        }
    }

    #[test]
    fn test_cancel_stops_pop_with_items_queued() {
        let queue = BoundedQueue::with_capacity(2).unwrap();
        queue.push(1).unwrap();
        assert!(queue.cancel());
        assert!(!queue.cancel());

        assert_eq!(queue.pop(), None);
        assert_eq!(queue.push(2), Err(PushError::Cancelled));
    }

    #[test]
    fn test_drop_releases_queued_items() {
        let item = Arc::new("still queued");
        let queue = BoundedQueue::with_capacity(2).unwrap();
        queue.push(Arc::clone(&item)).unwrap();
        queue.cancel();

        assert_eq!(Arc::strong_count(&item), 2);
        drop(queue);
        assert_eq!(Arc::strong_count(&item), 1);
    }

    #[test]
    fn test_shared_cancel_flag() {
        let flag = CancelFlag::new();
        let queue = BoundedQueue::<u8>::with_cancel_flag(1, flag.clone()).unwrap();
        queue.cancel();
        assert!(flag.is_set());
        assert!(queue.cancel_flag().is_set());
    }
}
