//! Cooperative cancellation for a scan run

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::queue::BoundedQueue;

/// Run-scoped cancellation flag
///
/// Starts cleared, is set at most once and never resets. Clones share
/// the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    inner: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag. Returns true if this call performed the transition.
    pub fn set(&self) -> bool {
        !self.inner.swap(true, Ordering::AcqRel)
    }

    pub fn is_set(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }
}

/// Entry point for an external shutdown trigger (Ctrl-C, a timeout, a test)
///
/// Requesting shutdown sets the run's cancellation flag and wakes every
/// thread blocked on the queue.
pub struct ShutdownHandle<T = String> {
    queue: Arc<BoundedQueue<T>>,
}

impl<T> ShutdownHandle<T> {
    pub(crate) fn new(queue: Arc<BoundedQueue<T>>) -> Self {
        Self { queue }
    }

    /// Request cooperative shutdown. Repeated calls are no-ops.
    pub fn request_shutdown(&self) {
        if self.queue.cancel() {
            tracing::info!("Shutdown requested, stopping reader and workers");
        }
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.queue.is_cancelled()
    }
}

impl<T> Clone for ShutdownHandle<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}
