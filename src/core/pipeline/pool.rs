//! Bounded worker pool for hashing and thumbnailing.
//!
//! Work items are spawned onto a dedicated rayon pool; each result comes
//! back over a crossbeam channel tagged with the item's submission index,
//! in completion order.

use super::CancellationToken;
use crate::error::PoolError;
use crossbeam_channel::{unbounded, Receiver};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error};

/// Fixed-size pool of worker threads
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    size: usize,
}

impl WorkerPool {
    /// Create a pool of `requested` workers, capped at the number of
    /// available cores and never smaller than one.
    pub fn new(requested: usize) -> Result<Self, PoolError> {
        let available = thread::available_parallelism().map_or(1, |n| n.get());
        let size = requested.clamp(1, available.max(1));

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|i| format!("doppelganger-worker-{}", i))
            // Without a handler rayon aborts the process on a panicking spawn
            .panic_handler(|payload| {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(panic = %message, "Worker panicked");
            })
            .build()
            .map_err(|e| PoolError::BuildFailed(e.to_string()))?;

        debug!(requested, size, "Worker pool ready");
        Ok(Self { pool, size })
    }

    /// Number of worker threads
    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `work` on every item.
    ///
    /// Items whose turn comes after `token` is cancelled are skipped and
    /// never produce a result.
    pub fn dispatch<T, R, F>(&self, items: Vec<T>, token: &CancellationToken, work: F) -> Dispatch<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        let (sender, receiver) = unbounded();
        let work = Arc::new(work);
        let expected = items.len();

        for (index, item) in items.into_iter().enumerate() {
            let sender = sender.clone();
            let work = Arc::clone(&work);
            let token = token.clone();

            self.pool.spawn(move || {
                if token.is_cancelled() {
                    return;
                }
                let result = work(item);
                // The coordinator may have stopped listening after a cancel
                let _ = sender.send((index, result));
            });
        }

        Dispatch {
            receiver,
            expected,
            received: 0,
        }
    }
}

/// Results of one [`WorkerPool::dispatch`] call.
///
/// Iterating blocks until the next result arrives and ends once every
/// task has finished, been skipped or died.
pub struct Dispatch<R> {
    receiver: Receiver<(usize, R)>,
    expected: usize,
    received: usize,
}

impl<R> Dispatch<R> {
    /// Number of submitted items
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Number of results received so far
    pub fn received(&self) -> usize {
        self.received
    }

    /// Results still outstanding
    pub fn remaining(&self) -> usize {
        self.expected - self.received
    }

    /// Check that every item produced a result.
    ///
    /// Missing results are expected after a cancel; otherwise a worker died.
    pub fn ensure_complete(&self, token: &CancellationToken) -> Result<(), PoolError> {
        if self.received < self.expected && !token.is_cancelled() {
            return Err(PoolError::WorkerLost {
                received: self.received,
                expected: self.expected,
            });
        }
        Ok(())
    }
}

impl<R> Iterator for Dispatch<R> {
    type Item = (usize, R);

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.receiver.recv().ok()?;
        self.received += 1;
        Some(result)
    }
}
