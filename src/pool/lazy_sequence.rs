use crossbeam::channel::{self, Receiver};
use std::collections::VecDeque;
use std::sync::Arc;

use super::worker_pool::PoolShared;
use crate::error::{DatasetError, Result};

/// Deferred work for one chunk: produces one result per input, in input order
pub(crate) type ChunkWork<T> = Box<dyn FnOnce() -> Vec<Result<T>> + Send>;

/// Ordered, lazily evaluated results of [`WorkerPool::imap`](super::WorkerPool::imap)
///
/// Pulling blocks until the next result in input order is ready. At most
/// `prefetch` chunks are in flight at any time.
pub struct LazySequence<T> {
    pool: Arc<PoolShared>,
    pending: VecDeque<ChunkWork<T>>,
    in_flight: VecDeque<Receiver<Vec<Result<T>>>>,
    ready: std::vec::IntoIter<Result<T>>,
    prefetch: usize,
    total: usize,
    yielded: usize,
}

impl<T> std::fmt::Debug for LazySequence<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazySequence")
            .field("total", &self.total)
            .field("yielded", &self.yielded)
            .field("pending_chunks", &self.pending.len())
            .field("in_flight_chunks", &self.in_flight.len())
            .finish()
    }
}

impl<T: Send + 'static> LazySequence<T> {
    pub(crate) fn new(
        pool: Arc<PoolShared>,
        chunks: Vec<ChunkWork<T>>,
        total: usize,
        prefetch: usize,
    ) -> Self {
        Self {
            pool,
            pending: chunks.into(),
            in_flight: VecDeque::new(),
            ready: Vec::new().into_iter(),
            prefetch: prefetch.max(1),
            total,
            yielded: 0,
        }
    }

    /// Number of items the sequence was created with
    pub fn total(&self) -> usize {
        self.total
    }

    /// Items not yet yielded
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.yielded)
    }

    /// Submit chunks until the prefetch window is full
    fn fill(&mut self) -> Result<()> {
        while self.in_flight.len() < self.prefetch {
            let Some(work) = self.pending.pop_front() else {
                break;
            };
            let (sender, receiver) = channel::bounded(1);
            self.pool.submit(Box::new(move || {
                // The consumer may have dropped the sequence
                let _ = sender.send(work());
            }))?;
            self.in_flight.push_back(receiver);
        }
        Ok(())
    }

    /// Give up on everything not yet delivered
    fn abandon(&mut self) {
        self.pending.clear();
        self.in_flight.clear();
        self.yielded = self.total;
    }
}

impl<T: Send + 'static> Iterator for LazySequence<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.ready.next() {
                self.yielded += 1;
                return Some(item);
            }

            if let Err(e) = self.fill() {
                self.abandon();
                return Some(Err(e));
            }

            let receiver = self.in_flight.pop_front()?;
            match receiver.recv() {
                Ok(results) => self.ready = results.into_iter(),
                Err(_) => {
                    self.abandon();
                    return Some(Err(DatasetError::PoolClosed));
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining()))
    }
}
