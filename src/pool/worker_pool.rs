use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

use super::lazy_sequence::{ChunkWork, LazySequence};
use crate::config::DatasetConfig;
use crate::constants::WORKER_THREAD_PREFIX;
use crate::error::{DatasetError, Result};
use crate::logging::log_pool_operation;

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// State shared between the pool and the sequences it hands out
pub(crate) struct PoolShared {
    /// `None` once the pool is closed
    sender: RwLock<Option<Sender<Job>>>,
}

impl PoolShared {
    pub(crate) fn submit(&self, job: Job) -> Result<()> {
        let guard = self.sender.read();
        match guard.as_ref() {
            Some(sender) => sender.send(job).map_err(|_| DatasetError::PoolClosed),
            None => Err(DatasetError::PoolClosed),
        }
    }

    fn is_closed(&self) -> bool {
        self.sender.read().is_none()
    }
}

/// Fixed-size pool of named worker threads
///
/// Dropping an open pool closes it.
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    workers: usize,
    prefetch_chunks: usize,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .field("prefetch_chunks", &self.prefetch_chunks)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl WorkerPool {
    /// Spawn `workers` threads; sequences keep at most `prefetch_chunks` chunks in flight
    pub fn new(workers: usize, prefetch_chunks: usize) -> Result<Self> {
        if workers == 0 {
            return Err(DatasetError::Configuration(
                "worker pool needs at least one worker".to_string(),
            ));
        }
        if prefetch_chunks == 0 {
            return Err(DatasetError::Configuration(
                "prefetch_chunks must be at least 1".to_string(),
            ));
        }

        let (sender, receiver) = channel::unbounded::<Job>();
        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("{WORKER_THREAD_PREFIX}-{index}"))
                .spawn(move || worker_loop(index, receiver))?;
            handles.push(handle);
        }

        info!(
            "🏊 POOL: Started {} workers (prefetch: {} chunks)",
            workers, prefetch_chunks
        );
        log_pool_operation("start", workers, "running", None);

        Ok(Self {
            shared: Arc::new(PoolShared {
                sender: RwLock::new(Some(sender)),
            }),
            handles: Mutex::new(handles),
            workers,
            prefetch_chunks,
        })
    }

    /// Size a pool from dataset settings
    pub fn from_config(config: &DatasetConfig) -> Result<Self> {
        Self::new(config.processes, config.prefetch_chunks)
    }

    pub fn num_workers(&self) -> usize {
        self.workers
    }

    pub fn prefetch_chunks(&self) -> usize {
        self.prefetch_chunks
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Lazily map `func` over `inputs` in chunks of `chunksize`
    ///
    /// Nothing is submitted until the sequence is first pulled. Results come back in
    /// input order. A panic inside `func` becomes [`DatasetError::WorkerPanic`] for
    /// that item only. A `chunksize` of 0 is treated as 1.
    pub fn imap<I, T, F>(&self, func: F, inputs: Vec<I>, chunksize: usize) -> Result<LazySequence<T>>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(I) -> Result<T> + Send + Sync + 'static,
    {
        if self.is_closed() {
            return Err(DatasetError::PoolClosed);
        }

        let chunksize = chunksize.max(1);
        let total = inputs.len();
        let func = Arc::new(func);

        let mut chunks: Vec<ChunkWork<T>> = Vec::with_capacity(total.div_ceil(chunksize));
        let mut inputs = inputs.into_iter();
        let mut start = 0;
        while start < total {
            let chunk: Vec<I> = inputs.by_ref().take(chunksize).collect();
            let chunk_len = chunk.len();
            let func = Arc::clone(&func);
            chunks.push(Box::new(move || run_chunk(func.as_ref(), start, chunk)));
            start += chunk_len;
        }

        debug!(
            "🏊 POOL: Created lazy sequence over {} items in {} chunks",
            total,
            chunks.len()
        );

        Ok(LazySequence::new(
            Arc::clone(&self.shared),
            chunks,
            total,
            self.prefetch_chunks,
        ))
    }

    /// Stop accepting work, let queued chunks finish and join the workers
    ///
    /// Closing an already closed pool is a no-op.
    pub fn close(&self) {
        let sender = self.shared.sender.write().take();
        if sender.is_none() {
            return;
        }
        drop(sender);

        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        let mut failed = 0;
        for handle in handles {
            if handle.join().is_err() {
                failed += 1;
            }
        }

        if failed > 0 {
            warn!("⚠️ POOL: {} workers exited abnormally", failed);
        }
        info!("🛑 POOL: Closed and joined {} workers", self.workers);
        log_pool_operation("close", self.workers, "closed", None);
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
    }
}

fn worker_loop(index: usize, receiver: Receiver<Job>) {
    debug!("🎯 POOL: Worker {} waiting for jobs", index);
    while let Ok(job) = receiver.recv() {
        job();
    }
    debug!("✅ POOL: Worker {} finished", index);
}

fn run_chunk<I, T, F>(func: &F, start: usize, chunk: Vec<I>) -> Vec<Result<T>>
where
    F: Fn(I) -> Result<T>,
{
    chunk
        .into_iter()
        .enumerate()
        .map(|(offset, item)| {
            panic::catch_unwind(AssertUnwindSafe(|| func(item))).unwrap_or_else(|payload| {
                let index = start + offset;
                let message = panic_message(payload.as_ref());
                warn!("💥 POOL: Worker panicked on input {}: {}", index, message);
                Err(DatasetError::WorkerPanic { index, message })
            })
        })
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
