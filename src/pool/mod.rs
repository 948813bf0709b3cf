//! # Worker Pool
//!
//! A fixed-size pool of preprocessing threads and the lazy, ordered sequence it
//! produces from [`WorkerPool::imap`].
//!
//! Inputs are split into chunks. Chunks are handed to the workers a few at a time as
//! the consumer pulls results, may complete in any order, and are yielded strictly in
//! input order. Each chunk reports back through its own single-slot channel, so the
//! amount of finished-but-unconsumed work never exceeds the prefetch window.

mod lazy_sequence;
mod worker_pool;

pub use lazy_sequence::LazySequence;
pub use worker_pool::WorkerPool;
