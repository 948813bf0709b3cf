//! # Async Batch Access
//!
//! Pulling a batch blocks on the worker pool, so async training loops go through
//! [`SharedDataset`], which runs each pull on tokio's blocking thread pool.
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use imdb::dataset::{DatasetSource, ImageDataset};
//! use imdb::stream::SharedDataset;
//!
//! # async fn train<S: DatasetSource>(dataset: ImageDataset<S>) -> imdb::Result<()> {
//! let shared = SharedDataset::new(dataset);
//! let mut batches = Box::pin(shared.clone().into_stream().take(100));
//! while let Some(batch) = batches.next().await {
//!     let batch = batch?;
//!     // forward / backward
//! #   let _ = batch;
//! }
//! shared.close().await?;
//! # Ok(())
//! # }
//! ```

use futures::stream::{self, Stream};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use tokio::task;

use crate::dataset::{Batch, DatasetSource, ImageDataset};
use crate::error::{DatasetError, Result};

/// Cloneable handle to an [`ImageDataset`] usable from async code
pub struct SharedDataset<S: DatasetSource> {
    inner: Arc<Mutex<ImageDataset<S>>>,
}

impl<S: DatasetSource> Clone for SharedDataset<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: DatasetSource> SharedDataset<S> {
    pub fn new(dataset: ImageDataset<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(dataset)),
        }
    }

    /// Synchronous access, e.g. for accessors; blocks while a batch is being pulled
    pub fn lock(&self) -> MutexGuard<'_, ImageDataset<S>> {
        self.inner.lock()
    }

    /// Pull the next batch without blocking the async runtime
    pub async fn next_batch(&self) -> Result<Batch> {
        let inner = Arc::clone(&self.inner);
        task::spawn_blocking(move || inner.lock().next_batch())
            .await
            .map_err(|e| DatasetError::Runtime(format!("batch task failed: {e}")))?
    }

    /// Close the underlying dataset, joining its workers off the runtime threads
    pub async fn close(&self) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        task::spawn_blocking(move || inner.lock().close())
            .await
            .map_err(|e| DatasetError::Runtime(format!("close task failed: {e}")))
    }

    /// Endless stream of batches
    ///
    /// Errors are yielded and the stream continues, except [`DatasetError::PoolClosed`],
    /// which is yielded once before the stream ends.
    pub fn into_stream(self) -> impl Stream<Item = Result<Batch>> + Send {
        stream::unfold(Some(self), |state| async move {
            let dataset = state?;
            let result = dataset.next_batch().await;
            let next_state = match &result {
                Err(DatasetError::PoolClosed) => None,
                _ => Some(dataset),
            };
            Some((result, next_state))
        })
    }
}
