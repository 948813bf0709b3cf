#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # imdb
//!
//! Image-detection datasets for training loops: fixed-size batches of preprocessed
//! samples, produced in parallel by a worker pool and cycled epoch after epoch.
//!
//! ## Overview
//!
//! A dataset is a directory of images plus per-image ground truth. Dataset-specific
//! behavior (loading annotations, turning an image into a training [`Sample`],
//! scoring detections) is provided by a [`DatasetSource`]. [`ImageDataset`] owns the
//! rest: the index order, the worker pool, and one lazy sequence of samples per epoch.
//!
//! ## Module Organization
//!
//! - [`dataset`] - The batch cycler, the source interface and sample/batch types
//! - [`pool`] - Worker pool and the ordered lazy sequence it produces
//! - [`vision`] - Image decoding and normalization helpers for sources
//! - [`stream`] - Async access for tokio-based training loops
//! - [`config`] - Layered configuration (defaults, file, environment)
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup and helpers
//!
//! ## Batch Cycling
//!
//! [`ImageDataset::next_batch`] pulls samples from the current sequence. When it runs
//! dry (or before the first batch) the index order is reshuffled, a new sequence is
//! started and the epoch counter increments, even in the middle of a batch. With five
//! images and a batch size of two the epoch reads 1, 1, 2, 2, 2, 3 after successive
//! batches.
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests
//! ```

pub mod config;
pub mod constants;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod pool;
pub mod stream;
pub mod utils;
pub mod vision;

pub use config::{ConfigLoader, DatasetConfig};
pub use constants::SequenceState;
pub use dataset::{
    Batch, BoundingBox, DatasetSource, DetectionSet, EvaluationReport, ImageDataset,
    LoadedDataset, Sample,
};
pub use error::{DatasetError, Result};
pub use pool::{LazySequence, WorkerPool};
pub use stream::SharedDataset;
