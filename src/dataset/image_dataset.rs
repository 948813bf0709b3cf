//! The batch cycler.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::source::DatasetSource;
use super::types::{Batch, DetectionSet, EvaluationReport, LoadedDataset, Sample};
use crate::config::DatasetConfig;
use crate::constants::{layout, SequenceState};
use crate::error::{DatasetError, Result};
use crate::logging::{log_batch_operation, log_epoch_rollover, log_error};
use crate::pool::{LazySequence, WorkerPool};
use crate::utils::fs::ensure_dir;

/// An image-detection dataset that hands out fixed-size batches forever
///
/// Samples are produced by [`DatasetSource::preprocess`] on a worker pool, one
/// lazy sequence per epoch. When a sequence runs dry the index order is
/// (optionally) reshuffled, a new sequence is started and the epoch counter is
/// bumped, even in the middle of a batch.
///
/// A failed sample fails the whole call. With a batch size above one the
/// failure also ends the current sequence, so the next call starts a new epoch.
pub struct ImageDataset<S: DatasetSource> {
    name: String,
    data_dir: PathBuf,
    batch_size: usize,
    shuffle: bool,
    epoch: u64,

    source: Arc<S>,
    classes: Vec<String>,
    image_names: Arc<Vec<String>>,
    image_indexes: Vec<String>,
    annotations: Arc<Vec<S::Annotation>>,
    options: BTreeMap<String, Value>,

    /// Image indexes in the order the current sequence visits them
    epoch_order: Vec<usize>,
    gen: Option<LazySequence<Sample>>,
    pool: WorkerPool,
    rng: StdRng,
}

impl<S: DatasetSource> std::fmt::Debug for ImageDataset<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageDataset")
            .field("name", &self.name)
            .field("data_dir", &self.data_dir)
            .field("batch_size", &self.batch_size)
            .field("shuffle", &self.shuffle)
            .field("epoch", &self.epoch)
            .field("num_classes", &self.classes.len())
            .field("num_images", &self.image_names.len())
            .field("pool", &self.pool)
            .field("sequence", &self.sequence_state())
            .finish()
    }
}

impl<S: DatasetSource> ImageDataset<S> {
    /// Start the worker pool and load the dataset through `source`
    #[instrument(skip_all, fields(name = %config.name))]
    pub fn new(config: DatasetConfig, source: S) -> Result<Self> {
        config.validate()?;

        let pool = WorkerPool::from_config(&config)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut dataset = Self {
            name: config.name,
            data_dir: config.data_dir,
            batch_size: config.batch_size,
            shuffle: config.shuffle,
            epoch: 0,
            source: Arc::new(source),
            classes: Vec::new(),
            image_names: Arc::new(Vec::new()),
            image_indexes: Vec::new(),
            annotations: Arc::new(Vec::new()),
            options: BTreeMap::new(),
            epoch_order: Vec::new(),
            gen: None,
            pool,
            rng,
        };
        dataset.load_dataset()?;

        info!(
            "📚 DATASET: Loaded '{}' ({} images, {} classes, batch size {})",
            dataset.name,
            dataset.num_images(),
            dataset.num_classes(),
            dataset.batch_size
        );
        Ok(dataset)
    }

    /// (Re)populate names, annotations, classes and options from the source
    ///
    /// The options map is replaced, so edits made through
    /// [`options_mut`](Self::options_mut) do not survive a reload. Any in-progress
    /// epoch is discarded; the epoch counter is kept.
    pub fn load_dataset(&mut self) -> Result<()> {
        let LoadedDataset {
            classes,
            image_names,
            image_indexes,
            annotations,
            options,
        } = {
            let loaded = self.source.load_dataset(&self.data_dir)?;
            loaded.validate()?;
            loaded
        };

        self.classes = classes;
        self.image_names = Arc::new(image_names);
        self.image_indexes = image_indexes;
        self.annotations = Arc::new(annotations);
        self.options = options;
        self.epoch_order.clear();
        self.gen = None;
        Ok(())
    }

    /// Pull the next `batch_size` samples, rolling over epochs as needed
    pub fn next_batch(&mut self) -> Result<Batch> {
        if self.pool.is_closed() {
            return Err(DatasetError::PoolClosed);
        }
        if self.batch_size == 0 {
            return Ok(Batch::empty());
        }
        if self.image_names.is_empty() {
            return Err(DatasetError::EmptyDataset(self.name.clone()));
        }

        let mut samples = Vec::with_capacity(self.batch_size);
        while samples.len() < self.batch_size {
            match self.gen.as_mut().and_then(Iterator::next) {
                Some(Ok(sample)) => samples.push(sample),
                Some(Err(err)) => return Err(self.fail_batch(err)),
                None => self.start_epoch()?,
            }
        }

        log_batch_operation("next_batch", &self.name, self.epoch, samples.len(), None);
        Batch::from_samples(samples)
    }

    /// Point a sample failure at its image and drop a broken sequence
    ///
    /// Chunks hold `batch_size` images, so with more than one image per chunk the
    /// rest of the failed chunk is lost along with the sequence.
    fn fail_batch(&mut self, err: DatasetError) -> DatasetError {
        let err = match err {
            DatasetError::WorkerPanic { index, message } => DatasetError::WorkerPanic {
                index: self.epoch_order.get(index).copied().unwrap_or(index),
                message,
            },
            other => other,
        };

        if self.batch_size > 1 {
            self.gen = None;
        }
        log_error(
            "dataset",
            "next_batch",
            &err.to_string(),
            Some(&format!("dataset={} epoch={}", self.name, self.epoch)),
        );
        err
    }

    /// Replace the exhausted (or missing) sequence with a fresh one
    fn start_epoch(&mut self) -> Result<()> {
        let mut indexes: Vec<usize> = (0..self.image_names.len()).collect();
        if self.shuffle {
            indexes.shuffle(&mut self.rng);
        }

        let source = Arc::clone(&self.source);
        let image_names = Arc::clone(&self.image_names);
        let annotations = Arc::clone(&self.annotations);
        self.gen = None;
        self.epoch_order = indexes.clone();
        self.gen = Some(self.pool.imap(
            move |index: usize| source.preprocess(&image_names[index], &annotations[index]),
            indexes,
            self.batch_size,
        )?);
        self.epoch += 1;

        debug!("🔄 DATASET: '{}' entering epoch {}", self.name, self.epoch);
        log_epoch_rollover(&self.name, self.epoch, self.image_names.len(), self.shuffle);
        Ok(())
    }

    /// Release the worker pool and drop the current sequence
    pub fn close(&mut self) {
        self.gen = None;
        self.pool.close();
        info!("🛑 DATASET: '{}' closed at epoch {}", self.name, self.epoch);
    }

    /// Check the detections' shape and hand them to the source for scoring
    pub fn evaluate_detections(
        &self,
        all_boxes: &DetectionSet,
        output_dir: Option<&Path>,
    ) -> Result<EvaluationReport> {
        all_boxes.validate(self.num_classes(), self.num_images())?;
        self.source.evaluate_detections(all_boxes, output_dir)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn image_names(&self) -> &[String] {
        &self.image_names
    }

    pub fn image_indexes(&self) -> &[String] {
        &self.image_indexes
    }

    pub fn annotations(&self) -> &[S::Annotation] {
        &self.annotations
    }

    /// Dataset-specific options, seeded by the source
    pub fn options(&self) -> &BTreeMap<String, Value> {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut BTreeMap<String, Value> {
        &mut self.options
    }

    /// `<data_dir>/cache`, created on first use
    pub fn cache_path(&self) -> Result<PathBuf> {
        let cache_path = self.data_dir.join(layout::CACHE_DIR_NAME);
        ensure_dir(&cache_path, layout::MKDIR_MAX_DEPTH)?;
        Ok(cache_path)
    }

    pub fn num_images(&self) -> usize {
        self.image_names.len()
    }

    /// Number of sequences started so far
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Whole batches in one epoch
    pub fn batch_per_epoch(&self) -> usize {
        self.num_images().checked_div(self.batch_size).unwrap_or(0)
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn num_workers(&self) -> usize {
        self.pool.num_workers()
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    pub fn sequence_state(&self) -> SequenceState {
        if self.pool.is_closed() {
            SequenceState::Closed
        } else if self.gen.is_some() {
            SequenceState::Active
        } else {
            SequenceState::Missing
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}
