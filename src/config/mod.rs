//! # Dataset Configuration
//!
//! Configuration for an [`ImageDataset`](crate::dataset::ImageDataset): where the data lives,
//! how large batches are, and how the preprocessing pool is sized.
//!
//! Values are layered by [`ConfigLoader`]: struct defaults, then an optional file
//! (TOML, YAML or JSON, picked by extension), then `IMDB_*` environment variables.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use imdb::config::DatasetConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Programmatic
//! let config = DatasetConfig::new("voc_2007_trainval", "data/VOCdevkit2007")
//!     .with_batch_size(16)
//!     .with_processes(4);
//!
//! // Layered from file + environment
//! let config = DatasetConfig::load(Some("config/dataset.toml".as_ref()))?;
//! # Ok(())
//! # }
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::defaults;
use crate::error::{DatasetError, Result};

pub use loader::{detect_environment, ConfigLoader};

fn default_batch_size() -> usize {
    defaults::BATCH_SIZE
}

fn default_processes() -> usize {
    defaults::PROCESSES
}

fn default_shuffle() -> bool {
    defaults::SHUFFLE
}

fn default_prefetch_chunks() -> usize {
    defaults::PREFETCH_CHUNKS
}

/// Settings for one dataset instance
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DatasetConfig {
    /// Dataset name, e.g. `voc_2007_trainval`
    pub name: String,

    /// Storage root holding images, annotations and the `cache` directory
    pub data_dir: PathBuf,

    /// Samples per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Number of preprocessing workers
    #[serde(default = "default_processes")]
    pub processes: usize,

    /// Reshuffle the index order at every epoch
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,

    /// Seed for the shuffle RNG; entropy-seeded when absent
    #[serde(default)]
    pub seed: Option<u64>,

    /// Chunks submitted to the pool ahead of the consumer
    #[serde(default = "default_prefetch_chunks")]
    pub prefetch_chunks: usize,
}

impl DatasetConfig {
    pub fn new(name: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            data_dir: data_dir.into(),
            batch_size: defaults::BATCH_SIZE,
            processes: defaults::PROCESSES,
            shuffle: defaults::SHUFFLE,
            seed: None,
            prefetch_chunks: defaults::PREFETCH_CHUNKS,
        }
    }

    /// Load from an optional file and `IMDB_*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut loader = ConfigLoader::new();
        if let Some(path) = path {
            loader = loader.with_file(path);
        }
        loader.load()
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_processes(mut self, processes: usize) -> Self {
        self.processes = processes;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_prefetch_chunks(mut self, prefetch_chunks: usize) -> Self {
        self.prefetch_chunks = prefetch_chunks;
        self
    }

    /// Reject settings the pool or the cycler cannot work with
    ///
    /// A zero batch size is allowed: `next_batch` then returns empty batches.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(DatasetError::Configuration(
                "name must not be empty".to_string(),
            ));
        }
        if self.processes == 0 {
            return Err(DatasetError::Configuration(
                "processes must be at least 1".to_string(),
            ));
        }
        if self.prefetch_chunks == 0 {
            return Err(DatasetError::Configuration(
                "prefetch_chunks must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
