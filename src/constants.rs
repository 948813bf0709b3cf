//! # Dataset Constants
//!
//! Defaults and fixed names shared by the batch cycler, the worker pool and the
//! configuration layer.

use serde::{Deserialize, Serialize};

/// Defaults applied when a value is not configured
pub mod defaults {
    /// Number of preprocessing workers
    pub const PROCESSES: usize = 3;

    /// Whether the index order is reshuffled at every epoch
    pub const SHUFFLE: bool = true;

    /// Chunks submitted to the pool ahead of the consumer
    pub const PREFETCH_CHUNKS: usize = 2;

    /// Batch size used when nothing is configured
    pub const BATCH_SIZE: usize = 1;
}

/// Filesystem layout under a dataset root
pub mod layout {
    /// Subdirectory created on demand for cached artifacts
    pub const CACHE_DIR_NAME: &str = "cache";

    /// Maximum number of missing directory levels created by `ensure_dir`
    pub const MKDIR_MAX_DEPTH: usize = 3;

    /// Default directory for JSON log files, relative to the working directory
    pub const LOG_DIR_NAME: &str = "log";
}

/// Environment variables
pub mod env {
    /// Prefix for configuration overrides, e.g. `IMDB_BATCH_SIZE`
    pub const CONFIG_PREFIX: &str = "IMDB";

    /// Primary environment selector
    pub const ENVIRONMENT: &str = "IMDB_ENV";

    /// Fallback environment selector
    pub const APP_ENVIRONMENT: &str = "APP_ENV";

    /// Overrides the JSON log file directory
    pub const LOG_DIR: &str = "IMDB_LOG_DIR";

    /// Environment used when none is set
    pub const DEFAULT_ENVIRONMENT: &str = "development";
}

/// Thread naming for pool workers
pub const WORKER_THREAD_PREFIX: &str = "imdb-worker";

/// Number of columns in a detection row: `x1, y1, x2, y2, score`
pub const DETECTION_COLUMNS: usize = 5;

/// Lifecycle state of the batch cycler's lazy sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceState {
    /// No sequence has been created yet (or it was dropped by `close`)
    Missing,
    /// A sequence is live and may still yield samples
    Active,
    /// The worker pool was closed
    Closed,
}

impl std::fmt::Display for SequenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::Active => write!(f, "active"),
            Self::Closed => write!(f, "closed"),
        }
    }
}
