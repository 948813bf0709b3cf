//! Dataset error types

use thiserror::Error;

/// Error type shared by the batch cycler, the worker pool and the config layer
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Config source error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Dataset '{0}' contains no images")]
    EmptyDataset(String),

    #[error("Worker pool is closed")]
    PoolClosed,

    /// `index` is the input position for a bare `imap`, the image index when
    /// raised by `ImageDataset::next_batch`
    #[error("Worker panicked while processing item {index}: {message}")]
    WorkerPanic { index: usize, message: String },

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Async runtime error: {0}")]
    Runtime(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Source error: {0}")]
    Source(#[from] anyhow::Error),
}

impl DatasetError {
    /// Whether the error came from the pool rather than from user-supplied code
    pub fn is_pool_error(&self) -> bool {
        matches!(self, Self::PoolClosed | Self::WorkerPanic { .. })
    }
}

/// Result type alias for DatasetError
pub type Result<T> = std::result::Result<T, DatasetError>;
