//! The capabilities a concrete dataset provides to the batch cycler.

use std::path::Path;

use super::types::{DetectionSet, EvaluationReport, LoadedDataset, Sample};
use crate::error::{DatasetError, Result};

/// Dataset-specific behavior plugged into an [`ImageDataset`](super::ImageDataset)
///
/// `load_dataset` runs once when the dataset is created. `preprocess` runs on the
/// worker pool, concurrently, once per image per epoch.
///
/// Implementations can return `anyhow` errors with `?`; they surface as
/// [`DatasetError::Source`].
pub trait DatasetSource: Send + Sync + 'static {
    /// Per-image ground truth as parsed by the source
    type Annotation: Clone + Send + Sync + 'static;

    /// Populate image names, annotations and classes from `data_dir`
    fn load_dataset(&self, data_dir: &Path) -> Result<LoadedDataset<Self::Annotation>>;

    /// Turn one image and its annotation into a training sample
    fn preprocess(&self, image_path: &str, annotation: &Self::Annotation) -> Result<Sample>;

    /// Score detections against the ground truth
    ///
    /// `all_boxes[class][image]` holds `#dets x 5` arrays. Results may be written
    /// under `output_dir`.
    fn evaluate_detections(
        &self,
        all_boxes: &DetectionSet,
        output_dir: Option<&Path>,
    ) -> Result<EvaluationReport> {
        let _ = (all_boxes, output_dir);
        Err(DatasetError::Unsupported(
            "evaluate_detections is not implemented for this dataset".to_string(),
        ))
    }
}
