//! Value types flowing through the batch cycler.

use ndarray::{Array2, Array3, Array4, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::DETECTION_COLUMNS;
use crate::error::{DatasetError, Result};

/// Axis-aligned box in pixel coordinates: `[x1, y1, x2, y2]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct BoundingBox {
    pub coords: [f32; 4],
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            coords: [x1, y1, x2, y2],
        }
    }

    pub fn width(&self) -> f32 {
        (self.coords[2] - self.coords[0]).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.coords[3] - self.coords[1]).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Scale all coordinates, e.g. after resizing the image
    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        let [x1, y1, x2, y2] = self.coords;
        Self::new(x1 * sx, y1 * sy, x2 * sx, y2 * sy)
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from(coords: [f32; 4]) -> Self {
        Self { coords }
    }
}

/// One preprocessed training example
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Image tensor, `H x W x C`
    pub image: Array3<f32>,

    /// Ground-truth boxes
    pub gt_boxes: Vec<BoundingBox>,

    /// Class label of each ground-truth box
    pub classes: Vec<usize>,

    /// Regions excluded from the loss
    pub dontcare: Vec<BoundingBox>,
}

impl Sample {
    pub fn new(image: Array3<f32>) -> Self {
        Self {
            image,
            gt_boxes: Vec::new(),
            classes: Vec::new(),
            dontcare: Vec::new(),
        }
    }

    pub fn with_objects(mut self, gt_boxes: Vec<BoundingBox>, classes: Vec<usize>) -> Self {
        self.gt_boxes = gt_boxes;
        self.classes = classes;
        self
    }

    pub fn with_dontcare(mut self, dontcare: Vec<BoundingBox>) -> Self {
        self.dontcare = dontcare;
        self
    }
}

/// A fixed-size group of samples with images stacked along a leading batch axis
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Stacked images, `N x H x W x C`
    pub images: Array4<f32>,
    pub gt_boxes: Vec<Vec<BoundingBox>>,
    pub classes: Vec<Vec<usize>>,
    pub dontcare: Vec<Vec<BoundingBox>>,
}

impl Batch {
    pub fn empty() -> Self {
        Self {
            images: Array4::zeros((0, 0, 0, 0)),
            gt_boxes: Vec::new(),
            classes: Vec::new(),
            dontcare: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.gt_boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gt_boxes.is_empty()
    }

    /// Stack samples into a batch; all images must share one shape
    pub fn from_samples(samples: Vec<Sample>) -> Result<Self> {
        let Some(first) = samples.first() else {
            return Ok(Self::empty());
        };
        let expected = first.image.shape().to_vec();
        if let Some(mismatch) = samples.iter().find(|s| s.image.shape() != expected.as_slice()) {
            return Err(DatasetError::ShapeMismatch {
                expected,
                actual: mismatch.image.shape().to_vec(),
            });
        }

        let images = {
            let views: Vec<_> = samples.iter().map(|s| s.image.view()).collect();
            ndarray::stack(Axis(0), &views).map_err(|e| {
                DatasetError::Validation(format!(
                    "failed to stack {} images of shape {expected:?}: {e}",
                    views.len()
                ))
            })?
        };

        let mut batch = Self {
            images,
            gt_boxes: Vec::with_capacity(samples.len()),
            classes: Vec::with_capacity(samples.len()),
            dontcare: Vec::with_capacity(samples.len()),
        };
        for sample in samples {
            batch.gt_boxes.push(sample.gt_boxes);
            batch.classes.push(sample.classes);
            batch.dontcare.push(sample.dontcare);
        }
        Ok(batch)
    }
}

/// Everything a [`DatasetSource`](super::DatasetSource) produces when loading a dataset
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDataset<A> {
    /// Class names; the label of a class is its position
    pub classes: Vec<String>,

    /// Image paths handed to `preprocess`, in dataset order
    pub image_names: Vec<String>,

    /// Dataset-native image ids; empty or one per image
    pub image_indexes: Vec<String>,

    /// Annotation of each image, parallel to `image_names`
    pub annotations: Vec<A>,

    /// Dataset-specific options
    pub options: BTreeMap<String, serde_json::Value>,
}

impl<A> Default for LoadedDataset<A> {
    fn default() -> Self {
        Self {
            classes: Vec::new(),
            image_names: Vec::new(),
            image_indexes: Vec::new(),
            annotations: Vec::new(),
            options: BTreeMap::new(),
        }
    }
}

impl<A> LoadedDataset<A> {
    pub fn new(classes: Vec<String>, image_names: Vec<String>, annotations: Vec<A>) -> Self {
        Self {
            classes,
            image_names,
            annotations,
            ..Self::default()
        }
    }

    pub fn with_image_indexes(mut self, image_indexes: Vec<String>) -> Self {
        self.image_indexes = image_indexes;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Check that the per-image lists line up
    pub fn validate(&self) -> Result<()> {
        if self.image_names.len() != self.annotations.len() {
            return Err(DatasetError::Validation(format!(
                "{} image names but {} annotations",
                self.image_names.len(),
                self.annotations.len()
            )));
        }
        if !self.image_indexes.is_empty() && self.image_indexes.len() != self.image_names.len() {
            return Err(DatasetError::Validation(format!(
                "{} image indexes but {} image names",
                self.image_indexes.len(),
                self.image_names.len()
            )));
        }
        Ok(())
    }
}

/// Detections to evaluate: `all_boxes[class][image]` is a `#dets x 5` array of
/// `x1, y1, x2, y2, score`; zero rows means no detections.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetectionSet {
    pub all_boxes: Vec<Vec<Array2<f32>>>,
}

impl DetectionSet {
    /// A set with no detections for every class and image
    pub fn empty(num_classes: usize, num_images: usize) -> Self {
        Self {
            all_boxes: (0..num_classes)
                .map(|_| {
                    (0..num_images)
                        .map(|_| Array2::zeros((0, DETECTION_COLUMNS)))
                        .collect()
                })
                .collect(),
        }
    }

    /// Replace the detections of one class in one image
    pub fn set(&mut self, class: usize, image: usize, detections: Array2<f32>) -> Result<()> {
        if detections.ncols() != DETECTION_COLUMNS {
            return Err(DatasetError::ShapeMismatch {
                expected: vec![detections.nrows(), DETECTION_COLUMNS],
                actual: detections.shape().to_vec(),
            });
        }
        let slot = self
            .all_boxes
            .get_mut(class)
            .and_then(|per_image| per_image.get_mut(image))
            .ok_or_else(|| {
                DatasetError::Validation(format!("no slot for class {class}, image {image}"))
            })?;
        *slot = detections;
        Ok(())
    }

    pub fn num_classes(&self) -> usize {
        self.all_boxes.len()
    }

    pub fn num_detections(&self) -> usize {
        self.all_boxes
            .iter()
            .flat_map(|per_image| per_image.iter())
            .map(|dets| dets.nrows())
            .sum()
    }

    /// Check the set matches a dataset with the given class and image counts
    pub fn validate(&self, num_classes: usize, num_images: usize) -> Result<()> {
        if self.all_boxes.len() != num_classes {
            return Err(DatasetError::Validation(format!(
                "expected detections for {num_classes} classes, got {}",
                self.all_boxes.len()
            )));
        }
        for (class, per_image) in self.all_boxes.iter().enumerate() {
            if per_image.len() != num_images {
                return Err(DatasetError::Validation(format!(
                    "class {class}: expected {num_images} images, got {}",
                    per_image.len()
                )));
            }
            if let Some(bad) = per_image
                .iter()
                .find(|dets| dets.nrows() > 0 && dets.ncols() != DETECTION_COLUMNS)
            {
                return Err(DatasetError::ShapeMismatch {
                    expected: vec![bad.nrows(), DETECTION_COLUMNS],
                    actual: bad.shape().to_vec(),
                });
            }
        }
        Ok(())
    }
}

/// Metric name to value, e.g. per-class AP and `mAP`
pub type EvaluationReport = BTreeMap<String, f64>;

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_bounding_box_geometry() {
        let bbox = BoundingBox::new(10.0, 20.0, 30.0, 60.0);
        assert_eq!(bbox.width(), 20.0);
        assert_eq!(bbox.height(), 40.0);
        assert_eq!(bbox.area(), 800.0);
        assert_eq!(bbox.scaled(0.5, 0.25).coords, [5.0, 5.0, 15.0, 15.0]);

        let inverted = BoundingBox::new(5.0, 5.0, 1.0, 1.0);
        assert_eq!(inverted.area(), 0.0);
    }

    #[test]
    fn test_batch_stacks_images() {
        let samples = vec![
            Sample::new(Array3::from_elem((2, 3, 1), 1.0))
                .with_objects(vec![BoundingBox::new(0.0, 0.0, 1.0, 1.0)], vec![4]),
            Sample::new(Array3::from_elem((2, 3, 1), 2.0))
                .with_dontcare(vec![BoundingBox::new(1.0, 1.0, 2.0, 2.0)]),
        ];
        let batch = Batch::from_samples(samples).unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.images.shape(), &[2, 2, 3, 1]);
        assert_eq!(batch.images[[0, 1, 2, 0]], 1.0);
        assert_eq!(batch.images[[1, 0, 0, 0]], 2.0);
        assert_eq!(batch.classes, vec![vec![4], vec![]]);
        assert_eq!(batch.dontcare[1].len(), 1);
    }

    #[test]
    fn test_batch_rejects_mixed_shapes() {
        let samples = vec![
            Sample::new(Array3::zeros((2, 2, 3))),
            Sample::new(Array3::zeros((4, 2, 3))),
        ];
        let err = Batch::from_samples(samples).unwrap_err();
        match err {
            DatasetError::ShapeMismatch { expected, actual } => {
                assert_eq!(expected, vec![2, 2, 3]);
                assert_eq!(actual, vec![4, 2, 3]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_batch() {
        let batch = Batch::from_samples(Vec::new()).unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.images.shape()[0], 0);
    }

    #[test]
    fn test_loaded_dataset_validation() {
        let ok = LoadedDataset::new(
            vec!["car".to_string()],
            vec!["a.png".to_string(), "b.png".to_string()],
            vec![1, 2],
        );
        assert!(ok.validate().is_ok());

        let mismatched = LoadedDataset::new(vec![], vec!["a.png".to_string()], vec![1, 2]);
        assert!(matches!(
            mismatched.validate(),
            Err(DatasetError::Validation(_))
        ));

        let bad_indexes = ok.clone().with_image_indexes(vec!["000001".to_string()]);
        assert!(matches!(
            bad_indexes.validate(),
            Err(DatasetError::Validation(_))
        ));
    }

    #[test]
    fn test_detection_set_shape_checks() {
        let mut detections = DetectionSet::empty(2, 3);
        assert!(detections.validate(2, 3).is_ok());
        assert!(detections.validate(3, 3).is_err());
        assert!(detections.validate(2, 4).is_err());

        detections
            .set(1, 2, array![[0.0, 0.0, 5.0, 5.0, 0.9], [1.0, 1.0, 2.0, 2.0, 0.3]])
            .unwrap();
        assert_eq!(detections.num_detections(), 2);

        assert!(detections.set(0, 0, Array2::zeros((1, 4))).is_err());
        assert!(detections.set(5, 0, Array2::zeros((1, 5))).is_err());
    }
}
