//! # Image Detection Datasets
//!
//! [`ImageDataset`] cycles through a dataset's images in fixed-size batches,
//! preprocessing them on a [`WorkerPool`](crate::pool::WorkerPool). Everything
//! dataset-specific (annotation parsing, the class list, per-image preprocessing,
//! evaluation) comes from a [`DatasetSource`] implementation.
//!
//! ```rust,no_run
//! use imdb::config::DatasetConfig;
//! use imdb::dataset::{DatasetSource, ImageDataset, LoadedDataset, Sample};
//! use imdb::vision;
//! use std::path::Path;
//!
//! struct Folder;
//!
//! impl DatasetSource for Folder {
//!     type Annotation = Vec<[f32; 4]>;
//!
//!     fn load_dataset(&self, data_dir: &Path) -> imdb::Result<LoadedDataset<Self::Annotation>> {
//!         let image = data_dir.join("0001.png").display().to_string();
//!         Ok(LoadedDataset::new(vec!["car".into()], vec![image], vec![vec![]]))
//!     }
//!
//!     fn preprocess(&self, image_path: &str, boxes: &Self::Annotation) -> imdb::Result<Sample> {
//!         let image = vision::decode_image(image_path)?;
//!         let gt_boxes = boxes.iter().copied().map(Into::into).collect();
//!         let classes = vec![0; boxes.len()];
//!         Ok(Sample::new(image).with_objects(gt_boxes, classes))
//!     }
//! }
//!
//! # fn main() -> imdb::Result<()> {
//! let config = DatasetConfig::new("folder", "data/folder").with_batch_size(8);
//! let mut dataset = ImageDataset::new(config, Folder)?;
//! let batch = dataset.next_batch()?;
//! println!("epoch {} -> {:?}", dataset.epoch(), batch.images.shape());
//! dataset.close();
//! # Ok(())
//! # }
//! ```

mod image_dataset;
mod source;
mod types;

pub use image_dataset::ImageDataset;
pub use source::DatasetSource;
pub use types::{Batch, BoundingBox, DetectionSet, EvaluationReport, LoadedDataset, Sample};
