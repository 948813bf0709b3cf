//! Shared fixtures for integration tests.
#![allow(dead_code)]

use anyhow::Context;
use image::{Rgb, RgbImage};
use imdb::{
    BoundingBox, DatasetConfig, DatasetSource, DetectionSet, EvaluationReport, LoadedDataset,
    Result, Sample,
};
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ANNOTATION_FILE: &str = "annotations.json";

/// Ground truth for one image as stored in `annotations.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectAnnotation {
    pub boxes: Vec<[f32; 4]>,
    pub classes: Vec<usize>,
    #[serde(default)]
    pub dontcare: Vec<[f32; 4]>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ImageEntry {
    id: String,
    file: String,
    objects: ObjectAnnotation,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnnotationFile {
    classes: Vec<String>,
    images: Vec<ImageEntry>,
}

/// Reads `annotations.json` under the data dir and decodes PNGs from `images/`
pub struct JsonDetectionSource {
    pub score_threshold: f32,
}

impl Default for JsonDetectionSource {
    fn default() -> Self {
        Self {
            score_threshold: 0.5,
        }
    }
}

impl DatasetSource for JsonDetectionSource {
    type Annotation = ObjectAnnotation;

    fn load_dataset(&self, data_dir: &Path) -> Result<LoadedDataset<ObjectAnnotation>> {
        let path = data_dir.join(ANNOTATION_FILE);
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let parsed: AnnotationFile =
            serde_json::from_str(&raw).context("malformed annotation file")?;

        let mut image_names = Vec::with_capacity(parsed.images.len());
        let mut image_indexes = Vec::with_capacity(parsed.images.len());
        let mut annotations = Vec::with_capacity(parsed.images.len());
        for entry in parsed.images {
            image_names.push(data_dir.join("images").join(&entry.file).display().to_string());
            image_indexes.push(entry.id);
            annotations.push(entry.objects);
        }

        Ok(
            LoadedDataset::new(parsed.classes, image_names, annotations)
                .with_image_indexes(image_indexes)
                .with_option("score_threshold", serde_json::json!(self.score_threshold)),
        )
    }

    fn preprocess(&self, image_path: &str, annotation: &ObjectAnnotation) -> Result<Sample> {
        let image = imdb::vision::decode_image(image_path)?;
        let gt_boxes = annotation.boxes.iter().copied().map(BoundingBox::from).collect();
        let dontcare = annotation.dontcare.iter().copied().map(BoundingBox::from).collect();
        Ok(Sample::new(image)
            .with_objects(gt_boxes, annotation.classes.clone())
            .with_dontcare(dontcare))
    }

    fn evaluate_detections(
        &self,
        all_boxes: &DetectionSet,
        output_dir: Option<&Path>,
    ) -> Result<EvaluationReport> {
        let mut report = EvaluationReport::new();
        for (class, per_image) in all_boxes.all_boxes.iter().enumerate() {
            let confident = per_image
                .iter()
                .flat_map(|dets| dets.rows().into_iter().map(|row| row[4]).collect::<Vec<_>>())
                .filter(|score| *score >= self.score_threshold)
                .count();
            report.insert(format!("class_{class}"), confident as f64);
        }
        if let Some(dir) = output_dir {
            let json = serde_json::to_string_pretty(&report).context("serialize report")?;
            std::fs::write(dir.join("report.json"), json)?;
        }
        Ok(report)
    }
}

/// Write `count` solid-color `width x height` PNGs plus `annotations.json`
///
/// Image `i` has every channel set to `i` and one box of class `i % 2`.
pub fn write_fixture_dataset(root: &Path, count: usize, width: u32, height: u32) -> PathBuf {
    let data_dir = root.join("fixture");
    let images_dir = data_dir.join("images");
    std::fs::create_dir_all(&images_dir).unwrap();

    let mut images = Vec::with_capacity(count);
    for i in 0..count {
        let file = format!("{i:06}.png");
        let value = i as u8;
        RgbImage::from_pixel(width, height, Rgb([value, value, value]))
            .save(images_dir.join(&file))
            .unwrap();
        images.push(ImageEntry {
            id: format!("{i:06}"),
            file,
            objects: ObjectAnnotation {
                boxes: vec![[0.0, 0.0, width as f32 / 2.0, height as f32 / 2.0]],
                classes: vec![i % 2],
                dontcare: Vec::new(),
            },
        });
    }

    let annotations = AnnotationFile {
        classes: vec!["car".to_string(), "pedestrian".to_string()],
        images,
    };
    std::fs::write(
        data_dir.join(ANNOTATION_FILE),
        serde_json::to_string(&annotations).unwrap(),
    )
    .unwrap();
    data_dir
}

/// Recover the fixture index of each image in a batch from its pixel value
pub fn fixture_ids(batch: &imdb::Batch) -> Vec<usize> {
    (0..batch.len())
        .map(|i| (batch.images[[i, 0, 0, 0]] * 255.0).round() as usize)
        .collect()
}

/// In-memory source: image `i` is a 1x1x1 tensor holding `i`
pub struct IndexSource {
    pub count: usize,
}

impl DatasetSource for IndexSource {
    type Annotation = usize;

    fn load_dataset(&self, _data_dir: &Path) -> Result<LoadedDataset<usize>> {
        Ok(LoadedDataset::new(
            vec!["thing".to_string()],
            (0..self.count).map(|i| format!("{i}.png")).collect(),
            (0..self.count).collect(),
        ))
    }

    fn preprocess(&self, _image_path: &str, annotation: &usize) -> Result<Sample> {
        Ok(Sample::new(Array3::from_elem((1, 1, 1), *annotation as f32)))
    }
}

pub fn index_ids(batch: &imdb::Batch) -> Vec<usize> {
    (0..batch.len())
        .map(|i| batch.images[[i, 0, 0, 0]] as usize)
        .collect()
}

pub fn config(name: &str, data_dir: &Path, batch_size: usize) -> DatasetConfig {
    DatasetConfig::new(name, data_dir)
        .with_batch_size(batch_size)
        .with_processes(2)
        .with_seed(1234)
}
