//! Image decoding helpers for [`DatasetSource::preprocess`](crate::dataset::DatasetSource::preprocess)
//! implementations.
//!
//! Images become `H x W x 3` `f32` tensors with values in `[0, 1]`.

use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use ndarray::{Array3, Axis};
use std::path::Path;

use crate::error::{DatasetError, Result};

/// ImageNet channel means, RGB order
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations, RGB order
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Decode an image file into an RGB tensor
pub fn decode_image(path: impl AsRef<Path>) -> Result<Array3<f32>> {
    let image = image::open(path.as_ref())?;
    Ok(rgb_to_array(&image.to_rgb8()))
}

/// Decode and resize to `width x height`
///
/// Also returns the `(x, y)` scale factors to apply to boxes in the original
/// image's coordinates.
pub fn decode_resized(
    path: impl AsRef<Path>,
    width: u32,
    height: u32,
) -> Result<(Array3<f32>, (f32, f32))> {
    if width == 0 || height == 0 {
        return Err(DatasetError::Validation(format!(
            "cannot resize to {width}x{height}"
        )));
    }
    let image = image::open(path.as_ref())?;
    let scale = (
        width as f32 / image.width().max(1) as f32,
        height as f32 / image.height().max(1) as f32,
    );
    let resized = resize_image(&image, width, height);
    Ok((rgb_to_array(&resized), scale))
}

/// Bilinear resize to exactly `width x height`
pub fn resize_image(image: &DynamicImage, width: u32, height: u32) -> RgbImage {
    image::imageops::resize(&image.to_rgb8(), width, height, FilterType::Triangle)
}

/// Convert 8-bit RGB pixels to an `H x W x 3` tensor in `[0, 1]`
pub fn rgb_to_array(image: &RgbImage) -> Array3<f32> {
    let (width, height) = image.dimensions();
    Array3::from_shape_fn((height as usize, width as usize, 3), |(y, x, c)| {
        image.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
    })
}

/// Subtract `mean` and divide by `std` per channel, in place
pub fn normalize(image: &mut Array3<f32>, mean: [f32; 3], std: [f32; 3]) -> Result<()> {
    if image.shape()[2] != 3 {
        return Err(DatasetError::ShapeMismatch {
            expected: vec![image.shape()[0], image.shape()[1], 3],
            actual: image.shape().to_vec(),
        });
    }
    if std.iter().any(|s| *s == 0.0) {
        return Err(DatasetError::Validation(
            "standard deviation must be non-zero".to_string(),
        ));
    }

    for (channel, mut plane) in image.axis_iter_mut(Axis(2)).enumerate() {
        plane.mapv_inplace(|v| (v - mean[channel]) / std[channel]);
    }
    Ok(())
}
