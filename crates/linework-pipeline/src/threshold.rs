//! Binarization: global and adaptive thresholds.
//!
//! Every function here produces a mask in the pipeline's convention:
//! 255 marks a line, 0 marks background.

use image::{GrayImage, Luma};
use imageproc::contrast::ThresholdType;
use imageproc::integral_image::{integral_image, sum_image_pixels};
use serde::{Deserialize, Serialize};

/// How the local reference level of an adaptive threshold is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdaptiveMethod {
    /// Unweighted mean of the block.
    Mean,
    /// Gaussian-weighted mean of the block.
    Gaussian,
}

/// 255 where the sample is strictly greater than `level`.
#[must_use = "returns the binary mask"]
pub fn binarize_above(image: &GrayImage, level: u8) -> GrayImage {
    imageproc::contrast::threshold(image, level, ThresholdType::Binary)
}

/// 255 where the sample is strictly less than `level`.
#[must_use = "returns the binary mask"]
pub fn binarize_below(image: &GrayImage, level: u8) -> GrayImage {
    match level.checked_sub(1) {
        Some(at_most) => {
            imageproc::contrast::threshold(image, at_most, ThresholdType::BinaryInverted)
        }
        None => GrayImage::new(image.width(), image.height()),
    }
}

/// Mark pixels darker than their neighbourhood.
///
/// A pixel becomes a line when `value - local_level <= -offset`, where
/// `local_level` is the (rounded) mean of the `block_size` square around
/// it. Dark strokes on a lighter surround become foreground; a flat field
/// produces an empty mask for any positive `offset`. `block_size` is
/// forced odd and at least 3.
#[must_use = "returns the binary mask"]
pub fn adaptive_threshold(
    image: &GrayImage,
    block_size: u32,
    offset: i32,
    method: AdaptiveMethod,
) -> GrayImage {
    let block = (block_size.max(3)) | 1;
    let level = match method {
        AdaptiveMethod::Mean => box_mean(image, block / 2),
        AdaptiveMethod::Gaussian => crate::blur::gaussian_blur(image, block),
    };
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let v = i32::from(image.get_pixel(x, y).0[0]);
        let m = i32::from(level.get_pixel(x, y).0[0]);
        Luma([if v - m <= -offset { 255 } else { 0 }])
    })
}

/// Mean over the `(2r+1)^2` window around each pixel, restricted to the
/// image and rounded to the nearest level.
#[must_use]
pub fn box_mean(image: &GrayImage, radius: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    let integral = integral_image::<_, u64>(image);
    GrayImage::from_fn(w, h, |x, y| {
        let (left, top) = (x.saturating_sub(radius), y.saturating_sub(radius));
        let right = x.saturating_add(radius).min(w - 1);
        let bottom = y.saturating_add(radius).min(h - 1);
        let [sum] = sum_image_pixels(&integral, left, top, right, bottom);
        let count = u64::from(right - left + 1) * u64::from(bottom - top + 1);
        Luma([u8::try_from((sum + count / 2) / count).unwrap_or(u8::MAX)])
    })
}
