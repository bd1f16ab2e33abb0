//! Gradient-based edge detectors and mask arithmetic.
//!
//! Detectors take a grayscale image and return either a binary edge map
//! (255 = edge) or an edge *strength* image that callers binarize with
//! [`crate::threshold::binarize_above`]. Gradients are computed in wider
//! integer types and clamped back into `0..=255` before any thresholding.

use image::{GrayImage, Luma};
use imageproc::filter::filter_clamped;
use imageproc::kernel::Kernel;

/// Minimum allowed Canny threshold.
///
/// A low threshold of zero turns every pixel with any gradient into a
/// candidate edge.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Detect edges using the Canny algorithm.
///
/// Returns a binary image: 255 for edge pixels, 0 for non-edge.
///
/// Both thresholds are clamped to a minimum of [`MIN_THRESHOLD`] and
/// `low_threshold` is clamped to be at most `high_threshold`.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let high = high_threshold.max(MIN_THRESHOLD);
    let low = low_threshold.max(MIN_THRESHOLD).min(high);
    imageproc::edges::canny(image, low, high)
}

/// Sobel gradient magnitude, min-max normalized to `0..=255`.
///
/// A featureless image has zero magnitude everywhere and returns an
/// all-zero image rather than dividing by zero.
#[must_use = "returns the gradient magnitude image"]
pub fn sobel_magnitude(image: &GrayImage) -> GrayImage {
    let gx = imageproc::gradients::horizontal_sobel(image);
    let gy = imageproc::gradients::vertical_sobel(image);
    let magnitude: Vec<f32> = gx
        .pixels()
        .zip(gy.pixels())
        .map(|(x, y)| f32::from(x.0[0]).hypot(f32::from(y.0[0])))
        .collect();
    let max = magnitude.iter().copied().fold(0.0f32, f32::max);
    let scale = if max > 0.0 { 255.0 / max } else { 0.0 };
    let w = image.width() as usize;
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let m = magnitude[y as usize * w + x as usize];
        Luma([crate::grayscale::to_u8(m * scale)])
    })
}

/// Absolute value of the 4-neighbour Laplacian, clamped to `0..=255`.
#[must_use = "returns the Laplacian magnitude image"]
pub fn laplacian_abs(image: &GrayImage) -> GrayImage {
    let laplacian = imageproc::filter::laplacian_filter(image);
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let v = laplacian.get_pixel(x, y).0[0].unsigned_abs();
        Luma([u8::try_from(v).unwrap_or(u8::MAX)])
    })
}

/// 3x3 "find edges" kernel: 8 at the center, -1 on every neighbour.
const FIND_EDGES_KERNEL: [i32; 9] = [-1, -1, -1, -1, 8, -1, -1, -1, -1];

/// Classic "find edges" filter: the 8-neighbour Laplacian, clamped to
/// `0..=255` (negative responses become 0, so only the brighter side of
/// a boundary lights up). Borders replicate the edge pixels.
#[must_use = "returns the edge strength image"]
pub fn find_edges(image: &GrayImage) -> GrayImage {
    filter_clamped::<_, i32, u8>(image, Kernel::new(&FIND_EDGES_KERNEL, 3, 3))
}

/// Invert a binary mask (bitwise NOT).
///
/// Swaps line pixels (255 -> 0) and background pixels (0 -> 255). This is
/// the final step that turns a line mask into black-on-white line art.
#[must_use = "returns the inverted mask"]
pub fn invert(mask: &GrayImage) -> GrayImage {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        Luma([!mask.get_pixel(x, y).0[0]])
    })
}

/// Pixel-wise OR of two masks of the same size.
#[must_use = "returns the combined mask"]
pub fn union(a: &GrayImage, b: &GrayImage) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y).0[0] | b.get_pixel(x, y).0[0]])
    })
}

/// Pixel-wise AND of two masks of the same size.
#[must_use = "returns the intersected mask"]
pub fn intersection(a: &GrayImage, b: &GrayImage) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y).0[0] & b.get_pixel(x, y).0[0]])
    })
}

/// Number of nonzero pixels in a mask.
#[must_use]
pub fn count_foreground(mask: &GrayImage) -> u64 {
    mask.pixels().map(|p| u64::from(p.0[0] != 0)).sum()
}
