//! Smoothing filters.
//!
//! [`bilateral`] is the edge-preserving smoother of the preprocessing
//! stage: it averages each pixel with neighbours that are both spatially
//! close and similar in value, so flat regions lose their sensor noise
//! while strong gradients survive for the extractors.
//!
//! [`gaussian_blur`] and [`median_blur`] are the plain smoothers some
//! extractors apply on top. Both take OpenCV-style odd kernel sizes.

use image::{GrayImage, RgbImage};
use imageproc::filter::bilateral::GaussianEuclideanColorDistance;
use imageproc::filter::bilateral_filter;

use crate::types::Bitmap;

/// Bilateral neighbourhood diameter in pixels.
pub const BILATERAL_DIAMETER: u32 = 9;
/// Bilateral intensity sigma.
pub const BILATERAL_SIGMA_COLOR: f32 = 75.0;
/// Bilateral spatial sigma.
pub const BILATERAL_SIGMA_SPACE: f32 = 75.0;

/// Apply the default bilateral filter to a bitmap of either kind.
#[must_use = "returns the smoothed bitmap"]
pub fn smooth(bitmap: &Bitmap) -> Bitmap {
    let params = BilateralParams::default();
    match bitmap {
        Bitmap::Gray(img) => Bitmap::Gray(bilateral(img, params)),
        Bitmap::Rgb(img) => Bitmap::Rgb(bilateral_rgb(img, params)),
    }
}

/// Parameters of the bilateral filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BilateralParams {
    /// Neighbourhood diameter; the window is the square of radius
    /// `diameter / 2`.
    pub diameter: u32,
    /// Intensity sigma: larger values let more dissimilar neighbours in.
    pub sigma_color: f32,
    /// Spatial sigma: larger values weight distant neighbours more.
    pub sigma_space: f32,
}

impl Default for BilateralParams {
    fn default() -> Self {
        Self {
            diameter: BILATERAL_DIAMETER,
            sigma_color: BILATERAL_SIGMA_COLOR,
            sigma_space: BILATERAL_SIGMA_SPACE,
        }
    }
}

impl BilateralParams {
    /// Window radius for `imageproc`, or `None` when the parameters make
    /// the filter a no-op.
    fn radius(self) -> Option<u8> {
        if self.diameter < 2 || self.sigma_color <= 0.0 || self.sigma_space <= 0.0 {
            return None;
        }
        Some(u8::try_from(self.diameter / 2).unwrap_or(u8::MAX))
    }
}

/// Bilateral filter on a grayscale image.
///
/// Borders replicate the edge pixels. A diameter below 2 returns the
/// image unchanged.
#[must_use = "returns the smoothed image"]
pub fn bilateral(image: &GrayImage, params: BilateralParams) -> GrayImage {
    match params.radius() {
        Some(radius) if image.width() > 0 && image.height() > 0 => bilateral_filter(
            image,
            radius,
            params.sigma_space,
            GaussianEuclideanColorDistance::new(params.sigma_color),
        ),
        _ => image.clone(),
    }
}

/// Bilateral filter on an RGB image.
///
/// The range weight uses the Euclidean distance between the two colors,
/// and one weight per neighbour is applied to all three channels so that
/// hues are not shifted independently.
#[must_use = "returns the smoothed image"]
pub fn bilateral_rgb(image: &RgbImage, params: BilateralParams) -> RgbImage {
    match params.radius() {
        Some(radius) if image.width() > 0 && image.height() > 0 => bilateral_filter(
            image,
            radius,
            params.sigma_space,
            GaussianEuclideanColorDistance::new(params.sigma_color),
        ),
        _ => image.clone(),
    }
}

/// Gaussian sigma OpenCV derives for an odd kernel size.
#[must_use]
pub fn sigma_for_kernel(kernel_size: u32) -> f32 {
    #[allow(clippy::cast_precision_loss)]
    let k = kernel_size.max(1) as f32;
    0.3f32.mul_add((k - 1.0).mul_add(0.5, -1.0), 0.8)
}

/// Gaussian blur of a grayscale image with a kernel of `kernel_size`
/// pixels.
///
/// Kernel sizes below 3 return the image unchanged.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, kernel_size: u32) -> GrayImage {
    if kernel_size < 3 {
        return image.clone();
    }
    imageproc::filter::gaussian_blur_f32(image, sigma_for_kernel(kernel_size))
}

/// Median blur of a grayscale image over a `kernel_size` square.
#[must_use = "returns the blurred image"]
pub fn median_blur(image: &GrayImage, kernel_size: u32) -> GrayImage {
    let radius = kernel_size / 2;
    if radius == 0 {
        return image.clone();
    }
    imageproc::filter::median_filter(image, radius, radius)
}

/// Median blur of an RGB image, each channel independently.
#[must_use = "returns the blurred image"]
pub fn median_blur_rgb(image: &RgbImage, kernel_size: u32) -> RgbImage {
    let radius = kernel_size / 2;
    if radius == 0 {
        return image.clone();
    }
    imageproc::filter::median_filter(image, radius, radius)
}

#[cfg(test)]
mod tests {
    use image::{Luma, Rgb};

    use super::*;

    /// 20x20 image with a sharp black-to-white boundary at x = 10.
    fn sharp_edge_image() -> GrayImage {
        GrayImage::from_fn(20, 20, |x, _y| {
            if x < 10 { Luma([0]) } else { Luma([255]) }
        })
    }

    /// Deterministic pseudo-noise around 128.
    #[allow(clippy::cast_possible_truncation)]
    fn noisy_flat_image() -> GrayImage {
        GrayImage::from_fn(30, 30, |x, y| {
            let n = (x * 7 + y * 13) % 11;
            Luma([(123 + n) as u8])
        })
    }

    fn variance(img: &GrayImage) -> f64 {
        let values: Vec<f64> = img.pixels().map(|p| f64::from(p.0[0])).collect();
        #[allow(clippy::cast_precision_loss)]
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
    }

    #[test]
    fn bilateral_preserves_hard_edge() {
        let img = sharp_edge_image();
        let out = bilateral(&img, BilateralParams::default());
        // 255 intensity distance gives a negligible range weight at sigma 75.
        assert!(out.get_pixel(9, 10).0[0] < 10);
        assert!(out.get_pixel(10, 10).0[0] > 245);
    }

    #[test]
    fn bilateral_reduces_noise() {
        let img = noisy_flat_image();
        let out = bilateral(&img, BilateralParams::default());
        assert!(variance(&out) < variance(&img));
    }

    #[test]
    fn bilateral_uniform_stays_uniform() {
        let img = GrayImage::from_pixel(12, 12, Luma([77]));
        let out = bilateral(&img, BilateralParams::default());
        let first = *out.get_pixel(0, 0);
        assert!(out.pixels().all(|p| *p == first));
        assert!(first.0[0].abs_diff(77) <= 1);
    }

    #[test]
    fn bilateral_zero_diameter_is_identity() {
        let img = noisy_flat_image();
        let params = BilateralParams {
            diameter: 0,
            ..BilateralParams::default()
        };
        assert_eq!(bilateral(&img, params), img);
    }

    #[test]
    fn bilateral_rgb_uniform_stays_uniform() {
        let img = RgbImage::from_pixel(10, 10, Rgb([10, 200, 90]));
        let out = bilateral_rgb(&img, BilateralParams::default());
        let Rgb(first) = *out.get_pixel(0, 0);
        assert!(out.pixels().all(|p| p.0 == first));
        for (got, want) in first.iter().zip([10u8, 200, 90]) {
            assert!(got.abs_diff(want) <= 1);
        }
    }

    #[test]
    fn bilateral_on_empty_image_is_identity() {
        let img = GrayImage::new(0, 4);
        assert_eq!(bilateral(&img, BilateralParams::default()), img);
    }

    #[test]
    fn bilateral_rgb_preserves_color_edge() {
        let img = RgbImage::from_fn(20, 20, |x, _| {
            if x < 10 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        let out = bilateral_rgb(&img, BilateralParams::default());
        assert!(out.get_pixel(9, 5).0[0] > 245);
        assert!(out.get_pixel(10, 5).0[2] > 245);
    }

    #[test]
    fn smooth_keeps_channel_count() {
        assert_eq!(smooth(&Bitmap::Gray(GrayImage::new(5, 5))).channels(), 1);
        assert_eq!(smooth(&Bitmap::Rgb(RgbImage::new(5, 5))).channels(), 3);
    }

    #[test]
    fn sigma_matches_opencv_rule() {
        assert!((sigma_for_kernel(21) - 3.5).abs() < 1e-5);
        assert!((sigma_for_kernel(3) - 0.8).abs() < 1e-5);
    }

    #[test]
    fn gaussian_blur_smooths_edge() {
        let out = gaussian_blur(&sharp_edge_image(), 21);
        assert!(out.get_pixel(9, 10).0[0] > 0);
        assert!(out.get_pixel(10, 10).0[0] < 255);
    }

    #[test]
    fn small_kernels_are_identity() {
        let img = noisy_flat_image();
        assert_eq!(gaussian_blur(&img, 1), img);
        assert_eq!(median_blur(&img, 1), img);
    }

    #[test]
    fn median_removes_isolated_pixel() {
        let mut img = GrayImage::from_pixel(9, 9, Luma([0]));
        img.put_pixel(4, 4, Luma([255]));
        let out = median_blur(&img, 3);
        assert_eq!(out.get_pixel(4, 4).0[0], 0);
    }

    #[test]
    fn median_rgb_preserves_dimensions() {
        let img = RgbImage::new(13, 7);
        assert_eq!(median_blur_rgb(&img, 7).dimensions(), (13, 7));
    }
}
