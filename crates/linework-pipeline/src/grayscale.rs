//! Color-space conversions.
//!
//! All conversions use the BT.601 weights so that luminance computed here
//! matches what the contrast stage equalizes.

use image::{GrayImage, Luma, Rgb, RgbImage};

/// Convert RGB to grayscale: `0.299*R + 0.587*G + 0.114*B`, rounded.
#[must_use = "returns the grayscale image"]
pub fn rgb_to_gray(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgb([r, g, b]) = *image.get_pixel(x, y);
        Luma([luma(r, g, b)])
    })
}

/// BT.601 luma of one pixel.
#[must_use]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.114f32.mul_add(
        f32::from(b),
        0.299f32.mul_add(f32::from(r), 0.587 * f32::from(g)),
    );
    to_u8(y)
}

/// Full-range BT.601 RGB to YCbCr.
#[must_use]
pub fn rgb_to_ycbcr(r: u8, g: u8, b: u8) -> [f32; 3] {
    let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
    let y = 0.114f32.mul_add(b, 0.299f32.mul_add(r, 0.587 * g));
    let cb = 128.0 + 0.5f32.mul_add(b, (-0.168_736f32).mul_add(r, -0.331_264 * g));
    let cr = 128.0 + (-0.081_312f32).mul_add(b, 0.5f32.mul_add(r, -0.418_688 * g));
    [y, cb, cr]
}

/// Full-range BT.601 YCbCr back to RGB, clamped to 8 bits.
#[must_use]
pub fn ycbcr_to_rgb(y: f32, cb: f32, cr: f32) -> [u8; 3] {
    let cb = cb - 128.0;
    let cr = cr - 128.0;
    let r = 1.402f32.mul_add(cr, y);
    let g = (-0.714_136f32).mul_add(cr, (-0.344_136f32).mul_add(cb, y));
    let b = 1.772f32.mul_add(cb, y);
    [to_u8(r), to_u8(g), to_u8(b)]
}

/// Round and clamp a float sample into `u8`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
