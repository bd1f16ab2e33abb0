//! Binary morphology on line masks.
//!
//! Pixels are treated as binary with threshold `> 0`; outputs are `0` or
//! `255`. Structuring elements are disks (Euclidean norm), the discrete
//! counterpart of an elliptical kernel with equal axes.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;

/// Radius of the cleanup closing element.
pub const CLEANUP_RADIUS: u8 = 2;

/// Dilate with a disk of the given radius. Radius 0 is the identity.
#[must_use = "returns the dilated mask"]
pub fn dilate(mask: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return binarize(mask);
    }
    imageproc::morphology::dilate(mask, Norm::L2, radius)
}

/// Erode with a disk of the given radius. Radius 0 is the identity.
#[must_use = "returns the eroded mask"]
pub fn erode(mask: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return binarize(mask);
    }
    imageproc::morphology::erode(mask, Norm::L2, radius)
}

/// Closing (dilation then erosion) with a disk of the given radius.
///
/// Bridges background gaps narrower than the disk without widening
/// strokes.
#[must_use = "returns the closed mask"]
pub fn close(mask: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return binarize(mask);
    }
    imageproc::morphology::close(mask, Norm::L2, radius)
}

/// Opening that removes isolated specks.
///
/// A foreground pixel survives only if at least one of its eight
/// neighbours is also foreground. This is an opening by reconstruction
/// with a single-pixel marker: every connected stroke, however thin, is
/// kept intact, while lone pixels left over from thresholding vanish.
#[must_use = "returns the cleaned mask"]
pub fn open_specks(mask: &GrayImage) -> GrayImage {
    let (w, h) = mask.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        if mask.get_pixel(x, y).0[0] == 0 {
            return Luma([0]);
        }
        let x0 = x.saturating_sub(1);
        let y0 = y.saturating_sub(1);
        let x1 = (x + 1).min(w - 1);
        let y1 = (y + 1).min(h - 1);
        let has_neighbour = (y0..=y1).any(|ny| {
            (x0..=x1).any(|nx| (nx, ny) != (x, y) && mask.get_pixel(nx, ny).0[0] != 0)
        });
        Luma([if has_neighbour { 255 } else { 0 }])
    })
}

/// Normalize nonzero pixels to 255.
fn binarize(mask: &GrayImage) -> GrayImage {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        Luma([if mask.get_pixel(x, y).0[0] == 0 { 0 } else { 255 }])
    })
}
