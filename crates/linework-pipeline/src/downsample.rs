//! Guardrail resize.
//!
//! Bounds the per-request cost: inputs whose longer side exceeds
//! [`MAX_DIMENSION`] are shrunk so that side is exactly [`MAX_DIMENSION`],
//! keeping the aspect ratio. This runs before every other stage. Smaller
//! inputs are returned unchanged; nothing is ever upscaled.

use image::imageops::{self, FilterType};

use crate::types::{Bitmap, Dimensions};

/// Longest side, in pixels, that the pipeline will work on.
pub const MAX_DIMENSION: u32 = 1200;

/// Area-averaging filter used for shrinking.
///
/// The triangle filter widens its support by the scale factor when
/// downscaling, so each output pixel averages the source area it covers.
const FILTER: FilterType = FilterType::Triangle;

/// Target size for an image of the given dimensions.
///
/// Returns `None` when no resize is needed.
#[must_use]
pub fn target_dimensions(dimensions: Dimensions, max_dimension: u32) -> Option<Dimensions> {
    let long = dimensions.longer_side();
    if long <= max_dimension {
        return None;
    }
    let scale_short = |short: u32| -> u32 {
        let scaled = u64::from(short) * u64::from(max_dimension);
        // Rounded integer division; never collapse to zero.
        let rounded = (scaled + u64::from(long) / 2) / u64::from(long);
        u32::try_from(rounded).unwrap_or(max_dimension).max(1)
    };
    Some(if dimensions.width >= dimensions.height {
        Dimensions {
            width: max_dimension,
            height: scale_short(dimensions.height),
        }
    } else {
        Dimensions {
            width: scale_short(dimensions.width),
            height: max_dimension,
        }
    })
}

/// Shrink `bitmap` so its longer side is at most [`MAX_DIMENSION`].
///
/// Returns the (possibly unchanged) bitmap and whether a resize was
/// applied. The channel count is preserved.
#[must_use]
pub fn guardrail_resize(bitmap: &Bitmap) -> (Bitmap, bool) {
    resize_to_fit(bitmap, MAX_DIMENSION)
}

/// Shrink `bitmap` so its longer side is at most `max_dimension`.
#[must_use]
pub fn resize_to_fit(bitmap: &Bitmap, max_dimension: u32) -> (Bitmap, bool) {
    let Some(target) = target_dimensions(bitmap.dimensions(), max_dimension) else {
        return (bitmap.clone(), false);
    };
    let resized = match bitmap {
        Bitmap::Gray(img) => {
            Bitmap::Gray(imageops::resize(img, target.width, target.height, FILTER))
        }
        Bitmap::Rgb(img) => Bitmap::Rgb(imageops::resize(img, target.width, target.height, FILTER)),
    };
    (resized, true)
}
