//! Postprocessing: turn a raw line mask into a printable coloring page.
//!
//! Steps run in a fixed order on a [`Extraction::Mask`]:
//!
//! 1. noise-area filter (only when `remove_noise` is set)
//! 2. speck opening, then a small closing
//! 3. thickening to the requested outline weight
//! 4. inversion to black lines on a white page
//!
//! A [`Extraction::Color`] result is already final and passes through
//! untouched.

use image::GrayImage;

use crate::types::{Bitmap, Extraction, ProcessingOptions};

/// Drop connected regions whose outer contour encloses `min_area` pixels
/// or fewer.
///
/// External contours above the threshold are filled into a region mask
/// and the input is intersected with it, so surviving strokes keep their
/// exact geometry (closed outlines are not filled in).
#[must_use = "returns the filtered mask"]
pub fn filter_noise(mask: &GrayImage, min_area: u32) -> GrayImage {
    let contours = crate::contour::trace_external(mask);
    let mut regions = GrayImage::new(mask.width(), mask.height());
    let mut kept = 0usize;
    for contour in &contours {
        if contour.area() > f64::from(min_area) {
            crate::contour::fill(&mut regions, contour);
            kept += 1;
        }
    }
    tracing::trace!(regions = contours.len(), kept, min_area, "noise filter");
    crate::edge::intersection(mask, &regions)
}

/// Remove isolated specks and bridge pinholes in strokes.
#[must_use = "returns the cleaned mask"]
pub fn cleanup(mask: &GrayImage) -> GrayImage {
    let opened = crate::morphology::open_specks(mask);
    crate::morphology::close(&opened, crate::morphology::CLEANUP_RADIUS)
}

/// Grow lines to the requested outline weight. Weight 1 leaves the mask
/// as is; weight `t` dilates by a disk of radius `t - 1`. Weights above
/// [`ProcessingOptions::MAX_OUTLINE_THICKNESS`] are capped.
#[must_use = "returns the thickened mask"]
pub fn thicken(mask: &GrayImage, outline_thickness: u8) -> GrayImage {
    let weight = outline_thickness.min(ProcessingOptions::MAX_OUTLINE_THICKNESS);
    crate::morphology::dilate(mask, weight.saturating_sub(1))
}

/// Run the postprocessing steps on an extraction.
///
/// The extraction is only read, so callers can keep it as an intermediate.
#[must_use = "returns the finished coloring page"]
pub fn postprocess(extraction: &Extraction, options: &ProcessingOptions) -> Bitmap {
    let mask = match extraction {
        Extraction::Color(rgb) => return Bitmap::Rgb(rgb.clone()),
        Extraction::Mask(mask) => mask,
    };
    let cleaned = if options.remove_noise {
        cleanup(&filter_noise(mask, options.min_noise_area))
    } else {
        cleanup(mask)
    };
    let mask = thicken(&cleaned, options.outline_thickness);
    Bitmap::Gray(crate::edge::invert(&mask))
}

#[cfg(test)]
mod tests {
    use image::{Luma, Rgb, RgbImage};

    use super::*;
    use crate::edge::count_foreground;

    fn rect(mask: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) {
        for y in y0..y1 {
            for x in x0..x1 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
    }

    /// A 3x3 fleck and a 30x30 block on a 60x60 canvas.
    fn fleck_and_block() -> GrayImage {
        let mut mask = GrayImage::new(60, 60);
        rect(&mut mask, 3, 3, 6, 6);
        rect(&mut mask, 20, 20, 50, 50);
        mask
    }

    fn options(remove_noise: bool, outline_thickness: u8, min_noise_area: u32) -> ProcessingOptions {
        ProcessingOptions {
            remove_noise,
            outline_thickness,
            min_noise_area,
            ..ProcessingOptions::default()
        }
    }

    fn gray(bitmap: Bitmap) -> GrayImage {
        match bitmap {
            Bitmap::Gray(g) => g,
            Bitmap::Rgb(rgb) => crate::grayscale::rgb_to_gray(&rgb),
        }
    }

    #[test]
    fn filter_noise_drops_small_regions_only() {
        let filtered = filter_noise(&fleck_and_block(), 20);
        assert_eq!(filtered.get_pixel(4, 4).0[0], 0);
        assert_eq!(filtered.get_pixel(35, 35).0[0], 255);
        assert_eq!(count_foreground(&filtered), 900);
    }

    #[test]
    fn filter_noise_keeps_outline_unfilled() {
        let mut ring = GrayImage::new(40, 40);
        rect(&mut ring, 5, 5, 35, 35);
        let hollow = crate::edge::intersection(
            &ring,
            &crate::edge::invert(&{
                let mut inner = GrayImage::new(40, 40);
                rect(&mut inner, 7, 7, 33, 33);
                inner
            }),
        );
        let filtered = filter_noise(&hollow, 20);
        assert_eq!(filtered, hollow);
        assert_eq!(filtered.get_pixel(20, 20).0[0], 0);
    }

    #[test]
    fn larger_min_area_never_adds_pixels() {
        let mask = fleck_and_block();
        let mut previous = u64::MAX;
        for min_area in [10, 20, 30, 40, 50] {
            let count = count_foreground(&filter_noise(&mask, min_area));
            assert!(count <= previous);
            previous = count;
        }
    }

    #[test]
    fn cleanup_removes_lone_pixels() {
        let mut mask = GrayImage::new(20, 20);
        mask.put_pixel(10, 10, Luma([255]));
        assert_eq!(count_foreground(&cleanup(&mask)), 0);
    }

    #[test]
    fn thicker_outline_is_superset() {
        let mut mask = GrayImage::new(30, 30);
        rect(&mut mask, 10, 14, 20, 15);
        let thin = thicken(&mask, 1);
        let thick = thicken(&mask, 3);
        assert_eq!(thin, mask);
        assert_eq!(thicken(&mask, 200), thick);
        assert!(count_foreground(&thick) > count_foreground(&thin));
        for (t, k) in thin.pixels().zip(thick.pixels()) {
            assert!(t.0[0] == 0 || k.0[0] == 255);
        }
    }

    #[test]
    fn mask_is_inverted_to_black_lines() {
        let out = gray(postprocess(
            &Extraction::Mask(fleck_and_block()),
            &options(false, 1, 20),
        ));
        assert_eq!(out.get_pixel(35, 35).0[0], 0);
        assert_eq!(out.get_pixel(58, 58).0[0], 255);
    }

    #[test]
    fn noise_flag_controls_fleck() {
        let kept = gray(postprocess(
            &Extraction::Mask(fleck_and_block()),
            &options(false, 1, 50),
        ));
        let removed = gray(postprocess(
            &Extraction::Mask(fleck_and_block()),
            &options(true, 1, 50),
        ));
        assert_eq!(kept.get_pixel(4, 4).0[0], 0);
        assert_eq!(removed.get_pixel(4, 4).0[0], 255);
        assert_eq!(removed.get_pixel(35, 35).0[0], 0);
    }

    #[test]
    fn empty_mask_becomes_white_page() {
        let out = gray(postprocess(
            &Extraction::Mask(GrayImage::new(16, 9)),
            &ProcessingOptions::default(),
        ));
        assert!(out.pixels().all(|p| p.0[0] == 255));
        assert_eq!(out.dimensions(), (16, 9));
    }

    #[test]
    fn color_extraction_bypasses_every_step() {
        let rgb = RgbImage::from_pixel(8, 8, Rgb([10, 200, 30]));
        let out = postprocess(
            &Extraction::Color(rgb.clone()),
            &ProcessingOptions::default(),
        );
        assert_eq!(out, Bitmap::Rgb(rgb));
    }

    #[test]
    fn extraction_is_left_untouched() {
        let extraction = Extraction::Mask(fleck_and_block());
        let opts = options(true, 2, 20);
        let first = postprocess(&extraction, &opts);
        assert_eq!(extraction, Extraction::Mask(fleck_and_block()));
        assert_eq!(postprocess(&extraction, &opts), first);
    }
}
