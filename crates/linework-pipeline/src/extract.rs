//! Line extraction: pluggable algorithms that turn a preprocessed image
//! into a line mask.
//!
//! # Strategy pattern
//!
//! [`Method`] is the closed set of algorithms a caller can pick, and
//! [`LineExtractor`] is the capability they share. Each method also
//! reports which preprocessing steps it needs (see [`PreprocessPlan`]),
//! so the orchestrator can run the shared "enhance, then smooth" sequence
//! once before calling [`LineExtractor::extract`].
//!
//! Masks use 255 for lines and 0 for background. The one exception is
//! [`Method::Cartoon`], which returns a finished color image.

use std::fmt;

use image::{GrayImage, Luma, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::edge;
use crate::preprocess::PreprocessPlan;
use crate::threshold::{self, AdaptiveMethod};
use crate::types::{Bitmap, BorderKind, Extraction};

/// Canny hysteresis low threshold.
pub const CANNY_LOW: f32 = 30.0;
/// Canny hysteresis high threshold.
pub const CANNY_HIGH: f32 = 100.0;
/// Binarization level for the normalized Sobel magnitude.
pub const SOBEL_THRESHOLD: u8 = 50;
/// Binarization level for the absolute Laplacian.
pub const LAPLACIAN_THRESHOLD: u8 = 30;
/// Binarization level for the "find edges" response.
pub const FIND_EDGES_THRESHOLD: u8 = 30;
/// Block size of the standalone adaptive threshold.
pub const ADAPTIVE_BLOCK: u32 = 11;
/// Block size of the adaptive threshold used inside composite methods.
pub const COMPOSITE_BLOCK: u32 = 9;
/// Offset subtracted from the local mean by every adaptive threshold.
pub const ADAPTIVE_OFFSET: i32 = 2;
/// Gaussian kernel size of the sketch blend.
pub const SKETCH_BLUR_KERNEL: u32 = 21;
/// Dodge-blend values below this become sketch lines.
pub const SKETCH_THRESHOLD: u8 = 240;
/// Median kernel size of the watercolor and cartoon methods.
pub const MEDIAN_KERNEL: u32 = 7;
/// Contours enclosing less area than this are dropped by the `contours`
/// method when noise removal is on.
pub const CONTOUR_MIN_AREA: f64 = 10.0;

/// Selects which line extraction algorithm to use.
///
/// Deserializing an unrecognized name yields [`Method::Contours`], the
/// same fallback as [`Method::from_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Two-threshold Canny edge detector.
    Canny,
    /// Binarized Sobel gradient magnitude.
    Sobel,
    /// Binarized absolute Laplacian.
    Laplacian,
    /// Gaussian adaptive threshold. Robust to uneven lighting.
    Adaptive,
    /// Pencil-sketch dodge blend, hard-thresholded.
    Sketch,
    /// Median-smoothed adaptive threshold with a closing. Soft, blobby lines.
    Watercolor,
    /// Canny edges combined with an adaptive threshold.
    Anime,
    /// Color image masked by an adaptive threshold. Skips postprocessing.
    Cartoon,
    /// 3x3 "find edges" kernel response, binarized.
    FindEdges,
    /// Canny edges traced into contours and redrawn with area-scaled
    /// stroke weights.
    #[default]
    #[serde(other)]
    Contours,
}

impl Method {
    /// Every method, in display order.
    pub const ALL: [Self; 10] = [
        Self::Contours,
        Self::Canny,
        Self::Sobel,
        Self::Laplacian,
        Self::Adaptive,
        Self::Sketch,
        Self::Watercolor,
        Self::Anime,
        Self::Cartoon,
        Self::FindEdges,
    ];

    /// Resolve a method by name, case-insensitively.
    ///
    /// Unknown or empty names resolve to [`Method::Contours`]; this is the
    /// documented default rather than an error.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(name))
            .unwrap_or_default()
    }

    /// Canonical lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Canny => "canny",
            Self::Sobel => "sobel",
            Self::Laplacian => "laplacian",
            Self::Adaptive => "adaptive",
            Self::Contours => "contours",
            Self::Sketch => "sketch",
            Self::Watercolor => "watercolor",
            Self::Anime => "anime",
            Self::Cartoon => "cartoon",
            Self::FindEdges => "find_edges",
        }
    }

    /// Whether this method returns a color image instead of a mask.
    #[must_use]
    pub const fn is_color(self) -> bool {
        matches!(self, Self::Cartoon)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Trait for line extraction strategies.
///
/// Input: the preprocessed image (gray or color), plus the resized image
/// before preprocessing for methods that reuse its colors.
/// Output: a line mask, or a color image for methods that keep color.
pub trait LineExtractor {
    /// Preprocessing this extractor wants before [`Self::extract`].
    fn plan(&self, enhance_quality: bool, remove_noise: bool) -> PreprocessPlan;

    /// Extract lines from `preprocessed`. `original` has the same
    /// dimensions and is only read for its colors.
    fn extract(&self, preprocessed: &Bitmap, original: &Bitmap, remove_noise: bool) -> Extraction;
}

impl LineExtractor for Method {
    fn plan(&self, enhance_quality: bool, remove_noise: bool) -> PreprocessPlan {
        let flags = PreprocessPlan::from_flags(enhance_quality, remove_noise);
        match *self {
            Self::Canny | Self::Sobel | Self::Laplacian | Self::Adaptive | Self::FindEdges => {
                flags
            }
            Self::Contours => PreprocessPlan {
                contrast: true,
                smoothing: true,
            },
            // The sketch blend does its own wide blur.
            Self::Sketch => PreprocessPlan {
                smoothing: false,
                ..flags
            },
            Self::Watercolor | Self::Anime | Self::Cartoon => PreprocessPlan {
                smoothing: true,
                ..flags
            },
        }
    }

    fn extract(&self, image: &Bitmap, original: &Bitmap, remove_noise: bool) -> Extraction {
        match *self {
            Self::Canny => Extraction::Mask(extract_canny(&image.to_gray())),
            Self::Sobel => Extraction::Mask(extract_sobel(&image.to_gray())),
            Self::Laplacian => Extraction::Mask(extract_laplacian(&image.to_gray())),
            Self::Adaptive => Extraction::Mask(extract_adaptive(&image.to_gray())),
            Self::FindEdges => Extraction::Mask(extract_find_edges(&image.to_gray())),
            Self::Contours => Extraction::Mask(extract_contours(&image.to_gray(), remove_noise)),
            Self::Sketch => Extraction::Mask(extract_sketch(&image.to_gray())),
            Self::Watercolor => Extraction::Mask(extract_watercolor(&image.to_gray())),
            Self::Anime => Extraction::Mask(extract_anime(&image.to_gray())),
            Self::Cartoon => Extraction::Color(extract_cartoon(image, original)),
        }
    }
}

fn extract_canny(gray: &GrayImage) -> GrayImage {
    edge::canny(gray, CANNY_LOW, CANNY_HIGH)
}

fn extract_sobel(gray: &GrayImage) -> GrayImage {
    threshold::binarize_above(&edge::sobel_magnitude(gray), SOBEL_THRESHOLD)
}

fn extract_laplacian(gray: &GrayImage) -> GrayImage {
    threshold::binarize_above(&edge::laplacian_abs(gray), LAPLACIAN_THRESHOLD)
}

fn extract_adaptive(gray: &GrayImage) -> GrayImage {
    threshold::adaptive_threshold(
        gray,
        ADAPTIVE_BLOCK,
        ADAPTIVE_OFFSET,
        AdaptiveMethod::Gaussian,
    )
}

fn extract_find_edges(gray: &GrayImage) -> GrayImage {
    threshold::binarize_above(&edge::find_edges(gray), FIND_EDGES_THRESHOLD)
}

/// Mean adaptive threshold shared by the composite methods.
fn composite_threshold(gray: &GrayImage) -> GrayImage {
    threshold::adaptive_threshold(gray, COMPOSITE_BLOCK, ADAPTIVE_OFFSET, AdaptiveMethod::Mean)
}

/// Trace Canny edges and redraw every outer border on an empty mask,
/// with the stroke weight growing with the enclosed area.
fn extract_contours(gray: &GrayImage, remove_noise: bool) -> GrayImage {
    let edges = edge::canny(gray, CANNY_LOW, CANNY_HIGH);
    let contours = crate::contour::trace(&edges);
    let mut canvas = GrayImage::new(gray.width(), gray.height());
    let mut drawn = 0usize;
    for contour in contours.iter().filter(|c| c.border == BorderKind::Outer) {
        let area = contour.area();
        if remove_noise && area < CONTOUR_MIN_AREA {
            continue;
        }
        crate::contour::stroke(&mut canvas, contour, crate::contour::stroke_thickness(area));
        drawn += 1;
    }
    tracing::trace!(traced = contours.len(), drawn, "contours redrawn");
    canvas
}

/// Color-dodge the gray image with its blurred negative and keep the
/// darkest strokes.
fn extract_sketch(gray: &GrayImage) -> GrayImage {
    let inverted = edge::invert(gray);
    let blurred = crate::blur::gaussian_blur(&inverted, SKETCH_BLUR_KERNEL);
    let dodge = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let base = u32::from(gray.get_pixel(x, y).0[0]);
        let divisor = 255 - u32::from(blurred.get_pixel(x, y).0[0]);
        let v = if divisor == 0 {
            255
        } else {
            (base * 256 / divisor).min(255)
        };
        Luma([u8::try_from(v).unwrap_or(u8::MAX)])
    });
    threshold::binarize_below(&dodge, SKETCH_THRESHOLD)
}

fn extract_watercolor(gray: &GrayImage) -> GrayImage {
    let smoothed = crate::blur::median_blur(gray, MEDIAN_KERNEL);
    crate::morphology::close(&composite_threshold(&smoothed), 1)
}

fn extract_anime(gray: &GrayImage) -> GrayImage {
    let edges = edge::canny(gray, CANNY_LOW, CANNY_HIGH);
    let combined = edge::union(&edges, &composite_threshold(gray));
    crate::morphology::close(&combined, 1)
}

/// Keep the median-smoothed colors of `original` wherever the adaptive
/// threshold of `preprocessed` sees no line; lines come out black.
fn extract_cartoon(preprocessed: &Bitmap, original: &Bitmap) -> RgbImage {
    let lines = composite_threshold(&preprocessed.to_gray());
    let color = match original {
        Bitmap::Rgb(rgb) => rgb.clone(),
        Bitmap::Gray(gray) => RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
            let v = gray.get_pixel(x, y).0[0];
            Rgb([v, v, v])
        }),
    };
    let smoothed = crate::blur::median_blur_rgb(&color, MEDIAN_KERNEL);
    RgbImage::from_fn(smoothed.width(), smoothed.height(), |x, y| {
        if lines.get_pixel(x, y).0[0] == 0 {
            *smoothed.get_pixel(x, y)
        } else {
            Rgb([0, 0, 0])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Black 10x10 square on a 60x60 white field.
    fn square() -> GrayImage {
        GrayImage::from_fn(60, 60, |x, y| {
            if (25..35).contains(&x) && (25..35).contains(&y) {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }

    fn count_on(img: &GrayImage) -> u64 {
        edge::count_foreground(img)
    }

    fn mask_of(extraction: Extraction) -> GrayImage {
        match extraction {
            Extraction::Mask(mask) => mask,
            Extraction::Color(_) => GrayImage::new(0, 0),
        }
    }

    #[test]
    fn default_is_contours() {
        assert_eq!(Method::default(), Method::Contours);
    }

    #[test]
    fn from_name_resolves_known_names() {
        for method in Method::ALL {
            assert_eq!(Method::from_name(method.name()), method);
        }
        assert_eq!(Method::from_name("  Sketch "), Method::Sketch);
        assert_eq!(Method::from_name("CARTOON"), Method::Cartoon);
    }

    #[test]
    fn from_name_falls_back_to_contours() {
        assert_eq!(Method::from_name("xyz"), Method::Contours);
        assert_eq!(Method::from_name(""), Method::Contours);
    }

    #[test]
    fn serde_uses_canonical_names() {
        let json = serde_json::to_string(&Method::FindEdges).unwrap_or_default();
        assert_eq!(json, "\"find_edges\"");
        let back: Method = serde_json::from_str("\"watercolor\"").unwrap_or_default();
        assert_eq!(back, Method::Watercolor);
    }

    #[test]
    fn only_cartoon_is_color() {
        for method in Method::ALL {
            let out = method.extract(&Bitmap::Gray(square()), &Bitmap::Gray(square()), true);
            assert_eq!(out.channels() == 3, method.is_color(), "{method}");
        }
    }

    #[test]
    fn flat_field_yields_empty_masks() {
        let flat = Bitmap::Gray(GrayImage::from_pixel(40, 40, Luma([128])));
        for method in Method::ALL.into_iter().filter(|m| !m.is_color()) {
            let mask = mask_of(method.extract(&flat, &flat, true));
            assert_eq!(count_on(&mask), 0, "{method} found lines in a flat field");
        }
    }

    #[test]
    fn square_yields_lines_for_every_mask_method() {
        let img = Bitmap::Gray(square());
        for method in Method::ALL.into_iter().filter(|m| !m.is_color()) {
            let mask = mask_of(method.extract(&img, &img, true));
            assert!(count_on(&mask) > 0, "{method} found no lines");
            assert_eq!(mask.dimensions(), (60, 60));
        }
    }

    #[test]
    fn mask_methods_leave_far_background_empty() {
        let img = Bitmap::Gray(square());
        for method in Method::ALL.into_iter().filter(|m| !m.is_color()) {
            let mask = mask_of(method.extract(&img, &img, true));
            assert_eq!(mask.get_pixel(2, 2).0[0], 0, "{method}");
        }
    }

    #[test]
    fn plans_force_mandatory_steps() {
        let off = Method::Contours.plan(false, false);
        assert!(off.contrast && off.smoothing);
        assert!(!Method::Sketch.plan(true, true).smoothing);
        assert!(Method::Watercolor.plan(false, false).smoothing);
        assert_eq!(
            Method::Canny.plan(true, false),
            PreprocessPlan {
                contrast: true,
                smoothing: false
            }
        );
    }

    #[test]
    fn contours_stay_near_canny_edges() {
        let big = GrayImage::from_fn(100, 100, |x, y| {
            if (20..80).contains(&x) && (20..80).contains(&y) {
                Luma([0])
            } else {
                Luma([255])
            }
        });
        let mask = extract_contours(&big, true);
        let near = crate::morphology::dilate(&extract_canny(&big), 2);
        assert!(count_on(&mask) > 0);
        assert_eq!(count_on(&edge::intersection(&mask, &near)), count_on(&mask));
        assert_eq!(mask.get_pixel(50, 50).0[0], 0);
        assert_eq!(mask.get_pixel(3, 3).0[0], 0);
    }

    #[test]
    fn contours_drop_specks_only_when_removing_noise() {
        let mut speck = GrayImage::from_pixel(30, 30, Luma([255]));
        speck.put_pixel(15, 15, Luma([0]));
        let kept = extract_contours(&speck, false);
        let dropped = extract_contours(&speck, true);
        assert!(count_on(&dropped) <= count_on(&kept));
    }

    #[test]
    fn cartoon_keeps_interior_color() {
        let img = RgbImage::from_fn(60, 60, |x, y| {
            if (20..40).contains(&x) && (20..40).contains(&y) {
                Rgb([200, 30, 30])
            } else {
                Rgb([240, 240, 240])
            }
        });
        let img = Bitmap::Rgb(img);
        let out = extract_cartoon(&img, &img);
        assert_eq!(*out.get_pixel(30, 30), Rgb([200, 30, 30]));
        assert_eq!(*out.get_pixel(5, 5), Rgb([240, 240, 240]));
    }

    #[test]
    fn cartoon_from_gray_is_still_color() {
        let gray = Bitmap::Gray(square());
        let out = Method::Cartoon.extract(&gray, &gray, true);
        assert_eq!(out.channels(), 3);
    }

    #[test]
    fn cartoon_colors_come_from_original() {
        let original = RgbImage::from_fn(60, 60, |x, y| {
            if (20..40).contains(&x) && (20..40).contains(&y) {
                Rgb([200, 40, 40])
            } else {
                Rgb([240, 240, 240])
            }
        });
        // A brightened copy stands in for the contrast-enhanced image.
        let enhanced = RgbImage::from_fn(60, 60, |x, y| {
            let Rgb([r, g, b]) = *original.get_pixel(x, y);
            Rgb([r.saturating_add(5), g.saturating_add(5), b.saturating_add(5)])
        });
        let out = Method::Cartoon.extract(&Bitmap::Rgb(enhanced), &Bitmap::Rgb(original), true);
        let Extraction::Color(out) = out else {
            unreachable!("cartoon returns color");
        };
        assert_eq!(*out.get_pixel(30, 30), Rgb([200, 40, 40]));
        assert_eq!(*out.get_pixel(5, 5), Rgb([240, 240, 240]));
    }

    #[test]
    fn sketch_marks_dark_boundary() {
        let mask = extract_sketch(&square());
        // Inside the square the base is 0, so the dodge is 0 and the
        // pixel is a line.
        assert_eq!(mask.get_pixel(30, 30).0[0], 255);
        assert_eq!(mask.get_pixel(2, 2).0[0], 0);
    }
}
