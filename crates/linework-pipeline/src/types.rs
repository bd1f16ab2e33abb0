//! Shared types for the linework pipeline.

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::extract::Method;

/// Re-export `GrayImage` so downstream crates can reference masks
/// without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can reference color
/// buffers without depending on `image` directly.
pub use image::RgbImage;

/// Re-export of the integer point type used by traced contours.
pub use imageproc::point::Point;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// The longer of the two axes.
    #[must_use]
    pub const fn longer_side(self) -> u32 {
        if self.width >= self.height {
            self.width
        } else {
            self.height
        }
    }
}

/// An in-memory 8-bit raster, either single-channel or RGB.
///
/// The channel count is fixed by the variant. Changing it always goes
/// through an explicit conversion such as [`Bitmap::to_gray`], which
/// returns a new buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bitmap {
    /// One luminance sample per pixel.
    Gray(GrayImage),
    /// Three color samples per pixel.
    Rgb(RgbImage),
}

impl Bitmap {
    /// Build a bitmap from row-major samples.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidImage`] if `channels` is not 1 or 3,
    /// either dimension is zero, or `data.len()` is not
    /// `width * height * channels`.
    pub fn from_raw(
        width: u32,
        height: u32,
        channels: u8,
        data: Vec<u8>,
    ) -> Result<Self, PipelineError> {
        if width == 0 || height == 0 {
            return Err(PipelineError::InvalidImage(format!(
                "zero-area buffer ({width}x{height})"
            )));
        }
        let len = data.len();
        let bitmap = match channels {
            1 => GrayImage::from_raw(width, height, data).map(Self::Gray),
            3 => RgbImage::from_raw(width, height, data).map(Self::Rgb),
            other => {
                return Err(PipelineError::InvalidImage(format!(
                    "unsupported channel count {other}"
                )));
            }
        };
        bitmap.ok_or_else(|| {
            PipelineError::InvalidImage(format!(
                "{len} samples do not match {width}x{height}x{channels}"
            ))
        })
    }

    /// Convert a decoded image into a bitmap.
    ///
    /// Luma images (with or without alpha) become [`Bitmap::Gray`];
    /// everything else is converted to 8-bit RGB. Alpha is discarded.
    #[must_use]
    pub fn from_dynamic(image: DynamicImage) -> Self {
        match image {
            DynamicImage::ImageLuma8(gray) => Self::Gray(gray),
            DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_) => Self::Gray(image.to_luma8()),
            DynamicImage::ImageRgb8(rgb) => Self::Rgb(rgb),
            other => Self::Rgb(other.to_rgb8()),
        }
    }

    /// Convert into a [`DynamicImage`] for encoding.
    #[must_use]
    pub fn into_dynamic(self) -> DynamicImage {
        match self {
            Self::Gray(gray) => DynamicImage::ImageLuma8(gray),
            Self::Rgb(rgb) => DynamicImage::ImageRgb8(rgb),
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        match self {
            Self::Gray(img) => img.width(),
            Self::Rgb(img) => img.width(),
        }
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        match self {
            Self::Gray(img) => img.height(),
            Self::Rgb(img) => img.height(),
        }
    }

    /// Width and height together.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    /// Samples per pixel: 1 or 3.
    #[must_use]
    pub const fn channels(&self) -> u8 {
        match self {
            Self::Gray(_) => 1,
            Self::Rgb(_) => 3,
        }
    }

    /// Row-major samples.
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        match self {
            Self::Gray(img) => img.as_raw(),
            Self::Rgb(img) => img.as_raw(),
        }
    }

    /// Single-channel copy of this bitmap (BT.601 luma for RGB).
    #[must_use]
    pub fn to_gray(&self) -> GrayImage {
        match self {
            Self::Gray(img) => img.clone(),
            Self::Rgb(img) => crate::grayscale::rgb_to_gray(img),
        }
    }

    /// Check the buffer can enter the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidImage`] for a zero-area buffer or
    /// one whose sample count disagrees with its dimensions.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let Dimensions { width, height } = self.dimensions();
        if width == 0 || height == 0 {
            return Err(PipelineError::InvalidImage(format!(
                "zero-area buffer ({width}x{height})"
            )));
        }
        let expected = u64::from(width) * u64::from(height) * u64::from(self.channels());
        let actual = self.as_raw().len() as u64;
        if expected != actual {
            return Err(PipelineError::InvalidImage(format!(
                "{actual} samples do not match {width}x{height}x{}",
                self.channels()
            )));
        }
        Ok(())
    }
}

/// Which side of a region a traced border lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderKind {
    /// Boundary between a foreground region and the background around it.
    Outer,
    /// Boundary of a background hole inside a foreground region.
    Hole,
}

/// A traced boundary of a connected foreground region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    /// Ordered boundary pixels.
    pub points: Vec<Point<i32>>,
    /// Outer border or hole border.
    pub border: BorderKind,
    /// Index of the enclosing contour, if any.
    pub parent: Option<usize>,
}

impl Contour {
    /// Enclosed area of the polygon through [`Self::points`].
    ///
    /// Shoelace formula, magnitude only. Contours with fewer than three
    /// points have zero area.
    #[must_use]
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: i64 = (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y)
            })
            .sum();
        #[allow(clippy::cast_precision_loss)]
        let area = twice.unsigned_abs() as f64 / 2.0;
        area
    }

    /// `true` for an outer border that no other contour encloses.
    #[must_use]
    pub const fn is_external(&self) -> bool {
        matches!(self.border, BorderKind::Outer) && self.parent.is_none()
    }
}

/// Options controlling one conversion.
///
/// Values are expected to be within range already; callers that accept
/// user input should run [`ProcessingOptions::clamped`] first. Every field
/// is optional when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingOptions {
    /// Line extraction algorithm.
    pub method: Method,

    /// Run localized contrast enhancement before extraction.
    pub enhance_quality: bool,

    /// Smooth before extraction and drop small regions afterwards.
    pub remove_noise: bool,

    /// Outline thickness, 1 (as extracted) to 3 (heaviest).
    pub outline_thickness: u8,

    /// Regions enclosing this many pixels or fewer are discarded when
    /// `remove_noise` is set.
    pub min_noise_area: u32,
}

impl ProcessingOptions {
    /// Default line extraction method.
    pub const DEFAULT_METHOD: Method = Method::Contours;
    /// Default for [`Self::enhance_quality`].
    pub const DEFAULT_ENHANCE_QUALITY: bool = true;
    /// Default for [`Self::remove_noise`].
    pub const DEFAULT_REMOVE_NOISE: bool = true;
    /// Default outline thickness.
    pub const DEFAULT_OUTLINE_THICKNESS: u8 = 2;
    /// Default noise area threshold.
    pub const DEFAULT_MIN_NOISE_AREA: u32 = 20;

    /// Smallest accepted outline thickness.
    pub const MIN_OUTLINE_THICKNESS: u8 = 1;
    /// Largest accepted outline thickness.
    pub const MAX_OUTLINE_THICKNESS: u8 = 3;
    /// Smallest accepted noise area threshold.
    pub const MIN_NOISE_AREA: u32 = 10;
    /// Largest accepted noise area threshold.
    pub const MAX_NOISE_AREA: u32 = 50;

    /// Return a copy with every numeric field forced into its valid range.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            outline_thickness: self
                .outline_thickness
                .clamp(Self::MIN_OUTLINE_THICKNESS, Self::MAX_OUTLINE_THICKNESS),
            min_noise_area: self
                .min_noise_area
                .clamp(Self::MIN_NOISE_AREA, Self::MAX_NOISE_AREA),
            ..self
        }
    }
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            method: Self::DEFAULT_METHOD,
            enhance_quality: Self::DEFAULT_ENHANCE_QUALITY,
            remove_noise: Self::DEFAULT_REMOVE_NOISE,
            outline_thickness: Self::DEFAULT_OUTLINE_THICKNESS,
            min_noise_area: Self::DEFAULT_MIN_NOISE_AREA,
        }
    }
}

/// Output of the line extraction stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Single-channel mask, 255 on lines and 0 elsewhere.
    Mask(GrayImage),
    /// Finished color image. Skips postprocessing.
    Color(RgbImage),
}

impl Extraction {
    /// Convert into the bitmap handed back to the caller.
    #[must_use]
    pub fn into_bitmap(self) -> Bitmap {
        match self {
            Self::Mask(mask) => Bitmap::Gray(mask),
            Self::Color(rgb) => Bitmap::Rgb(rgb),
        }
    }

    /// Samples per pixel of the extraction.
    #[must_use]
    pub const fn channels(&self) -> u8 {
        match self {
            Self::Mask(_) => 1,
            Self::Color(_) => 3,
        }
    }
}

/// Result of running the pipeline with intermediate buffers preserved.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Dimensions of the bitmap as supplied by the caller.
    pub source_dimensions: Dimensions,
    /// Whether the guardrail resize shrank the input.
    pub resized: bool,
    /// Input after the guardrail resize.
    pub working: Bitmap,
    /// Working image after contrast enhancement and smoothing.
    pub preprocessed: Bitmap,
    /// Raw extractor output, before postprocessing.
    pub extraction: Extraction,
    /// Final coloring page.
    pub output: Bitmap,
}

/// Errors raised by the pipeline.
///
/// Every stage is total over a valid buffer, so the only failure is a
/// buffer that should never have been handed in.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// The input buffer is zero-area or malformed.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}
