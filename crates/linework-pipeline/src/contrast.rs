//! Localized contrast enhancement (CLAHE).
//!
//! Contrast-limited adaptive histogram equalization: the image is split
//! into a grid of tiles, each tile gets its own equalization curve with the
//! histogram clipped at `clip_limit` times the uniform bin height, and
//! every pixel is mapped by bilinearly blending the curves of the four
//! nearest tiles. Clipping bounds the slope of each curve, so flat areas
//! are not blown up into noise.
//!
//! Color images are equalized on luminance only (the Y of full-range
//! YCbCr); chroma passes through unchanged.

use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::grayscale::{rgb_to_ycbcr, to_u8, ycbcr_to_rgb};
use crate::types::Bitmap;

/// Tiles per axis.
pub const TILE_GRID: u32 = 8;

/// Histogram clip limit, as a multiple of the uniform bin height.
pub const CLIP_LIMIT: f32 = 2.0;

/// Equalize a bitmap with the default tile grid and clip limit.
///
/// Grayscale input is equalized directly; RGB input on luminance only.
#[must_use = "returns the enhanced bitmap"]
pub fn enhance_contrast(bitmap: &Bitmap) -> Bitmap {
    match bitmap {
        Bitmap::Gray(img) => Bitmap::Gray(clahe(img, TILE_GRID, CLIP_LIMIT)),
        Bitmap::Rgb(img) => Bitmap::Rgb(clahe_luminance(img, TILE_GRID, CLIP_LIMIT)),
    }
}

/// CLAHE on a single-channel image.
///
/// `tile_grid` is the number of tiles along each axis (clamped so that a
/// tile is at least one pixel wide). Non-positive `clip_limit` disables
/// clipping, which degrades to plain tiled equalization.
#[must_use = "returns the equalized image"]
pub fn clahe(image: &GrayImage, tile_grid: u32, clip_limit: f32) -> GrayImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return image.clone();
    }
    let grid = TileGrid::new(w, h, tile_grid.max(1));
    let luts = grid.build_luts(|x, y| image.get_pixel(x, y).0[0], clip_limit);
    GrayImage::from_fn(w, h, |x, y| {
        let v = image.get_pixel(x, y).0[0];
        Luma([to_u8(grid.interpolate(&luts, x, y, v))])
    })
}

/// CLAHE on the luminance of an RGB image.
#[must_use = "returns the equalized image"]
pub fn clahe_luminance(image: &RgbImage, tile_grid: u32, clip_limit: f32) -> RgbImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return image.clone();
    }
    let ycbcr: Vec<[f32; 3]> = image
        .pixels()
        .map(|&Rgb([r, g, b])| rgb_to_ycbcr(r, g, b))
        .collect();
    let luma_at = |x: u32, y: u32| to_u8(ycbcr[(y * w + x) as usize][0]);

    let grid = TileGrid::new(w, h, tile_grid.max(1));
    let luts = grid.build_luts(luma_at, clip_limit);
    RgbImage::from_fn(w, h, |x, y| {
        let [_, cb, cr] = ycbcr[(y * w + x) as usize];
        let equalized = grid.interpolate(&luts, x, y, luma_at(x, y));
        Rgb(ycbcr_to_rgb(equalized, cb, cr))
    })
}

/// Tile layout for one image.
struct TileGrid {
    width: u32,
    height: u32,
    tile_w: u32,
    tile_h: u32,
    cols: u32,
    rows: u32,
}

impl TileGrid {
    fn new(width: u32, height: u32, tiles: u32) -> Self {
        let tile_w = width.div_ceil(tiles).max(1);
        let tile_h = height.div_ceil(tiles).max(1);
        Self {
            width,
            height,
            tile_w,
            tile_h,
            cols: width.div_ceil(tile_w),
            rows: height.div_ceil(tile_h),
        }
    }

    /// One 256-entry mapping per tile, row-major.
    fn build_luts(&self, sample: impl Fn(u32, u32) -> u8, clip_limit: f32) -> Vec<[f32; 256]> {
        let mut luts = Vec::with_capacity((self.cols * self.rows) as usize);
        for ty in 0..self.rows {
            for tx in 0..self.cols {
                let x0 = tx * self.tile_w;
                let y0 = ty * self.tile_h;
                let x1 = (x0 + self.tile_w).min(self.width);
                let y1 = (y0 + self.tile_h).min(self.height);

                let mut hist = [0u32; 256];
                for y in y0..y1 {
                    for x in x0..x1 {
                        hist[usize::from(sample(x, y))] += 1;
                    }
                }
                let area = (x1 - x0) * (y1 - y0);
                clip_histogram(&mut hist, area, clip_limit);
                luts.push(equalization_curve(&hist, area));
            }
        }
        luts
    }

    /// Blend the four tile curves surrounding `(x, y)`.
    #[allow(clippy::cast_precision_loss)]
    fn interpolate(&self, luts: &[[f32; 256]], x: u32, y: u32, value: u8) -> f32 {
        let (c0, c1, ax) = neighbours(x, self.tile_w, self.cols);
        let (r0, r1, ay) = neighbours(y, self.tile_h, self.rows);
        let v = usize::from(value);
        let at = |col: u32, row: u32| luts[(row * self.cols + col) as usize][v];

        let top = (at(c1, r0) - at(c0, r0)).mul_add(ax, at(c0, r0));
        let bottom = (at(c1, r1) - at(c0, r1)).mul_add(ax, at(c0, r1));
        (bottom - top).mul_add(ay, top)
    }
}

/// Indices of the two tiles whose centers bracket `pos`, and the blend
/// weight towards the second.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn neighbours(pos: u32, tile: u32, count: u32) -> (u32, u32, f32) {
    let t = (pos as f32 + 0.5) / tile as f32 - 0.5;
    if t <= 0.0 {
        return (0, 0, 0.0);
    }
    let lo = (t.floor() as u32).min(count - 1);
    let hi = (lo + 1).min(count - 1);
    let weight = if hi == lo { 0.0 } else { t - lo as f32 };
    (lo, hi, weight.clamp(0.0, 1.0))
}

/// Clip every bin at the limit and spread the excess evenly.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clip_histogram(hist: &mut [u32; 256], area: u32, clip_limit: f32) {
    if clip_limit <= 0.0 {
        return;
    }
    let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let per_bin = excess / 256;
    let remainder = (excess % 256) as usize;
    for bin in hist.iter_mut() {
        *bin += per_bin;
    }
    if remainder > 0 {
        let step = (256 / remainder).max(1);
        for bin in hist.iter_mut().step_by(step).take(remainder) {
            *bin += 1;
        }
    }
}

/// Cumulative histogram scaled to `0.0..=255.0`.
#[allow(clippy::cast_precision_loss)]
fn equalization_curve(hist: &[u32; 256], area: u32) -> [f32; 256] {
    let scale = 255.0 / area.max(1) as f32;
    let mut curve = [0.0f32; 256];
    let mut running = 0u32;
    for (out, &count) in curve.iter_mut().zip(hist.iter()) {
        running += count;
        *out = running as f32 * scale;
    }
    curve
}
