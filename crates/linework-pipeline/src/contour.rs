//! Contour tracing and rasterization.
//!
//! Contours are traced from a binary mask with Suzuki-Abe border
//! following (`imageproc::contours::find_contours`). The pipeline uses
//! them two ways: the `contours` extractor redraws them as strokes whose
//! weight grows with the enclosed area, and the noise filter fills the
//! external ones to decide which regions of a mask survive.

use image::{GrayImage, Luma};
use imageproc::contours::BorderType;

use crate::types::{BorderKind, Contour, Point};

const ON: Luma<u8> = Luma([255]);

/// Trace every border (outer and hole) in a binary mask.
///
/// Any nonzero pixel counts as foreground.
#[must_use]
pub fn trace(mask: &GrayImage) -> Vec<Contour> {
    let contours: Vec<imageproc::contours::Contour<i32>> =
        imageproc::contours::find_contours(mask);
    contours
        .into_iter()
        .map(|c| Contour {
            points: c.points,
            border: match c.border_type {
                BorderType::Outer => BorderKind::Outer,
                BorderType::Hole => BorderKind::Hole,
            },
            parent: c.parent,
        })
        .collect()
}

/// Trace only the outermost borders: outer borders with no enclosing
/// contour.
#[must_use]
pub fn trace_external(mask: &GrayImage) -> Vec<Contour> {
    trace(mask).into_iter().filter(Contour::is_external).collect()
}

/// Stroke weight for a contour of the given area:
/// `clamp(area / 1000, 1, 3)`, truncated to whole pixels.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn stroke_thickness(area: f64) -> u32 {
    ((area / 1000.0).floor().max(0.0) as u32).clamp(1, 3)
}

/// Fill the polygon through `contour` (interior and boundary) with 255.
///
/// The polygon is closed implicitly, so a repeated closing point makes no
/// difference. A single point has no edges to rasterize and is set
/// directly.
pub fn fill(canvas: &mut GrayImage, contour: &Contour) {
    match contour.points.as_slice() {
        [] => {}
        [p] => put(canvas, p.x, p.y),
        points => imageproc::drawing::draw_polygon_mut(canvas, points, ON),
    }
}

/// Draw `contour` as a closed outline of the given thickness.
///
/// Each boundary pixel is stamped with a `thickness`-wide square, so
/// strokes of weight 1 reproduce the traced pixels exactly.
pub fn stroke(canvas: &mut GrayImage, contour: &Contour, thickness: u32) {
    let t = i32::try_from(thickness.max(1)).unwrap_or(1);
    let lo = -(t - 1) / 2;
    let hi = lo + t;
    for p in &contour.points {
        for dy in lo..hi {
            for dx in lo..hi {
                put(canvas, p.x + dx, p.y + dy);
            }
        }
    }
}

/// Set a pixel if it lies inside the canvas.
fn put(canvas: &mut GrayImage, x: i32, y: i32) {
    if let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y))
        && x < canvas.width()
        && y < canvas.height()
    {
        canvas.put_pixel(x, y, ON);
    }
}

/// Convenience for tests and callers building contours by hand.
#[must_use]
pub fn outer_contour(points: &[(i32, i32)]) -> Contour {
    Contour {
        points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
        border: BorderKind::Outer,
        parent: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_rect(w: u32, h: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
                ON
            } else {
                Luma([0])
            }
        })
    }

    fn count_on(img: &GrayImage) -> usize {
        img.pixels().filter(|p| p.0[0] == 255).count()
    }

    #[test]
    fn empty_image_produces_no_contours() {
        assert!(trace(&GrayImage::new(10, 10)).is_empty());
    }

    #[test]
    fn rectangle_produces_one_external_contour() {
        let img = filled_rect(20, 20, 5, 5, 15, 15);
        let external = trace_external(&img);
        assert_eq!(external.len(), 1);
        // Boundary pixel centers span 9x9.
        assert!((external[0].area() - 81.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ring_has_hole_border_that_is_not_external() {
        let mut img = filled_rect(20, 20, 2, 2, 18, 18);
        for y in 6..14 {
            for x in 6..14 {
                img.put_pixel(x, y, Luma([0]));
            }
        }
        let all = trace(&img);
        assert!(all.iter().any(|c| c.border == BorderKind::Hole));
        assert_eq!(trace_external(&img).len(), 1);
    }

    #[test]
    fn stroke_thickness_scales_with_area() {
        assert_eq!(stroke_thickness(0.0), 1);
        assert_eq!(stroke_thickness(999.0), 1);
        assert_eq!(stroke_thickness(2500.0), 2);
        assert_eq!(stroke_thickness(3000.0), 3);
        assert_eq!(stroke_thickness(1.0e9), 3);
    }

    #[test]
    fn fill_covers_interior_and_boundary() {
        let mut canvas = GrayImage::new(12, 12);
        fill(&mut canvas, &outer_contour(&[(2, 2), (8, 2), (8, 8), (2, 8)]));
        assert_eq!(canvas.get_pixel(5, 5).0[0], 255);
        assert_eq!(canvas.get_pixel(2, 2).0[0], 255);
        assert_eq!(canvas.get_pixel(8, 8).0[0], 255);
        assert_eq!(canvas.get_pixel(10, 10).0[0], 0);
    }

    #[test]
    fn fill_ignores_repeated_closing_point() {
        let open = outer_contour(&[(2, 2), (8, 2), (8, 8), (2, 8)]);
        let closed = outer_contour(&[(2, 2), (8, 2), (8, 8), (2, 8), (2, 2)]);
        let mut a = GrayImage::new(12, 12);
        let mut b = GrayImage::new(12, 12);
        fill(&mut a, &open);
        fill(&mut b, &closed);
        assert_eq!(a, b);
        assert_eq!(count_on(&a), 49);
    }

    #[test]
    fn fill_tolerates_degenerate_contours() {
        let mut canvas = GrayImage::new(6, 6);
        fill(&mut canvas, &outer_contour(&[]));
        assert_eq!(count_on(&canvas), 0);
        fill(&mut canvas, &outer_contour(&[(3, 3)]));
        assert_eq!(count_on(&canvas), 1);
        fill(&mut canvas, &outer_contour(&[(1, 1), (2, 1), (1, 1)]));
        assert_eq!(canvas.get_pixel(2, 1).0[0], 255);
    }

    #[test]
    fn stroke_of_weight_one_reproduces_points() {
        let mut canvas = GrayImage::new(10, 10);
        let contour = outer_contour(&[(1, 1), (2, 1), (3, 1)]);
        stroke(&mut canvas, &contour, 1);
        assert_eq!(count_on(&canvas), 3);
    }

    #[test]
    fn heavier_stroke_is_superset() {
        let contour = outer_contour(&[(4, 4), (5, 4), (6, 4), (6, 5)]);
        let mut thin = GrayImage::new(12, 12);
        let mut thick = GrayImage::new(12, 12);
        stroke(&mut thin, &contour, 1);
        stroke(&mut thick, &contour, 3);
        assert!(count_on(&thick) > count_on(&thin));
        for (a, b) in thin.pixels().zip(thick.pixels()) {
            assert!(a.0[0] == 0 || b.0[0] == 255);
        }
    }

    #[test]
    fn stroke_clips_at_canvas_edge() {
        let mut canvas = GrayImage::new(3, 3);
        stroke(&mut canvas, &outer_contour(&[(0, 0)]), 3);
        assert_eq!(count_on(&canvas), 4);
    }
}
