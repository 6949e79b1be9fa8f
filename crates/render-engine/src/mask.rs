//! Corner mask geometry and rasterization.
//!
//! The video layer is clipped by a path: a plain rounded rectangle or a
//! squircle (continuous-curvature) rectangle. The path is rasterized once
//! per export into an 8-bit coverage mask that the compositor multiplies
//! into the layer alpha every frame.

use zoomcast_effect_model::{CornerSettings, CornerStyle};

use crate::layout::Rect;

/// Circle-approximating cubic control offset, as a fraction of the radius.
const KAPPA: f64 = 0.552_284_749_8;

/// Squircle edge extension, as a fraction of the radius. The curve starts
/// this much further from the corner than a circular arc would, which is
/// what gives the continuous-curvature look.
const SQUIRCLE_EXTENSION: f64 = 1.28 * 0.5;

/// One path segment. Coordinates are absolute stage pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSeg {
    MoveTo(f64, f64),
    LineTo(f64, f64),
    /// Two control points, then the end point.
    CubicTo(f64, f64, f64, f64, f64, f64),
    Close,
}

/// A closed clip path for the video layer.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskPath {
    pub segments: Vec<PathSeg>,
}

impl MaskPath {
    /// Build the clip path for `rect` with the given corner settings.
    ///
    /// `scale` converts the configured radius (full-stage pixels) to the
    /// actual render scale. The effective radius is capped at half the
    /// shorter rectangle side. With no corner rounding at all the path is
    /// an exact rectangle with no curve segments.
    pub fn build(rect: Rect, corners: &CornerSettings, scale: f64) -> Self {
        let half = rect.w.min(rect.h) / 2.0;
        let radius = (corners.radius * scale).clamp(0.0, half);

        if radius <= 0.0 || !corners.any_enabled() {
            return Self::rectangle(rect);
        }

        // Distance from the corner at which the curve begins, and the
        // control point offset back toward the corner.
        let (cut, ctrl) = match corners.style {
            CornerStyle::Rounded => (radius, KAPPA * radius),
            CornerStyle::Squircle => (
                (radius * (1.0 + SQUIRCLE_EXTENSION)).min(half),
                KAPPA * radius,
            ),
        };

        // Clockwise from the top-left corner. Each entry is the corner
        // point, the incoming edge direction, and the enabled flag.
        let corner_points = [
            (rect.x + rect.w, rect.y, (1.0, 0.0), corners.top_right),
            (
                rect.x + rect.w,
                rect.y + rect.h,
                (0.0, 1.0),
                corners.bottom_right,
            ),
            (rect.x, rect.y + rect.h, (-1.0, 0.0), corners.bottom_left),
            (rect.x, rect.y, (0.0, -1.0), corners.top_left),
        ];

        let mut segments = Vec::with_capacity(9);
        let start = if corners.top_left {
            (rect.x + cut, rect.y)
        } else {
            (rect.x, rect.y)
        };
        segments.push(PathSeg::MoveTo(start.0, start.1));

        for &(cx, cy, (inx, iny), enabled) in &corner_points {
            // Outgoing edge direction is the incoming direction rotated 90°
            // clockwise.
            let (outx, outy) = (-iny, inx);

            if !enabled {
                segments.push(PathSeg::LineTo(cx, cy));
                continue;
            }

            let entry = (cx - inx * cut, cy - iny * cut);
            let exit = (cx + outx * cut, cy + outy * cut);
            let c1 = (entry.0 + inx * ctrl, entry.1 + iny * ctrl);
            let c2 = (exit.0 - outx * ctrl, exit.1 - outy * ctrl);

            segments.push(PathSeg::LineTo(entry.0, entry.1));
            segments.push(PathSeg::CubicTo(c1.0, c1.1, c2.0, c2.1, exit.0, exit.1));
        }

        segments.push(PathSeg::Close);
        Self { segments }
    }

    fn rectangle(rect: Rect) -> Self {
        Self {
            segments: vec![
                PathSeg::MoveTo(rect.x, rect.y),
                PathSeg::LineTo(rect.x + rect.w, rect.y),
                PathSeg::LineTo(rect.x + rect.w, rect.y + rect.h),
                PathSeg::LineTo(rect.x, rect.y + rect.h),
                PathSeg::Close,
            ],
        }
    }

    /// Count of curve segments, mostly useful for assertions.
    pub fn cubic_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, PathSeg::CubicTo(..)))
            .count()
    }

    /// Flatten the path into a closed polyline.
    fn flatten(&self) -> Vec<(f64, f64)> {
        const CUBIC_STEPS: usize = 16;

        let mut points: Vec<(f64, f64)> = Vec::new();
        let mut cursor = (0.0, 0.0);

        for seg in &self.segments {
            match *seg {
                PathSeg::MoveTo(x, y) => {
                    cursor = (x, y);
                    points.push(cursor);
                }
                PathSeg::LineTo(x, y) => {
                    cursor = (x, y);
                    points.push(cursor);
                }
                PathSeg::CubicTo(c1x, c1y, c2x, c2y, ex, ey) => {
                    let (sx, sy) = cursor;
                    for step in 1..=CUBIC_STEPS {
                        let t = step as f64 / CUBIC_STEPS as f64;
                        let mt = 1.0 - t;
                        let x = mt * mt * mt * sx
                            + 3.0 * mt * mt * t * c1x
                            + 3.0 * mt * t * t * c2x
                            + t * t * t * ex;
                        let y = mt * mt * mt * sy
                            + 3.0 * mt * mt * t * c1y
                            + 3.0 * mt * t * t * c2y
                            + t * t * t * ey;
                        points.push((x, y));
                    }
                    cursor = (ex, ey);
                }
                PathSeg::Close => {}
            }
        }

        points
    }

    /// Rasterize into an 8-bit coverage mask of the given size, using
    /// scanline even-odd fill with 4x vertical supersampling.
    pub fn rasterize(&self, width: u32, height: u32) -> CoverageMask {
        const SUBSAMPLES: usize = 4;

        let polygon = self.flatten();
        let mut coverage = vec![0f32; width as usize * height as usize];

        if polygon.len() >= 3 {
            let sub_weight = 1.0 / SUBSAMPLES as f32;

            for y in 0..height {
                for sub in 0..SUBSAMPLES {
                    let sample_y = y as f64 + (sub as f64 + 0.5) / SUBSAMPLES as f64;

                    let mut crossings: Vec<f64> = Vec::new();
                    for i in 0..polygon.len() {
                        let (x0, y0) = polygon[i];
                        let (x1, y1) = polygon[(i + 1) % polygon.len()];
                        if (y0 <= sample_y) != (y1 <= sample_y) {
                            let t = (sample_y - y0) / (y1 - y0);
                            crossings.push(x0 + t * (x1 - x0));
                        }
                    }
                    crossings.sort_by(f64::total_cmp);

                    for span in crossings.chunks_exact(2) {
                        let (xs, xe) = (span[0], span[1]);
                        fill_span(
                            &mut coverage[y as usize * width as usize..][..width as usize],
                            xs,
                            xe,
                            sub_weight,
                        );
                    }
                }
            }
        }

        CoverageMask {
            width,
            height,
            data: coverage
                .into_iter()
                .map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
                .collect(),
        }
    }
}

/// Add `weight`-scaled horizontal coverage for the span `[xs, xe)` to one
/// scanline, with fractional coverage at the span ends.
fn fill_span(row: &mut [f32], xs: f64, xe: f64, weight: f32) {
    let xs = xs.max(0.0);
    let xe = xe.min(row.len() as f64);
    if xs >= xe {
        return;
    }

    let first = xs.floor() as usize;
    let last = (xe.ceil() as usize).min(row.len());
    for (x, value) in row.iter_mut().enumerate().take(last).skip(first) {
        let px_start = x as f64;
        let px_end = px_start + 1.0;
        let covered = (xe.min(px_end) - xs.max(px_start)).max(0.0);
        *value += covered as f32 * weight;
    }
}

/// An 8-bit per-pixel coverage mask.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageMask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl CoverageMask {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn value(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Coverage as a `[0, 1]` fraction.
    #[inline]
    pub fn coverage(&self, x: u32, y: u32) -> f64 {
        self.value(x, y) as f64 / 255.0
    }
}
