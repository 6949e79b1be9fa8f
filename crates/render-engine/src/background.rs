//! Background rasterization.
//!
//! The parsed `BackgroundSpec` is resolved into a full-stage RGBA raster
//! once at export setup. Per-frame compositing just memcpy-blits it.

use std::path::Path;

use zoomcast_common::{ZoomcastError, ZoomcastResult};
use zoomcast_effect_model::{BackgroundSpec, GradientStop, Rgba};

use crate::frame::RgbaFrame;

/// Resolve a background spec into a stage-sized raster, optionally
/// pre-blurred by `blur_px`.
///
/// Image backgrounds are cover-fitted: scaled to fill the stage while
/// preserving aspect, center-cropped. A missing or unreadable image file
/// is a setup error, not a per-frame one. The blur runs once here, never
/// per frame.
pub fn resolve_background(
    spec: &BackgroundSpec,
    width: u32,
    height: u32,
    blur_px: u32,
) -> ZoomcastResult<RgbaFrame> {
    let mut frame = match spec {
        BackgroundSpec::Solid { color } => {
            let mut frame = RgbaFrame::new(width, height);
            frame.fill(*color);
            frame
        }
        BackgroundSpec::LinearGradient { angle_deg, stops } => {
            linear_gradient(width, height, *angle_deg, stops)
        }
        BackgroundSpec::RadialGradient { stops } => radial_gradient(width, height, stops),
        BackgroundSpec::Image { uri } => image_background(Path::new(uri), width, height)?,
    };

    if blur_px > 0 {
        frame.box_blur(blur_px);
    }
    Ok(frame)
}

fn linear_gradient(width: u32, height: u32, angle_deg: f64, stops: &[GradientStop]) -> RgbaFrame {
    let mut frame = RgbaFrame::new(width, height);

    // CSS angle: 0deg points up, 90deg points right.
    let rad = angle_deg.to_radians();
    let (dx, dy) = (rad.sin(), -rad.cos());

    // Project every pixel onto the gradient axis and normalize by the
    // frame's extent along that axis.
    let w = width as f64;
    let h = height as f64;
    let half_span = (w * dx.abs() + h * dy.abs()) / 2.0;
    let (cx, cy) = (w / 2.0, h / 2.0);

    for y in 0..height {
        for x in 0..width {
            let proj = (x as f64 + 0.5 - cx) * dx + (y as f64 + 0.5 - cy) * dy;
            let t = if half_span > 0.0 {
                (proj / half_span + 1.0) / 2.0
            } else {
                0.5
            };
            frame.set_pixel(x, y, gradient_color(stops, t));
        }
    }

    frame
}

fn radial_gradient(width: u32, height: u32, stops: &[GradientStop]) -> RgbaFrame {
    let mut frame = RgbaFrame::new(width, height);
    let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
    let max_dist = (cx * cx + cy * cy).sqrt();

    for y in 0..height {
        for x in 0..width {
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            let t = if max_dist > 0.0 {
                (dx * dx + dy * dy).sqrt() / max_dist
            } else {
                0.0
            };
            frame.set_pixel(x, y, gradient_color(stops, t));
        }
    }

    frame
}

/// Piecewise-linear interpolation over sorted gradient stops.
fn gradient_color(stops: &[GradientStop], t: f64) -> Rgba {
    let first = match stops.first() {
        Some(first) => first,
        None => return Rgba::BLACK,
    };
    if t <= first.offset {
        return first.color;
    }

    for pair in stops.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            let u = if span > 0.0 { (t - a.offset) / span } else { 1.0 };
            return lerp_rgba(a.color, b.color, u);
        }
    }

    stops.last().map(|s| s.color).unwrap_or(Rgba::BLACK)
}

fn lerp_rgba(a: Rgba, b: Rgba, t: f64) -> Rgba {
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    Rgba {
        r: mix(a.r, b.r),
        g: mix(a.g, b.g),
        b: mix(a.b, b.b),
        a: mix(a.a, b.a),
    }
}

fn image_background(path: &Path, width: u32, height: u32) -> ZoomcastResult<RgbaFrame> {
    if !path.exists() {
        return Err(ZoomcastError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let img = image::open(path)
        .map_err(|e| {
            ZoomcastError::compositor(format!(
                "failed to load background image {}: {e}",
                path.display()
            ))
        })?
        .to_rgba8();

    let (src_w, src_h) = (img.width() as f64, img.height() as f64);
    if src_w < 1.0 || src_h < 1.0 {
        return Err(ZoomcastError::compositor(format!(
            "background image {} is empty",
            path.display()
        )));
    }

    // Cover fit: scale to fill, center-crop the overflow.
    let scale = (width as f64 / src_w).max(height as f64 / src_h);
    let offset_x = (src_w * scale - width as f64) / 2.0;
    let offset_y = (src_h * scale - height as f64) / 2.0;

    let mut frame = RgbaFrame::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let sx = ((x as f64 + offset_x) / scale).clamp(0.0, src_w - 1.0);
            let sy = ((y as f64 + offset_y) / scale).clamp(0.0, src_h - 1.0);
            let p = img.get_pixel(sx as u32, sy as u32);
            frame.set_pixel(
                x,
                y,
                Rgba {
                    r: p[0],
                    g: p[1],
                    b: p[2],
                    a: p[3],
                },
            );
        }
    }

    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stops(a: Rgba, b: Rgba) -> Vec<GradientStop> {
        vec![
            GradientStop {
                offset: 0.0,
                color: a,
            },
            GradientStop {
                offset: 1.0,
                color: b,
            },
        ]
    }

    #[test]
    fn test_solid_fills_every_pixel() {
        let spec = BackgroundSpec::Solid {
            color: Rgba::opaque(10, 20, 30),
        };
        let frame = resolve_background(&spec, 8, 8, 0).unwrap();
        assert_eq!(frame.pixel(0, 0), Rgba::opaque(10, 20, 30));
        assert_eq!(frame.pixel(7, 7), Rgba::opaque(10, 20, 30));
    }

    #[test]
    fn test_vertical_gradient_endpoints() {
        // 180deg: top is the first stop, bottom the last.
        let spec = BackgroundSpec::LinearGradient {
            angle_deg: 180.0,
            stops: stops(Rgba::opaque(0, 0, 0), Rgba::opaque(255, 255, 255)),
        };
        let frame = resolve_background(&spec, 4, 64, 0).unwrap();
        assert!(frame.pixel(2, 0).r < 16);
        assert!(frame.pixel(2, 63).r > 239);
    }

    #[test]
    fn test_radial_gradient_center_vs_corner() {
        let spec = BackgroundSpec::RadialGradient {
            stops: stops(Rgba::opaque(255, 0, 0), Rgba::opaque(0, 0, 255)),
        };
        let frame = resolve_background(&spec, 64, 64, 0).unwrap();
        assert!(frame.pixel(32, 32).r > frame.pixel(0, 0).r);
        assert!(frame.pixel(0, 0).b > frame.pixel(32, 32).b);
    }

    #[test]
    fn test_missing_image_is_file_not_found() {
        let spec = BackgroundSpec::Image {
            uri: "/nonexistent/background.png".to_string(),
        };
        let err = resolve_background(&spec, 8, 8, 0).unwrap_err();
        assert!(matches!(err, ZoomcastError::FileNotFound { .. }));
    }

    #[test]
    fn test_blur_softens_a_hard_gradient_edge() {
        // Two stops at the same offset make a hard vertical edge at x=32.
        let spec = BackgroundSpec::LinearGradient {
            angle_deg: 90.0,
            stops: vec![
                GradientStop {
                    offset: 0.5,
                    color: Rgba::BLACK,
                },
                GradientStop {
                    offset: 0.5,
                    color: Rgba::opaque(255, 255, 255),
                },
            ],
        };

        let sharp = resolve_background(&spec, 64, 16, 0).unwrap();
        assert_eq!(sharp.pixel(28, 8).r, 0);
        assert_eq!(sharp.pixel(36, 8).r, 255);

        let blurred = resolve_background(&spec, 64, 16, 8).unwrap();
        assert!(blurred.pixel(28, 8).r > 0, "left of the edge picked up white");
        assert!(blurred.pixel(36, 8).r < 255, "right of the edge picked up black");
    }

    #[test]
    fn test_gradient_color_clamps_to_ends() {
        let s = stops(Rgba::opaque(1, 2, 3), Rgba::opaque(4, 5, 6));
        assert_eq!(gradient_color(&s, -1.0), Rgba::opaque(1, 2, 3));
        assert_eq!(gradient_color(&s, 2.0), Rgba::opaque(4, 5, 6));
    }
}
