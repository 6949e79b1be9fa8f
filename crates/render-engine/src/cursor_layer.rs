//! Synthetic cursor overlay.
//!
//! The recorded cursor stream is replayed through a spring filter and
//! drawn on top of the composited frame: glyph, optional glow/highlight
//! halos, click ripples, and a fading motion trail. All cross-frame state
//! (spring, ripples, auto-hide, trail) lives here.

use std::collections::VecDeque;

use zoomcast_effect_model::{CursorData, CursorSettings, Rgba};
use zoomcast_motion::{
    sample_cursor, AutoHide, CursorSpring, RippleTracker, SpringParams,
};

use crate::frame::RgbaFrame;

/// Base glyph height in stage pixels before the size bucket multiplier.
const GLYPH_BASE_PX: f64 = 24.0;

/// Ripple ring radius at full expansion, in stage pixels.
const RIPPLE_MAX_RADIUS_PX: f64 = 28.0;

/// Trail samples kept; older samples fade out.
const TRAIL_LEN: usize = 14;

/// Normalized pointer-arrow outline, y-down, height 1.0.
const ARROW_OUTLINE: [(f64, f64); 7] = [
    (0.0, 0.0),
    (0.0, 0.82),
    (0.19, 0.64),
    (0.30, 0.88),
    (0.39, 0.84),
    (0.28, 0.61),
    (0.54, 0.61),
];

/// The stateful cursor overlay for one export.
pub struct CursorLayer {
    data: CursorData,
    settings: CursorSettings,
    tint: Rgba,
    spring: CursorSpring,
    ripples: RippleTracker,
    auto_hide: AutoHide,
    trail: VecDeque<(f64, f64)>,
    last_time_ms: Option<f64>,
}

/// Cursor state for the current frame, in screen (recording) pixels.
#[derive(Debug, Clone, Copy)]
pub struct CursorPose {
    pub x: f64,
    pub y: f64,
    pub pressed: bool,
    pub opacity: f64,
}

impl CursorLayer {
    /// Returns `None` when the cursor is disabled or the recorded stream
    /// can't be rendered.
    pub fn new(data: Option<CursorData>, settings: CursorSettings) -> Option<Self> {
        if !settings.enabled {
            return None;
        }
        let data = data?;
        if !data.is_renderable() {
            return None;
        }

        let start = data.positions.first().map(|p| (p.x, p.y)).unwrap_or((0.0, 0.0));
        let params = SpringParams::from_smoothness(settings.smoothness);
        let tint = Rgba::from_hex(&settings.color).unwrap_or(Rgba::opaque(255, 255, 255));
        let auto_hide = AutoHide::new(settings.auto_hide_delay_ms);

        Some(Self {
            data,
            settings,
            tint,
            spring: CursorSpring::new(params, start.0, start.1),
            ripples: RippleTracker::new(),
            auto_hide,
            trail: VecDeque::with_capacity(TRAIL_LEN),
            last_time_ms: None,
        })
    }

    /// Advance the cursor state to `time_ms` and return the filtered pose
    /// in screen pixels.
    pub fn advance(&mut self, time_ms: f64) -> Option<CursorPose> {
        let (raw_x, raw_y) = sample_cursor(&self.data.positions, time_ms)?;

        let dt = match self.last_time_ms {
            Some(last) => (time_ms - last) / 1000.0,
            // First frame: force a snap to the sampled position.
            None => -1.0,
        };
        self.last_time_ms = Some(time_ms);

        let (x, y) = self.spring.step(raw_x, raw_y, dt);
        let pressed = self.pressed_at(time_ms);
        self.ripples.update(pressed, raw_x, raw_y, time_ms);
        let opacity = self.auto_hide.step(x, y, time_ms);

        Some(CursorPose {
            x,
            y,
            pressed,
            opacity,
        })
    }

    /// Draw the cursor onto `frame`. `map` converts screen pixels to stage
    /// pixels (it bakes in crop, layout, and the current camera transform);
    /// `display_scale` is the screen→stage pixel ratio used to size the
    /// glyph consistently under zoom.
    pub fn render(
        &mut self,
        frame: &mut RgbaFrame,
        pose: &CursorPose,
        time_ms: f64,
        map: impl Fn(f64, f64) -> (f64, f64),
        display_scale: f64,
    ) {
        if pose.opacity <= 0.0 {
            return;
        }

        let (sx, sy) = map(pose.x, pose.y);
        let glyph_h = GLYPH_BASE_PX * self.settings.size.scale() * display_scale.max(0.1);

        if self.settings.motion_trail {
            self.trail.push_back((sx, sy));
            while self.trail.len() > TRAIL_LEN {
                self.trail.pop_front();
            }
            let n = self.trail.len();
            for (i, &(tx, ty)) in self.trail.iter().enumerate() {
                let fade = (i + 1) as f64 / n as f64;
                let radius = glyph_h * 0.12 * fade;
                draw_disc(frame, tx, ty, radius, self.tint, 0.35 * fade * pose.opacity);
            }
        }

        if self.settings.ripple {
            for ring in self.ripples.rings(time_ms) {
                let (rx, ry) = map(ring.x, ring.y);
                let radius = RIPPLE_MAX_RADIUS_PX * display_scale * ring.progress;
                let alpha = (1.0 - ring.progress) * 0.6 * pose.opacity;
                draw_ring(frame, rx, ry, radius, 2.0 * display_scale.max(0.5), self.tint, alpha);
            }
        }

        if self.settings.glow {
            draw_disc(frame, sx, sy, glyph_h * 0.9, self.tint, 0.18 * pose.opacity);
        }

        if self.settings.highlight {
            draw_ring(
                frame,
                sx,
                sy,
                glyph_h * 0.7,
                1.5 * display_scale.max(0.5),
                Rgba::opaque(255, 230, 80),
                0.8 * pose.opacity,
            );
        }

        draw_arrow(frame, sx, sy, glyph_h, self.tint, pose.opacity);
    }

    fn pressed_at(&self, time_ms: f64) -> bool {
        let positions = &self.data.positions;
        let idx = positions
            .partition_point(|p| p.timestamp <= time_ms)
            .checked_sub(1);
        match idx {
            Some(i) => positions[i].pressed,
            None => false,
        }
    }
}

/// Filled anti-aliased disc.
fn draw_disc(frame: &mut RgbaFrame, cx: f64, cy: f64, radius: f64, color: Rgba, opacity: f64) {
    if radius <= 0.0 || opacity <= 0.0 {
        return;
    }
    let (x0, x1, y0, y1) = disc_bounds(frame, cx, cy, radius + 1.0);
    for y in y0..y1 {
        for x in x0..x1 {
            let d = ((x as f64 + 0.5 - cx).powi(2) + (y as f64 + 0.5 - cy).powi(2)).sqrt();
            let edge = (radius - d + 0.5).clamp(0.0, 1.0);
            if edge > 0.0 {
                frame.blend_pixel(x, y, color, opacity * edge);
            }
        }
    }
}

/// Anti-aliased ring of the given stroke width.
fn draw_ring(
    frame: &mut RgbaFrame,
    cx: f64,
    cy: f64,
    radius: f64,
    stroke: f64,
    color: Rgba,
    opacity: f64,
) {
    if radius <= 0.0 || opacity <= 0.0 {
        return;
    }
    let (x0, x1, y0, y1) = disc_bounds(frame, cx, cy, radius + stroke + 1.0);
    for y in y0..y1 {
        for x in x0..x1 {
            let d = ((x as f64 + 0.5 - cx).powi(2) + (y as f64 + 0.5 - cy).powi(2)).sqrt();
            let edge = (stroke / 2.0 - (d - radius).abs() + 0.5).clamp(0.0, 1.0);
            if edge > 0.0 {
                frame.blend_pixel(x, y, color, opacity * edge);
            }
        }
    }
}

/// The classic pointer arrow, filled, with a thin dark outline so it stays
/// visible on light content.
fn draw_arrow(frame: &mut RgbaFrame, tip_x: f64, tip_y: f64, height: f64, fill: Rgba, opacity: f64) {
    if height <= 0.0 || opacity <= 0.0 {
        return;
    }

    let pts: Vec<(f64, f64)> = ARROW_OUTLINE
        .iter()
        .map(|&(px, py)| (tip_x + px * height, tip_y + py * height))
        .collect();

    let min_x = pts.iter().map(|p| p.0).fold(f64::INFINITY, f64::min).floor() as i64 - 1;
    let max_x = pts.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max).ceil() as i64 + 1;
    let min_y = pts.iter().map(|p| p.1).fold(f64::INFINITY, f64::min).floor() as i64 - 1;
    let max_y = pts.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max).ceil() as i64 + 1;

    let outline = Rgba::opaque(30, 30, 30);

    for y in min_y.max(0)..max_y.min(frame.height() as i64) {
        for x in min_x.max(0)..max_x.min(frame.width() as i64) {
            let px = x as f64 + 0.5;
            let py = y as f64 + 0.5;
            if !point_in_polygon(&pts, px, py) {
                continue;
            }
            let d = distance_to_outline(&pts, px, py);
            let color = if d < 1.0 { outline } else { fill };
            frame.blend_pixel(x as u32, y as u32, color, opacity);
        }
    }
}

fn disc_bounds(frame: &RgbaFrame, cx: f64, cy: f64, extent: f64) -> (u32, u32, u32, u32) {
    let x0 = (cx - extent).floor().max(0.0) as u32;
    let y0 = (cy - extent).floor().max(0.0) as u32;
    let x1 = ((cx + extent).ceil().max(0.0) as u32).min(frame.width());
    let y1 = ((cy + extent).ceil().max(0.0) as u32).min(frame.height());
    (x0, x1, y0, y1)
}

fn point_in_polygon(pts: &[(f64, f64)], x: f64, y: f64) -> bool {
    let mut inside = false;
    for i in 0..pts.len() {
        let (x0, y0) = pts[i];
        let (x1, y1) = pts[(i + 1) % pts.len()];
        if (y0 <= y) != (y1 <= y) {
            let t = (y - y0) / (y1 - y0);
            if x < x0 + t * (x1 - x0) {
                inside = !inside;
            }
        }
    }
    inside
}

fn distance_to_outline(pts: &[(f64, f64)], x: f64, y: f64) -> f64 {
    let mut best = f64::INFINITY;
    for i in 0..pts.len() {
        let (ax, ay) = pts[i];
        let (bx, by) = pts[(i + 1) % pts.len()];
        let (dx, dy) = (bx - ax, by - ay);
        let len2 = dx * dx + dy * dy;
        let t = if len2 > 0.0 {
            (((x - ax) * dx + (y - ay) * dy) / len2).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let (px, py) = (ax + t * dx, ay + t * dy);
        best = best.min(((x - px).powi(2) + (y - py).powi(2)).sqrt());
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use zoomcast_effect_model::CursorPosition;

    fn cursor_data() -> CursorData {
        CursorData {
            positions: vec![
                CursorPosition::new(100.0, 100.0, 0.0, false),
                CursorPosition::new(200.0, 150.0, 100.0, false),
                CursorPosition::new(300.0, 200.0, 200.0, true),
                CursorPosition::new(400.0, 250.0, 300.0, false),
            ],
            screen_width: 1920.0,
            screen_height: 1080.0,
            recorded_fps: Some(60.0),
        }
    }

    #[test]
    fn test_disabled_settings_yield_no_layer() {
        let settings = CursorSettings {
            enabled: false,
            ..Default::default()
        };
        assert!(CursorLayer::new(Some(cursor_data()), settings).is_none());
    }

    #[test]
    fn test_missing_data_yields_no_layer() {
        assert!(CursorLayer::new(None, CursorSettings::default()).is_none());
    }

    #[test]
    fn test_first_advance_snaps_to_sample() {
        let mut layer = CursorLayer::new(Some(cursor_data()), CursorSettings::default()).unwrap();
        let pose = layer.advance(0.0).unwrap();
        assert_eq!(pose.x, 100.0);
        assert_eq!(pose.y, 100.0);
        assert_eq!(pose.opacity, 1.0);
    }

    #[test]
    fn test_pressed_tracks_latest_sample() {
        let mut layer = CursorLayer::new(Some(cursor_data()), CursorSettings::default()).unwrap();
        assert!(!layer.advance(50.0).unwrap().pressed);
        assert!(layer.advance(250.0).unwrap().pressed);
        assert!(!layer.advance(350.0).unwrap().pressed);
    }

    #[test]
    fn test_render_draws_glyph_pixels() {
        let mut layer = CursorLayer::new(Some(cursor_data()), CursorSettings::default()).unwrap();
        let pose = layer.advance(0.0).unwrap();

        let mut frame = RgbaFrame::new(256, 256);
        frame.fill(Rgba::opaque(0, 0, 0));
        layer.render(&mut frame, &pose, 0.0, |x, y| (x, y), 1.0);

        // Some pixel near the tip (100, 100) must no longer be background.
        let mut touched = false;
        for y in 100..130 {
            for x in 100..120 {
                if frame.pixel(x, y) != Rgba::opaque(0, 0, 0) {
                    touched = true;
                }
            }
        }
        assert!(touched, "glyph left no mark on the frame");
    }

    #[test]
    fn test_point_in_polygon_square() {
        let square = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        assert!(point_in_polygon(&square, 5.0, 5.0));
        assert!(!point_in_polygon(&square, 15.0, 5.0));
    }
}
