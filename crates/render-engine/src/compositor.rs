//! Per-frame compositing.
//!
//! Layer order, bottom to top: background raster, drop shadow, the camera-
//! transformed video layer clipped by the corner mask, and the cursor
//! overlay. The background, shadow, layout, and mask are all resolved once
//! at setup; `compose` only does per-pixel work that depends on the frame.

use zoomcast_common::{ZoomcastError, ZoomcastResult};
use zoomcast_effect_model::{ExportSettings, Rgba};
use zoomcast_motion::CameraTick;

use crate::background::resolve_background;
use crate::cursor_layer::CursorLayer;
use crate::frame::RgbaFrame;
use crate::layout::StageLayout;
use crate::mask::{CoverageMask, MaskPath};

/// Camera movement below this intensity draws no motion blur.
const MOTION_BLUR_THRESHOLD: f64 = 0.004;

/// Motion blur radius in pixels per unit of motion intensity.
const MOTION_BLUR_GAIN: f64 = 220.0;

const SHADOW_OFFSET_Y_PX: f64 = 14.0;
const SHADOW_BLUR_PX: f64 = 26.0;
const SHADOW_MAX_ALPHA: f64 = 0.55;

/// Composites output frames from decoded source frames.
pub struct FrameCompositor {
    layout: StageLayout,
    background: RgbaFrame,
    mask: CoverageMask,
    shadow: Option<RgbaFrame>,
    cursor: Option<CursorLayer>,
    motion_blur: bool,
    screen_to_source: f64,
}

impl FrameCompositor {
    /// Resolve everything static for this export: layout, background
    /// raster, corner mask, and the shadow layer.
    pub fn new(
        settings: &ExportSettings,
        source_w: u32,
        source_h: u32,
    ) -> ZoomcastResult<Self> {
        let layout = StageLayout::compute(
            settings.width,
            settings.height,
            source_w,
            source_h,
            &settings.crop,
            settings.padding_percent,
        );

        let background = resolve_background(
            &settings.background,
            settings.width,
            settings.height,
            settings.background_blur_px,
        )?;

        let mask = MaskPath::build(layout.mask_rect, &settings.corners, layout.base_scale)
            .rasterize(settings.width, settings.height);

        let shadow = if settings.shadow.enabled && settings.shadow.intensity > 0.0 {
            Some(build_shadow_layer(
                &mask,
                settings.width,
                settings.height,
                settings.shadow.intensity,
            ))
        } else {
            None
        };

        let screen_to_source = settings
            .cursor_data
            .as_ref()
            .filter(|d| d.screen_width > 0.0)
            .map(|d| source_w as f64 / d.screen_width)
            .unwrap_or(1.0);

        let cursor = CursorLayer::new(settings.cursor_data.clone(), settings.cursor.clone());

        tracing::debug!(
            stage_w = layout.stage_w,
            stage_h = layout.stage_h,
            base_scale = layout.base_scale,
            has_cursor = cursor.is_some(),
            has_shadow = shadow.is_some(),
            "Compositor initialized"
        );

        Ok(Self {
            layout,
            background,
            mask,
            shadow,
            cursor,
            motion_blur: settings.motion_blur,
            screen_to_source,
        })
    }

    pub fn layout(&self) -> &StageLayout {
        &self.layout
    }

    /// Compose one output frame.
    pub fn compose(
        &mut self,
        src: &RgbaFrame,
        time_ms: f64,
        tick: CameraTick,
    ) -> ZoomcastResult<RgbaFrame> {
        let expected_w = (self.layout.src_x + self.layout.src_w).ceil() as u32;
        let expected_h = (self.layout.src_y + self.layout.src_h).ceil() as u32;
        if src.width() < expected_w || src.height() < expected_h {
            return Err(ZoomcastError::compositor(format!(
                "source frame {}x{} smaller than crop window {}x{}",
                src.width(),
                src.height(),
                expected_w,
                expected_h
            )));
        }

        let mut out = self.background.clone();

        if let Some(shadow) = &self.shadow {
            blend_layer(&mut out, shadow);
        }

        let cam = CameraFrame::resolve(&self.layout, &tick);
        self.draw_video_layer(&mut out, src, &cam);

        if self.motion_blur && tick.motion_intensity > MOTION_BLUR_THRESHOLD {
            let radius = (tick.motion_intensity * MOTION_BLUR_GAIN).round() as u32;
            let rect = self.layout.mask_rect;
            out.box_blur_region(
                rect.x.floor().max(0.0) as u32,
                rect.y.floor().max(0.0) as u32,
                (rect.x + rect.w).ceil() as u32,
                (rect.y + rect.h).ceil() as u32,
                radius.min(24),
            );
        }

        if let Some(cursor) = &mut self.cursor {
            if let Some(pose) = cursor.advance(time_ms) {
                let screen_to_source = self.screen_to_source;
                let map = move |screen_x: f64, screen_y: f64| {
                    cam.stage_at(screen_x * screen_to_source, screen_y * screen_to_source)
                };
                let display_scale = cam.scale * screen_to_source;
                cursor.render(&mut out, &pose, time_ms, map, display_scale);
            }
        }

        Ok(out)
    }

    /// Sample the camera-transformed, cropped source into the mask rect,
    /// modulated by per-pixel corner coverage.
    fn draw_video_layer(&self, out: &mut RgbaFrame, src: &RgbaFrame, cam: &CameraFrame) {
        let layout = &self.layout;
        let rect = layout.mask_rect;

        let x0 = rect.x.floor().max(0.0) as u32;
        let y0 = rect.y.floor().max(0.0) as u32;
        let x1 = ((rect.x + rect.w).ceil() as u32).min(layout.stage_w);
        let y1 = ((rect.y + rect.h).ceil() as u32).min(layout.stage_h);

        for y in y0..y1 {
            for x in x0..x1 {
                let coverage = self.mask.coverage(x, y);
                if coverage <= 0.0 {
                    continue;
                }

                let (sx, sy) = cam.source_at(x as f64 + 0.5, y as f64 + 0.5);

                // Clamp into the crop window so zoom never reveals pixels
                // outside it.
                let sx = sx.clamp(layout.src_x, layout.src_x + layout.src_w - 1.0);
                let sy = sy.clamp(layout.src_y, layout.src_y + layout.src_h - 1.0);

                let mut color = src.sample_bilinear(sx, sy);
                color.a = 255;
                out.blend_pixel(x, y, color, coverage);
            }
        }
    }
}

/// One frame's camera transform, resolved once per `compose` and shared
/// by the video layer and the cursor overlay. The focus point (normalized
/// cropped-video coords) lands on the mask rect center.
#[derive(Debug, Clone, Copy)]
struct CameraFrame {
    rect_cx: f64,
    rect_cy: f64,
    /// Combined source-to-stage scale (`base_scale * tick.scale`).
    scale: f64,
    focus_src_x: f64,
    focus_src_y: f64,
}

impl CameraFrame {
    fn resolve(layout: &StageLayout, tick: &CameraTick) -> Self {
        let (rect_cx, rect_cy) = layout.mask_rect.center();
        Self {
            rect_cx,
            rect_cy,
            scale: layout.base_scale * tick.scale,
            focus_src_x: layout.src_x + tick.focus_x * layout.src_w,
            focus_src_y: layout.src_y + tick.focus_y * layout.src_h,
        }
    }

    /// Stage pixel to source pixel.
    fn source_at(&self, stage_x: f64, stage_y: f64) -> (f64, f64) {
        (
            self.focus_src_x + (stage_x - self.rect_cx) / self.scale,
            self.focus_src_y + (stage_y - self.rect_cy) / self.scale,
        )
    }

    /// Source pixel to stage pixel (inverse of `source_at`).
    fn stage_at(&self, src_x: f64, src_y: f64) -> (f64, f64) {
        (
            self.rect_cx + (src_x - self.focus_src_x) * self.scale,
            self.rect_cy + (src_y - self.focus_src_y) * self.scale,
        )
    }
}

/// Source-over blend a full-stage RGBA layer onto `out`.
fn blend_layer(out: &mut RgbaFrame, layer: &RgbaFrame) {
    for y in 0..out.height() {
        for x in 0..out.width() {
            let p = layer.pixel(x, y);
            if p.a > 0 {
                out.blend_pixel(x, y, p, 1.0);
            }
        }
    }
}

/// Precompute the drop shadow: the mask silhouette, offset downward,
/// blurred, in black at an intensity-scaled alpha.
fn build_shadow_layer(mask: &CoverageMask, width: u32, height: u32, intensity: f64) -> RgbaFrame {
    let intensity = intensity.clamp(0.0, 1.0);
    let offset_y = (SHADOW_OFFSET_Y_PX * intensity).round() as i64;
    let alpha_scale = SHADOW_MAX_ALPHA * intensity;

    let mut shadow = RgbaFrame::new(width, height);
    for y in 0..height {
        let sy = y as i64 - offset_y;
        if sy < 0 {
            continue;
        }
        for x in 0..width {
            let coverage = mask.coverage(x, sy as u32);
            if coverage > 0.0 {
                let a = (coverage * alpha_scale * 255.0).round() as u8;
                shadow.set_pixel(x, y, Rgba { r: 0, g: 0, b: 0, a });
            }
        }
    }

    shadow.box_blur((SHADOW_BLUR_PX * intensity).round() as u32);
    shadow
}

#[cfg(test)]
mod tests {
    use super::*;
    use zoomcast_effect_model::{BackgroundSpec, CornerSettings, CropRegion, ShadowSettings};
    use zoomcast_motion::CameraTick;

    fn identity_tick() -> CameraTick {
        CameraTick {
            scale: 1.0,
            focus_x: 0.5,
            focus_y: 0.5,
            motion_intensity: 0.0,
        }
    }

    fn plain_settings(width: u32, height: u32) -> ExportSettings {
        ExportSettings {
            width,
            height,
            background: BackgroundSpec::Solid {
                color: Rgba::opaque(0, 0, 255),
            },
            corners: CornerSettings::none(),
            shadow: ShadowSettings {
                enabled: false,
                intensity: 0.0,
            },
            padding_percent: 0.0,
            cursor_data: None,
            ..Default::default()
        }
    }

    fn red_source(w: u32, h: u32) -> RgbaFrame {
        let mut src = RgbaFrame::new(w, h);
        src.fill(Rgba::opaque(255, 0, 0));
        src
    }

    #[test]
    fn test_identity_fills_stage_with_source() {
        let settings = plain_settings(64, 64);
        let mut compositor = FrameCompositor::new(&settings, 64, 64).unwrap();
        let out = compositor
            .compose(&red_source(64, 64), 0.0, identity_tick())
            .unwrap();

        assert_eq!(out.pixel(32, 32), Rgba::opaque(255, 0, 0));
        assert_eq!(out.pixel(0, 0), Rgba::opaque(255, 0, 0));
    }

    #[test]
    fn test_padding_reveals_background() {
        let mut settings = plain_settings(100, 100);
        settings.padding_percent = 20.0;
        let mut compositor = FrameCompositor::new(&settings, 100, 100).unwrap();
        let out = compositor
            .compose(&red_source(100, 100), 0.0, identity_tick())
            .unwrap();

        // Corner is padding: background blue. Center is video: red.
        assert_eq!(out.pixel(2, 2), Rgba::opaque(0, 0, 255));
        assert_eq!(out.pixel(50, 50), Rgba::opaque(255, 0, 0));
    }

    #[test]
    fn test_zoom_magnifies_focus_area() {
        // Source: left half green, right half red. Zoom 2x into the left
        // quarter center; the whole video area should be green.
        let mut src = RgbaFrame::new(64, 64);
        for y in 0..64 {
            for x in 0..64 {
                let c = if x < 32 {
                    Rgba::opaque(0, 255, 0)
                } else {
                    Rgba::opaque(255, 0, 0)
                };
                src.set_pixel(x, y, c);
            }
        }

        let settings = plain_settings(64, 64);
        let mut compositor = FrameCompositor::new(&settings, 64, 64).unwrap();
        let tick = CameraTick {
            scale: 2.0,
            focus_x: 0.25,
            focus_y: 0.5,
            motion_intensity: 0.0,
        };
        let out = compositor.compose(&src, 0.0, tick).unwrap();

        assert_eq!(out.pixel(16, 32), Rgba::opaque(0, 255, 0));
        assert_eq!(out.pixel(47, 32), Rgba::opaque(0, 255, 0));
    }

    #[test]
    fn test_rounded_corners_show_background() {
        let mut settings = plain_settings(64, 64);
        settings.corners = CornerSettings {
            radius: 16.0,
            ..CornerSettings::default()
        };
        let mut compositor = FrameCompositor::new(&settings, 64, 64).unwrap();
        let out = compositor
            .compose(&red_source(64, 64), 0.0, identity_tick())
            .unwrap();

        // Extreme corner is clipped to background.
        assert_eq!(out.pixel(0, 0), Rgba::opaque(0, 0, 255));
        assert_eq!(out.pixel(32, 32), Rgba::opaque(255, 0, 0));
    }

    #[test]
    fn test_undersized_source_frame_is_error() {
        let settings = plain_settings(64, 64);
        let mut compositor = FrameCompositor::new(&settings, 64, 64).unwrap();
        let err = compositor
            .compose(&red_source(32, 32), 0.0, identity_tick())
            .unwrap_err();
        assert!(matches!(err, ZoomcastError::CompositorRender { .. }));
    }

    #[test]
    fn test_camera_transform_round_trips() {
        let layout = StageLayout::compute(100, 100, 200, 200, &CropRegion::FULL, 10.0);
        let tick = CameraTick {
            scale: 2.0,
            focus_x: 0.3,
            focus_y: 0.7,
            motion_intensity: 0.0,
        };
        let cam = CameraFrame::resolve(&layout, &tick);

        let (sx, sy) = cam.source_at(40.0, 60.0);
        let (bx, by) = cam.stage_at(sx, sy);
        assert!((bx - 40.0).abs() < 1e-9);
        assert!((by - 60.0).abs() < 1e-9);

        // The focus point maps to the mask rect center.
        let (fx, fy) = cam.stage_at(200.0 * 0.3, 200.0 * 0.7);
        let (cx, cy) = layout.mask_rect.center();
        assert!((fx - cx).abs() < 1e-9);
        assert!((fy - cy).abs() < 1e-9);
    }

    #[test]
    fn test_shadow_darkens_below_video() {
        let mut settings = plain_settings(100, 100);
        settings.padding_percent = 20.0;
        settings.shadow = ShadowSettings {
            enabled: true,
            intensity: 1.0,
        };
        let mut compositor = FrameCompositor::new(&settings, 100, 100).unwrap();
        let out = compositor
            .compose(&red_source(100, 100), 0.0, identity_tick())
            .unwrap();

        // Just below the video rect (video spans 10..90 with 20% padding)
        // the background should be darkened by the shadow.
        let below = out.pixel(50, 93);
        assert!(below.b < 220, "expected shadow below the video layer");
        // The far corner is nearly untouched background.
        assert!(out.pixel(1, 1).b > 240);
    }
}
