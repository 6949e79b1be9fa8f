//! Stage layout: where the video layer sits on the output canvas.

use zoomcast_effect_model::CropRegion;

/// A rectangle in stage (output) pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.w && y >= self.y && y < self.y + self.h
    }
}

/// The resolved geometry of one export: output canvas, cropped source,
/// and the padded video rectangle between them.
///
/// Pure data computed once up front; every frame reads it, nothing
/// mutates it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageLayout {
    /// Output canvas size in pixels.
    pub stage_w: u32,
    pub stage_h: u32,

    /// Cropped source size in source pixels.
    pub src_w: f64,
    pub src_h: f64,

    /// Source crop origin in source pixels.
    pub src_x: f64,
    pub src_y: f64,

    /// Scale from cropped-source pixels to stage pixels at zoom 1.0.
    pub base_scale: f64,

    /// The video layer rectangle on the stage (the mask rect).
    pub mask_rect: Rect,
}

impl StageLayout {
    /// Fit the cropped source into the padded stage, centered, preserving
    /// aspect ratio (contain fit).
    pub fn compute(
        out_w: u32,
        out_h: u32,
        source_w: u32,
        source_h: u32,
        crop: &CropRegion,
        padding_percent: f64,
    ) -> Self {
        let src_w = (source_w as f64 * crop.width).max(1.0);
        let src_h = (source_h as f64 * crop.height).max(1.0);
        let src_x = source_w as f64 * crop.x;
        let src_y = source_h as f64 * crop.y;

        let fill = 1.0 - padding_percent.clamp(0.0, 50.0) / 100.0;
        let avail_w = out_w as f64 * fill;
        let avail_h = out_h as f64 * fill;

        let base_scale = (avail_w / src_w).min(avail_h / src_h);
        let video_w = src_w * base_scale;
        let video_h = src_h * base_scale;

        let mask_rect = Rect {
            x: (out_w as f64 - video_w) / 2.0,
            y: (out_h as f64 - video_h) / 2.0,
            w: video_w,
            h: video_h,
        };

        Self {
            stage_w: out_w,
            stage_h: out_h,
            src_w,
            src_h,
            src_x,
            src_y,
            base_scale,
            mask_rect,
        }
    }
}
