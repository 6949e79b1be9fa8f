//! CPU frame buffers.
//!
//! Frames are tightly packed RGBA8, row-major, matching the layout of the
//! ffmpeg `rawvideo`/`rgba` pipe on both ends of the pipeline.

use zoomcast_effect_model::Rgba;

/// A tightly packed RGBA8 frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbaFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RgbaFrame {
    /// Allocate a transparent black frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Wrap an existing RGBA buffer. Length must be `width * height * 4`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        let i = self.offset(x, y);
        Rgba {
            r: self.data[i],
            g: self.data[i + 1],
            b: self.data[i + 2],
            a: self.data[i + 3],
        }
    }

    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, c: Rgba) {
        let i = self.offset(x, y);
        self.data[i] = c.r;
        self.data[i + 1] = c.g;
        self.data[i + 2] = c.b;
        self.data[i + 3] = c.a;
    }

    /// Fill the whole frame with one color.
    pub fn fill(&mut self, c: Rgba) {
        for chunk in self.data.chunks_exact_mut(4) {
            chunk[0] = c.r;
            chunk[1] = c.g;
            chunk[2] = c.b;
            chunk[3] = c.a;
        }
    }

    /// Bilinear sample at fractional pixel coordinates, clamped to the
    /// frame bounds so sampling never reads outside the texture.
    pub fn sample_bilinear(&self, x: f64, y: f64) -> Rgba {
        let max_x = (self.width - 1) as f64;
        let max_y = (self.height - 1) as f64;
        let x = x.clamp(0.0, max_x);
        let y = y.clamp(0.0, max_y);

        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = x - x0 as f64;
        let fy = y - y0 as f64;

        let p00 = self.pixel(x0, y0);
        let p10 = self.pixel(x1, y0);
        let p01 = self.pixel(x0, y1);
        let p11 = self.pixel(x1, y1);

        let lerp = |a: u8, b: u8, t: f64| a as f64 + (b as f64 - a as f64) * t;
        let channel = |c00: u8, c10: u8, c01: u8, c11: u8| {
            let top = lerp(c00, c10, fx);
            let bottom = lerp(c01, c11, fx);
            lerp_f(top, bottom, fy).round().clamp(0.0, 255.0) as u8
        };

        Rgba {
            r: channel(p00.r, p10.r, p01.r, p11.r),
            g: channel(p00.g, p10.g, p01.g, p11.g),
            b: channel(p00.b, p10.b, p01.b, p11.b),
            a: channel(p00.a, p10.a, p01.a, p11.a),
        }
    }

    /// Source-over blend `src` onto the pixel at `(x, y)`, with an extra
    /// opacity multiplier.
    pub fn blend_pixel(&mut self, x: u32, y: u32, src: Rgba, opacity: f64) {
        if x >= self.width || y >= self.height {
            return;
        }
        let sa = (src.a as f64 / 255.0) * opacity.clamp(0.0, 1.0);
        if sa <= 0.0 {
            return;
        }

        let dst = self.pixel(x, y);
        let da = dst.a as f64 / 255.0;
        let out_a = sa + da * (1.0 - sa);
        if out_a <= 0.0 {
            return;
        }

        let mix = |s: u8, d: u8| {
            let v = (s as f64 * sa + d as f64 * da * (1.0 - sa)) / out_a;
            v.round().clamp(0.0, 255.0) as u8
        };

        self.set_pixel(
            x,
            y,
            Rgba {
                r: mix(src.r, dst.r),
                g: mix(src.g, dst.g),
                b: mix(src.b, dst.b),
                a: (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
            },
        );
    }

    /// Separable box blur with the given radius in pixels, applied to a
    /// rectangular sub-region. Radius 0 is a no-op.
    pub fn box_blur_region(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, radius: u32) {
        if radius == 0 {
            return;
        }
        let x1 = x1.min(self.width);
        let y1 = y1.min(self.height);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let r = radius as i64;
        let mut scratch = self.data.clone();

        // Horizontal pass into scratch.
        for y in y0..y1 {
            for x in x0..x1 {
                let mut acc = [0u32; 4];
                let mut count = 0u32;
                for dx in -r..=r {
                    let sx = x as i64 + dx;
                    if sx < x0 as i64 || sx >= x1 as i64 {
                        continue;
                    }
                    let i = self.offset(sx as u32, y);
                    for c in 0..4 {
                        acc[c] += self.data[i + c] as u32;
                    }
                    count += 1;
                }
                let i = self.offset(x, y);
                for c in 0..4 {
                    scratch[i + c] = (acc[c] / count.max(1)) as u8;
                }
            }
        }

        // Vertical pass back into the frame.
        for y in y0..y1 {
            for x in x0..x1 {
                let mut acc = [0u32; 4];
                let mut count = 0u32;
                for dy in -r..=r {
                    let sy = y as i64 + dy;
                    if sy < y0 as i64 || sy >= y1 as i64 {
                        continue;
                    }
                    let i = self.offset(x, sy as u32);
                    for c in 0..4 {
                        acc[c] += scratch[i + c] as u32;
                    }
                    count += 1;
                }
                let i = self.offset(x, y);
                for c in 0..4 {
                    self.data[i + c] = (acc[c] / count.max(1)) as u8;
                }
            }
        }
    }

    /// Blur the entire frame.
    pub fn box_blur(&mut self, radius: u32) {
        self.box_blur_region(0, 0, self.width, self.height, radius);
    }
}

#[inline]
fn lerp_f(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_validates_length() {
        assert!(RgbaFrame::from_raw(2, 2, vec![0; 16]).is_some());
        assert!(RgbaFrame::from_raw(2, 2, vec![0; 15]).is_none());
    }

    #[test]
    fn test_fill_and_pixel() {
        let mut frame = RgbaFrame::new(4, 4);
        frame.fill(Rgba::opaque(10, 20, 30));
        assert_eq!(frame.pixel(0, 0), Rgba::opaque(10, 20, 30));
        assert_eq!(frame.pixel(3, 3), Rgba::opaque(10, 20, 30));
    }

    #[test]
    fn test_bilinear_midpoint() {
        let mut frame = RgbaFrame::new(2, 1);
        frame.set_pixel(0, 0, Rgba::opaque(0, 0, 0));
        frame.set_pixel(1, 0, Rgba::opaque(200, 100, 50));

        let mid = frame.sample_bilinear(0.5, 0.0);
        assert_eq!(mid.r, 100);
        assert_eq!(mid.g, 50);
        assert_eq!(mid.b, 25);
    }

    #[test]
    fn test_bilinear_clamps_out_of_bounds() {
        let mut frame = RgbaFrame::new(2, 2);
        frame.fill(Rgba::opaque(77, 77, 77));
        assert_eq!(frame.sample_bilinear(-10.0, -10.0).r, 77);
        assert_eq!(frame.sample_bilinear(100.0, 100.0).r, 77);
    }

    #[test]
    fn test_blend_opaque_replaces() {
        let mut frame = RgbaFrame::new(1, 1);
        frame.fill(Rgba::opaque(0, 0, 0));
        frame.blend_pixel(0, 0, Rgba::opaque(255, 0, 0), 1.0);
        assert_eq!(frame.pixel(0, 0), Rgba::opaque(255, 0, 0));
    }

    #[test]
    fn test_blend_half_opacity_mixes() {
        let mut frame = RgbaFrame::new(1, 1);
        frame.fill(Rgba::opaque(0, 0, 0));
        frame.blend_pixel(0, 0, Rgba::opaque(255, 255, 255), 0.5);
        let p = frame.pixel(0, 0);
        assert!((p.r as i32 - 128).abs() <= 1);
    }

    #[test]
    fn test_blur_zero_radius_noop() {
        let mut frame = RgbaFrame::new(3, 3);
        frame.set_pixel(1, 1, Rgba::opaque(255, 255, 255));
        let before = frame.clone();
        frame.box_blur(0);
        assert_eq!(frame, before);
    }

    #[test]
    fn test_blur_spreads_energy() {
        let mut frame = RgbaFrame::new(5, 5);
        frame.set_pixel(2, 2, Rgba::opaque(255, 255, 255));
        frame.box_blur(1);
        assert!(frame.pixel(2, 2).r < 255);
        assert!(frame.pixel(1, 2).r > 0);
    }
}
